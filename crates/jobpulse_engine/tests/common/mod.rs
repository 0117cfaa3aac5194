#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jobpulse_core::{DelayRange, RetryPolicy, Source};
use jobpulse_engine::{
    FetchClock, PageDocument, PageError, PageFailureKind, PageOutcome, PageSource, PageToken,
    PagingPolicy, SearchQuery,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub fn fixed_clock() -> FetchClock {
    Arc::new(fixed_now)
}

/// No delays anywhere, three attempts per page.
pub fn fast_policy(max_pages: usize) -> PagingPolicy {
    PagingPolicy {
        max_pages,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        },
        page_delay: DelayRange::DISABLED,
    }
}

pub struct Card<'a> {
    pub title: &'a str,
    pub company: &'a str,
    pub location: &'a str,
    pub blurb: &'a str,
    pub posted: &'a str,
    pub href: &'a str,
}

impl<'a> Card<'a> {
    pub fn new(title: &'a str, company: &'a str, location: &'a str) -> Self {
        Self {
            title,
            company,
            location,
            blurb: "",
            posted: "",
            href: "",
        }
    }

    pub fn blurb(mut self, blurb: &'a str) -> Self {
        self.blurb = blurb;
        self
    }

    pub fn posted(mut self, posted: &'a str) -> Self {
        self.posted = posted;
        self
    }

    pub fn href(mut self, href: &'a str) -> Self {
        self.href = href;
        self
    }
}

pub fn linkedin_card(card: &Card<'_>) -> String {
    format!(
        r#"<div class="base-card">
  <a class="base-card__full-link" href="{href}"></a>
  <h3 class="base-search-card__title">{title}</h3>
  <h4 class="base-search-card__subtitle">{company}</h4>
  <span class="job-search-card__location">{location}</span>
  <p class="job-search-card__snippet">{blurb}</p>
  <time class="job-search-card__listdate" datetime="{posted}">recently</time>
</div>"#,
        href = card.href,
        title = card.title,
        company = card.company,
        location = card.location,
        blurb = card.blurb,
        posted = card.posted,
    )
}

pub fn linkedin_page(cards: &[Card<'_>]) -> String {
    let body: String = cards.iter().map(linkedin_card).collect();
    format!("<html><body><ul class=\"jobs-search__results-list\">{body}</ul></body></html>")
}

pub fn remoteok_row(card: &Card<'_>, tags: &[&str]) -> String {
    let tags: String = tags
        .iter()
        .map(|tag| format!("<a class=\"tag\"><h3>{tag}</h3></a>"))
        .collect();
    let location = if card.location.is_empty() {
        String::new()
    } else {
        format!("<div class=\"location\">{}</div>", card.location)
    };
    format!(
        r#"<tr class="job">
  <td class="company"><a class="preventLink" href="{href}"><h2>{title}</h2></a><h3>{company}</h3>{location}</td>
  <td class="tags">{tags}</td>
  <td class="time"><time datetime="{posted}">2d</time></td>
</tr>"#,
        href = card.href,
        title = card.title,
        company = card.company,
        posted = card.posted,
    )
}

pub fn remoteok_page(rows: &[String]) -> String {
    format!(
        "<html><body><table id=\"jobsboard\">{}</table></body></html>",
        rows.concat()
    )
}

pub fn page(url: &str, body: String) -> Result<PageOutcome, PageError> {
    Ok(PageOutcome::Page(PageDocument {
        url: url.to_string(),
        body,
    }))
}

pub fn failure(kind: PageFailureKind) -> Result<PageOutcome, PageError> {
    Err(PageError::new(kind, "scripted failure"))
}

/// In-memory [`PageSource`] replaying scripted responses per `(source, page)`.
/// Unscripted pages report the end of results.
#[derive(Default)]
pub struct ScriptedPages {
    script: Mutex<HashMap<(Source, usize), VecDeque<Result<PageOutcome, PageError>>>>,
    calls: AtomicUsize,
    log: Mutex<Vec<(Source, usize)>>,
    call_times: Mutex<Vec<Instant>>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl ScriptedPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, source: Source, page: usize, response: Result<PageOutcome, PageError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry((source, page))
            .or_default()
            .push_back(response);
        self
    }

    /// Every call for `(source, page)` fails with `kind`.
    pub fn always_fail(self, source: Source, page: usize, kind: PageFailureKind, times: usize) -> Self {
        (0..times).fold(self, |pages, _| pages.respond(source, page, failure(kind.clone())))
    }

    /// Cancel `token` as the `call`-th fetch (1-based) returns.
    pub fn cancel_after(mut self, call: usize, token: &CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token.clone()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, source: Source) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == source)
            .count()
    }

    /// Gaps between consecutive fetches, measured on the tokio clock.
    pub fn call_gaps(&self) -> Vec<Duration> {
        self.call_times
            .lock()
            .unwrap()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }
}

#[async_trait::async_trait]
impl PageSource for ScriptedPages {
    async fn fetch_page(
        &self,
        source: Source,
        _query: &SearchQuery,
        page: PageToken,
    ) -> Result<PageOutcome, PageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().unwrap().push((source, page.0));
        self.call_times.lock().unwrap().push(Instant::now());
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }
        self.script
            .lock()
            .unwrap()
            .get_mut(&(source, page.0))
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(PageOutcome::NoMorePages))
    }
}
