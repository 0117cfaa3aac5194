//! Per-board markup rules: where result pages live, how a page splits into
//! listing cards, and where each field sits inside a card.

use jobpulse_core::{Field, Source};
use scraper::{Html, Selector};
use url::Url;

use crate::{PageToken, SearchQuery};

/// What to read from an element matched by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Text of the first match.
    Text,
    /// Attribute of the first match.
    Attr(&'static str),
    /// Text of every match joined by spaces; matches starting with
    /// `skip_prefix` are ignored.
    AllText { skip_prefix: Option<&'static str> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub selector: &'static str,
    pub target: Target,
}

const fn text(selector: &'static str) -> Probe {
    Probe {
        selector,
        target: Target::Text,
    }
}

const fn attr(selector: &'static str, name: &'static str) -> Probe {
    Probe {
        selector,
        target: Target::Attr(name),
    }
}

/// Ordered probes for one field; the first probe yielding non-empty text wins.
/// `fallback` is used when every probe misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub probes: &'static [Probe],
    pub fallback: Option<&'static str>,
}

const fn rule(probes: &'static [Probe]) -> FieldRule {
    FieldRule {
        probes,
        fallback: None,
    }
}

#[derive(Debug)]
pub struct SourceProfile {
    pub source: Source,
    pub default_base: &'static str,
    pub card_selector: &'static str,
    /// Listings per page for offset-paginated boards; `None` for single-page boards.
    pub page_size: Option<usize>,
    pub title: FieldRule,
    pub company: FieldRule,
    pub location: FieldRule,
    pub skills: FieldRule,
    pub posted_date: FieldRule,
    pub link: FieldRule,
}

static LINKEDIN: SourceProfile = SourceProfile {
    source: Source::LinkedIn,
    default_base: "https://www.linkedin.com",
    card_selector: "div.base-card",
    page_size: Some(25),
    title: rule(&[text("h3.base-search-card__title")]),
    company: rule(&[
        text("h4.base-search-card__subtitle"),
        text(r#"a[data-tracking-control-name="public_jobs_topcard-org-name"]"#),
    ]),
    location: rule(&[text("span.job-search-card__location")]),
    skills: rule(&[Probe {
        selector: "h3.base-search-card__title, p.job-search-card__snippet",
        target: Target::AllText { skip_prefix: None },
    }]),
    posted_date: rule(&[
        attr("time.job-search-card__listdate", "datetime"),
        text("time.job-search-card__listdate"),
        attr("time", "datetime"),
        text("time"),
    ]),
    link: rule(&[attr("a.base-card__full-link", "href")]),
};

static REMOTEOK: SourceProfile = SourceProfile {
    source: Source::RemoteOk,
    default_base: "https://remoteok.com",
    card_selector: "tr.job",
    page_size: None,
    title: rule(&[text("td.company h2"), text(r#"h2[itemprop="title"]"#)]),
    company: rule(&[text("td.company h3"), text(r#"h3[itemprop="name"]"#)]),
    location: FieldRule {
        probes: &[text("div.location")],
        fallback: Some("Remote"),
    },
    skills: rule(&[Probe {
        selector: "td.company h2, td.tags h3",
        target: Target::AllText {
            skip_prefix: Some("$"),
        },
    }]),
    posted_date: rule(&[attr("td.time time", "datetime"), text("td.time time")]),
    link: rule(&[attr("a.preventLink", "href")]),
};

impl SourceProfile {
    pub fn for_source(source: Source) -> &'static SourceProfile {
        match source {
            Source::LinkedIn => &LINKEDIN,
            Source::RemoteOk => &REMOTEOK,
        }
    }

    pub fn rule(&self, field: Field) -> &FieldRule {
        match field {
            Field::Title => &self.title,
            Field::Company => &self.company,
            Field::Location => &self.location,
            Field::Skills => &self.skills,
            Field::PostedDate => &self.posted_date,
            Field::Link => &self.link,
        }
    }

    /// URL of the given result page, or `None` when the board has no such page.
    pub fn page_url(
        &self,
        base: Option<&str>,
        query: &SearchQuery,
        page: PageToken,
    ) -> Result<Option<Url>, url::ParseError> {
        let base = Url::parse(base.unwrap_or(self.default_base))?;
        match self.source {
            Source::LinkedIn => {
                let page_size = self.page_size.unwrap_or(1);
                let mut url = base.join("/jobs/search")?;
                url.query_pairs_mut()
                    .append_pair("keywords", &query.terms)
                    .append_pair("location", &query.location)
                    .append_pair("start", &(page.0 * page_size).to_string())
                    // Postings from the last week only.
                    .append_pair("f_TPR", "r604800");
                Ok(Some(url))
            }
            Source::RemoteOk => {
                if page != PageToken::FIRST {
                    return Ok(None);
                }
                // RemoteOK pages are keyed by a single tag.
                let tag = query
                    .terms
                    .split_whitespace()
                    .next()
                    .unwrap_or("software")
                    .to_lowercase();
                let tag: String = tag
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                    .collect();
                base.join(&format!("/remote-{tag}-jobs")).map(Some)
            }
        }
    }

    /// Split a result page into the markup of its listing cards, in page order.
    pub fn split_cards(&self, body: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(self.card_selector) else {
            return Vec::new();
        };
        let doc = Html::parse_document(body);
        doc.select(&selector).map(|card| card.html()).collect()
    }
}
