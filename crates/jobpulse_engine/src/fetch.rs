use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jobpulse_core::{DelayRange, RawListing, RetryPolicy, Source};
use pulse_logging::{pulse_debug, pulse_info, pulse_warn};
use tokio_util::sync::CancellationToken;

use crate::profile::SourceProfile;
use crate::{
    FetchError, PageError, PageOutcome, PageSource, PageToken, SearchQuery, SourceBatch,
};

/// Timestamp source stamped onto every fetched listing.
pub type FetchClock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> FetchClock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, Copy)]
pub struct PagingPolicy {
    pub max_pages: usize,
    pub retry: RetryPolicy,
    pub page_delay: DelayRange,
}

impl Default for PagingPolicy {
    fn default() -> Self {
        Self {
            max_pages: 3,
            retry: RetryPolicy::default(),
            page_delay: DelayRange::default(),
        }
    }
}

enum PageAttempt {
    Fetched(PageOutcome),
    Failed { error: PageError, attempts: u32 },
    Cancelled,
}

/// Pulls a bounded number of raw listings from one source, retrying and
/// skipping pages as needed. Holds no state between calls.
#[derive(Clone)]
pub struct SourceFetcher {
    pages: Arc<dyn PageSource>,
    policy: PagingPolicy,
    clock: FetchClock,
}

impl SourceFetcher {
    pub fn new(pages: Arc<dyn PageSource>, policy: PagingPolicy) -> Self {
        Self {
            pages,
            policy,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: FetchClock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch up to `max_results` listings. Pages that keep failing are
    /// skipped; the call only fails when every requested page failed and the
    /// run was not cancelled.
    pub async fn fetch(
        &self,
        source: Source,
        query: &SearchQuery,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<SourceBatch, FetchError> {
        let profile = SourceProfile::for_source(source);
        let mut batch = SourceBatch {
            source,
            listings: Vec::new(),
            pages_requested: 0,
            pages_skipped: 0,
            cancelled: false,
        };
        let mut pages_ok = 0usize;
        let mut last_error: Option<PageError> = None;
        let mut page = PageToken::FIRST;

        while page.0 < self.policy.max_pages && batch.listings.len() < max_results {
            if cancel.is_cancelled() {
                batch.cancelled = true;
                break;
            }
            if page != PageToken::FIRST && profile.page_size.is_none() {
                // Single-page source; later pages would only report the end.
                break;
            }
            if page != PageToken::FIRST && !self.politeness_pause(cancel).await {
                batch.cancelled = true;
                break;
            }

            batch.pages_requested += 1;
            match self.fetch_with_retry(source, query, page, cancel).await {
                PageAttempt::Cancelled => {
                    batch.cancelled = true;
                    break;
                }
                PageAttempt::Failed { error, attempts } => {
                    pulse_warn!(
                        "Skipping {} page {} after {} attempt(s): {}",
                        source,
                        page.0,
                        attempts,
                        error
                    );
                    batch.pages_skipped += 1;
                    last_error = Some(error);
                }
                PageAttempt::Fetched(PageOutcome::NoMorePages) => {
                    pages_ok += 1;
                    pulse_debug!("{} reports no more pages after page {}", source, page.0);
                    break;
                }
                PageAttempt::Fetched(PageOutcome::Page(document)) => {
                    pages_ok += 1;
                    let cards = profile.split_cards(&document.body);
                    if cards.is_empty() {
                        break;
                    }
                    let fetched_at = (self.clock)();
                    let room = max_results - batch.listings.len();
                    pulse_debug!(
                        "{} page {} yielded {} cards (room for {})",
                        source,
                        page.0,
                        cards.len(),
                        room
                    );
                    batch
                        .listings
                        .extend(cards.into_iter().take(room).map(|card| RawListing {
                            document: card,
                            source,
                            fetch_timestamp: fetched_at,
                            source_url: document.url.clone(),
                        }));
                }
            }
            page = page.next();
        }

        // A cancelled source keeps its partial batch even if nothing succeeded.
        if pages_ok == 0 && batch.pages_skipped > 0 && !batch.cancelled {
            let reason = last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no page could be fetched".to_string());
            return Err(FetchError {
                source_name: source,
                reason,
                pages_requested: batch.pages_requested,
            });
        }

        pulse_info!(
            "Fetched {} listings from {} ({} pages, {} skipped)",
            batch.listings.len(),
            source,
            batch.pages_requested,
            batch.pages_skipped
        );
        Ok(batch)
    }

    async fn fetch_with_retry(
        &self,
        source: Source,
        query: &SearchQuery,
        page: PageToken,
        cancel: &CancellationToken,
    ) -> PageAttempt {
        let retry = self.policy.retry;
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return PageAttempt::Cancelled;
            }
            let err = match self.pages.fetch_page(source, query, page).await {
                Ok(outcome) => return PageAttempt::Fetched(outcome),
                Err(err) => err,
            };
            if !err.kind.is_transient() || attempt >= retry.max_attempts {
                return PageAttempt::Failed {
                    error: err,
                    attempts: attempt,
                };
            }

            let delay = retry.backoff_after(attempt);
            pulse_warn!(
                "{} page {} attempt {} failed: {}, retrying in {}ms",
                source,
                page.0,
                attempt,
                err,
                delay.as_millis()
            );
            if !sleep_unless_cancelled(delay, cancel).await {
                return PageAttempt::Cancelled;
            }
            attempt += 1;
        }
    }

    /// Random pause between pages. Returns `false` when cancelled meanwhile.
    async fn politeness_pause(&self, cancel: &CancellationToken) -> bool {
        let range = self.policy.page_delay;
        if range.is_disabled() {
            return true;
        }
        let millis = if range.min_ms >= range.max_ms {
            range.min_ms
        } else {
            rand::random_range(range.min_ms..=range.max_ms)
        };
        pulse_debug!("Waiting {}ms before next page", millis);
        sleep_unless_cancelled(Duration::from_millis(millis), cancel).await
    }
}

async fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
