mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    failure, fast_policy, fixed_clock, fixed_now, linkedin_page, page, remoteok_page,
    remoteok_row, Card, ScriptedPages,
};
use jobpulse_core::{DelayRange, RetryPolicy, Source};
use jobpulse_engine::{PageFailureKind, PagingPolicy, SearchQuery, SourceFetcher};
use pretty_assertions::assert_eq;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const PAGE0: &str = "https://www.linkedin.com/jobs/search?start=0";
const PAGE1: &str = "https://www.linkedin.com/jobs/search?start=25";
const REMOTEOK: &str = "https://remoteok.com/remote-rust-jobs";

fn three_cards(prefix: &str) -> String {
    let titles: Vec<String> = (1..=3).map(|i| format!("{prefix} Engineer {i}")).collect();
    let cards: Vec<Card<'_>> = titles
        .iter()
        .map(|t| Card::new(t, "Acme", "Austin, TX"))
        .collect();
    linkedin_page(&cards)
}

fn fetcher(pages: Arc<ScriptedPages>, max_pages: usize) -> SourceFetcher {
    SourceFetcher::new(pages, fast_policy(max_pages)).with_clock(fixed_clock())
}

fn retry(max_attempts: u32, initial_ms: u64, max_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(initial_ms),
        max_backoff: Duration::from_millis(max_ms),
    }
}

fn fixed_delay(millis: u64) -> DelayRange {
    DelayRange {
        min_ms: millis,
        max_ms: millis,
    }
}

fn cancel_at(after: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        token.cancel();
    });
    cancel
}

fn query() -> SearchQuery {
    SearchQuery::new("rust", "United States")
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let pages = Arc::new(
        ScriptedPages::new()
            .respond(Source::LinkedIn, 0, failure(PageFailureKind::Timeout))
            .respond(Source::LinkedIn, 0, failure(PageFailureKind::Blocked))
            .respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Rust"))),
    );

    let batch = fetcher(pages.clone(), 1)
        .fetch(Source::LinkedIn, &query(), 10, &CancellationToken::new())
        .await
        .expect("fetch succeeds");

    assert_eq!(pages.calls(), 3);
    assert_eq!(batch.listings.len(), 3);
    assert_eq!(batch.pages_requested, 1);
    assert_eq!(batch.pages_skipped, 0);
    assert!(!batch.cancelled);
}

#[tokio::test]
async fn exhausted_page_is_skipped_and_paging_continues() {
    let pages = Arc::new(
        ScriptedPages::new()
            .always_fail(Source::LinkedIn, 0, PageFailureKind::Network, 3)
            .respond(Source::LinkedIn, 1, page(PAGE1, three_cards("Go"))),
    );

    let batch = fetcher(pages.clone(), 2)
        .fetch(Source::LinkedIn, &query(), 10, &CancellationToken::new())
        .await
        .expect("one page still succeeded");

    assert_eq!(pages.calls(), 4);
    assert_eq!(batch.pages_requested, 2);
    assert_eq!(batch.pages_skipped, 1);
    assert_eq!(batch.listings.len(), 3);
    assert!(batch.listings.iter().all(|l| l.source_url == PAGE1));
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let pages = Arc::new(
        ScriptedPages::new()
            .respond(Source::LinkedIn, 0, failure(PageFailureKind::HttpStatus(404)))
            .respond(Source::LinkedIn, 1, page(PAGE1, three_cards("Data"))),
    );

    let batch = fetcher(pages.clone(), 2)
        .fetch(Source::LinkedIn, &query(), 10, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pages.calls(), 2);
    assert_eq!(batch.pages_skipped, 1);
}

#[tokio::test]
async fn permanent_failure_ends_retries_early() {
    let pages = Arc::new(
        ScriptedPages::new()
            .respond(Source::LinkedIn, 0, failure(PageFailureKind::Timeout))
            .respond(Source::LinkedIn, 0, failure(PageFailureKind::HttpStatus(410)))
            .respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Late"))),
    );

    let err = fetcher(pages.clone(), 1)
        .fetch(Source::LinkedIn, &query(), 10, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(pages.calls(), 2);
    assert_eq!(err.pages_requested, 1);
    assert!(err.reason.contains("410"), "reason: {}", err.reason);
}

#[tokio::test]
async fn fails_when_no_page_succeeds() {
    let pages = Arc::new(
        ScriptedPages::new()
            .always_fail(Source::LinkedIn, 0, PageFailureKind::Timeout, 3)
            .always_fail(Source::LinkedIn, 1, PageFailureKind::Timeout, 3),
    );

    let err = fetcher(pages.clone(), 2)
        .fetch(Source::LinkedIn, &query(), 10, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(pages.calls(), 6);
    assert_eq!(err.source_name, Source::LinkedIn);
    assert_eq!(err.pages_requested, 2);
    assert!(err.reason.contains("timeout"), "reason: {}", err.reason);
}

#[tokio::test]
async fn stops_at_max_results() {
    let pages = Arc::new(
        ScriptedPages::new()
            .respond(Source::LinkedIn, 0, page(PAGE0, three_cards("A")))
            .respond(Source::LinkedIn, 1, page(PAGE1, three_cards("B")))
            .respond(Source::LinkedIn, 2, page(PAGE1, three_cards("C"))),
    );

    let batch = fetcher(pages.clone(), 3)
        .fetch(Source::LinkedIn, &query(), 4, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(batch.listings.len(), 4);
    assert_eq!(pages.calls(), 2);
    assert!(batch.listings[3].document.contains("B Engineer 1"));
}

#[tokio::test]
async fn stops_when_results_run_out() {
    let pages = Arc::new(
        ScriptedPages::new().respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Rust"))),
    );

    let batch = fetcher(pages.clone(), 3)
        .fetch(Source::LinkedIn, &query(), 50, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pages.calls(), 2);
    assert_eq!(batch.listings.len(), 3);
    assert_eq!(batch.pages_requested, 2);
}

#[tokio::test]
async fn listings_carry_fetch_time_and_page_url() {
    let pages = Arc::new(
        ScriptedPages::new().respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Rust"))),
    );

    let batch = fetcher(pages, 1)
        .fetch(Source::LinkedIn, &query(), 50, &CancellationToken::new())
        .await
        .unwrap();

    for listing in &batch.listings {
        assert_eq!(listing.source, Source::LinkedIn);
        assert_eq!(listing.fetch_timestamp, fixed_now());
        assert_eq!(listing.source_url, PAGE0);
        assert!(listing.document.contains("base-card"));
    }
}

#[tokio::test]
async fn cancelled_token_requests_nothing() {
    let pages = Arc::new(
        ScriptedPages::new().respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Rust"))),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let batch = fetcher(pages.clone(), 3)
        .fetch(Source::LinkedIn, &query(), 50, &cancel)
        .await
        .unwrap();

    assert_eq!(pages.calls(), 0);
    assert!(batch.cancelled);
    assert!(batch.listings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn retries_wait_for_capped_exponential_backoff() {
    let pages = Arc::new(
        ScriptedPages::new()
            .always_fail(Source::LinkedIn, 0, PageFailureKind::Timeout, 3)
            .respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Rust"))),
    );
    let policy = PagingPolicy {
        max_pages: 1,
        retry: retry(4, 100, 250),
        page_delay: DelayRange::DISABLED,
    };

    let batch = SourceFetcher::new(pages.clone(), policy)
        .fetch(Source::LinkedIn, &query(), 10, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(batch.listings.len(), 3);
    let gaps: Vec<u128> = pages.call_gaps().iter().map(Duration::as_millis).collect();
    assert_eq!(gaps, vec![100, 200, 250]);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_backoff_returns_promptly() {
    let pages = Arc::new(
        ScriptedPages::new().always_fail(Source::LinkedIn, 0, PageFailureKind::Timeout, 3),
    );
    let policy = PagingPolicy {
        max_pages: 1,
        retry: retry(3, 10_000, 10_000),
        page_delay: DelayRange::DISABLED,
    };
    let cancel = cancel_at(Duration::from_secs(1));
    let started = Instant::now();

    let batch = SourceFetcher::new(pages.clone(), policy)
        .fetch(Source::LinkedIn, &query(), 10, &cancel)
        .await
        .expect("cancelled fetch keeps its batch");

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(pages.calls(), 1);
    assert!(batch.cancelled);
    assert!(batch.listings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_page_delay_keeps_fetched_listings() {
    let pages = Arc::new(
        ScriptedPages::new()
            .respond(Source::LinkedIn, 0, page(PAGE0, three_cards("Rust")))
            .respond(Source::LinkedIn, 1, page(PAGE1, three_cards("Go"))),
    );
    let policy = PagingPolicy {
        page_delay: fixed_delay(5_000),
        ..fast_policy(2)
    };
    let cancel = cancel_at(Duration::from_secs(1));
    let started = Instant::now();

    let batch = SourceFetcher::new(pages.clone(), policy)
        .fetch(Source::LinkedIn, &query(), 10, &cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(pages.calls(), 1);
    assert!(batch.cancelled);
    assert_eq!(batch.listings.len(), 3);
    assert_eq!(batch.pages_requested, 1);
}

#[tokio::test]
async fn cancelled_source_with_only_skipped_pages_is_not_a_failure() {
    let cancel = CancellationToken::new();
    let pages = Arc::new(
        ScriptedPages::new()
            .respond(Source::LinkedIn, 0, failure(PageFailureKind::HttpStatus(404)))
            .respond(Source::LinkedIn, 1, page(PAGE1, three_cards("Go")))
            .cancel_after(1, &cancel),
    );

    let batch = fetcher(pages.clone(), 2)
        .fetch(Source::LinkedIn, &query(), 10, &cancel)
        .await
        .expect("cancellation returns the partial batch");

    assert_eq!(pages.calls(), 1);
    assert!(batch.cancelled);
    assert_eq!(batch.pages_requested, 1);
    assert_eq!(batch.pages_skipped, 1);
    assert!(batch.listings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn single_page_source_neither_waits_nor_asks_again() {
    let rows = [remoteok_row(&Card::new("Rust Engineer", "Acme", ""), &["rust"])];
    let pages = Arc::new(
        ScriptedPages::new().respond(Source::RemoteOk, 0, page(REMOTEOK, remoteok_page(&rows))),
    );
    let policy = PagingPolicy {
        page_delay: fixed_delay(5_000),
        ..fast_policy(3)
    };
    let started = Instant::now();

    let batch = SourceFetcher::new(pages.clone(), policy)
        .fetch(Source::RemoteOk, &query(), 50, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(pages.calls(), 1);
    assert_eq!(batch.pages_requested, 1);
    assert_eq!(batch.listings.len(), 1);
}
