use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures_util::future::join_all;
use jobpulse_core::{
    rank, ConfigError, DedupedResultSet, JobPosting, PipelineConfig, PipelineRunSummary,
    Source, SourceReport, SourceStatus, SummaryBuilder, TrendReport, ValidatedConfig,
};
use pulse_logging::{pulse_debug, pulse_error, pulse_info, pulse_trace};
use tokio_util::sync::CancellationToken;

use crate::extract::ListingExtractor;
use crate::fetch::{system_clock, FetchClock, PagingPolicy, SourceFetcher};
use crate::{PageSource, SearchQuery};

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub results: DedupedResultSet,
    pub trends: TrendReport,
    pub summary: PipelineRunSummary,
}

/// Result set shared by concurrently running sources. Admission is serialized
/// by the mutex.
#[derive(Debug, Default, Clone)]
struct SharedResults {
    inner: Arc<Mutex<DedupedResultSet>>,
}

impl SharedResults {
    fn admit(&self, posting: JobPosting) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .admit(posting)
    }

    fn into_inner(self) -> DedupedResultSet {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Sequences fetch -> extract -> dedupe for every configured source, then
/// aggregates once.
pub struct Pipeline {
    pages: Arc<dyn PageSource>,
    clock: FetchClock,
}

impl Pipeline {
    pub fn new(pages: Arc<dyn PageSource>) -> Self {
        Self {
            pages,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: FetchClock) -> Self {
        self.clock = clock;
        self
    }

    /// Validate `config` and run. Invalid configuration fails before any page
    /// is requested.
    pub async fn run_config(
        &self,
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun, ConfigError> {
        let validated = config.validate()?;
        Ok(self.run(&validated, cancel).await)
    }

    pub async fn run(&self, config: &ValidatedConfig, cancel: &CancellationToken) -> PipelineRun {
        let started = Instant::now();
        pulse_info!(
            "Run started: query={:?} sources={:?} max_results_per_source={} concurrent={}",
            config.query(),
            config.sources(),
            config.max_results_per_source(),
            config.concurrent()
        );

        let shared = SharedResults::default();
        let fetcher = SourceFetcher::new(
            Arc::clone(&self.pages),
            PagingPolicy {
                max_pages: config.max_pages_per_source().get(),
                retry: config.retry(),
                page_delay: config.page_delay(),
            },
        )
        .with_clock(Arc::clone(&self.clock));
        let extractor = ListingExtractor::new(Arc::clone(config.vocabulary()));
        let query = SearchQuery::new(config.query(), config.location());

        let reports: Vec<SourceReport> = if config.concurrent() {
            let tasks = config.sources().iter().map(|&source| {
                run_source(source, config, &fetcher, &extractor, &query, &shared, cancel)
            });
            join_all(tasks).await
        } else {
            let mut reports = Vec::with_capacity(config.sources().len());
            for &source in config.sources() {
                let report =
                    run_source(source, config, &fetcher, &extractor, &query, &shared, cancel).await;
                reports.push(report);
            }
            reports
        };

        let mut builder = SummaryBuilder::new();
        for report in reports {
            builder.record_source(report);
        }
        if cancel.is_cancelled() {
            builder.mark_cancelled();
        }

        let results = shared.into_inner();
        let trends = rank(&results, config.top_n(), config.trend_options());
        let summary = builder.finish(&results, started.elapsed());
        pulse_info!(
            "Run finished in {:.2}s: fetched={} extracted={} duplicates={} failed={} results={} outcome={}",
            summary.elapsed().as_secs_f64(),
            summary.fetched(),
            summary.extracted(),
            summary.duplicates_dropped(),
            summary.failed(),
            summary.result_count(),
            summary.outcome().as_str()
        );

        PipelineRun {
            results,
            trends,
            summary,
        }
    }
}

async fn run_source(
    source: Source,
    config: &ValidatedConfig,
    fetcher: &SourceFetcher,
    extractor: &ListingExtractor,
    query: &SearchQuery,
    shared: &SharedResults,
    cancel: &CancellationToken,
) -> SourceReport {
    if cancel.is_cancelled() {
        pulse_info!("Run cancelled before {}", source);
        return SourceReport::not_started(source);
    }

    pulse_info!("--- Starting {} ---", source.display_name());
    let mut report = SourceReport::new(source);
    let batch = match fetcher
        .fetch(source, query, config.max_results_per_source().get(), cancel)
        .await
    {
        Ok(batch) => batch,
        Err(err) => {
            pulse_error!("{}", err);
            report.status = SourceStatus::Failed;
            report.pages_requested = err.pages_requested;
            report.pages_skipped = err.pages_requested;
            report.failure = Some(err.reason);
            return report;
        }
    };

    report.pages_requested = batch.pages_requested;
    report.pages_skipped = batch.pages_skipped;
    report.fetched = batch.listings.len();

    for listing in batch.listings {
        match extractor.extract(listing) {
            Ok(posting) => {
                report.extracted += 1;
                let title = posting.title().to_string();
                if shared.admit(posting) {
                    report.admitted += 1;
                } else {
                    report.duplicates_dropped += 1;
                    pulse_trace!("Duplicate dropped from {}: {}", source, title);
                }
            }
            Err(err) => {
                report.failed += 1;
                pulse_debug!("{}", err);
            }
        }
    }

    pulse_info!(
        "--- Finished {}: {} fetched, {} admitted, {} duplicates, {} unusable ---",
        source.display_name(),
        report.fetched,
        report.admitted,
        report.duplicates_dropped,
        report.failed
    );
    report
}
