use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;

use crate::{DedupedResultSet, Source};

/// How one source's part of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Completed,
    /// Zero pages could be fetched.
    Failed,
    /// Cancelled before the source started.
    NotStarted,
}

/// Per-source counters collected by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: Source,
    pub status: SourceStatus,
    pub pages_requested: usize,
    pub pages_skipped: usize,
    pub fetched: usize,
    pub extracted: usize,
    pub failed: usize,
    pub admitted: usize,
    pub duplicates_dropped: usize,
    pub failure: Option<String>,
}

impl SourceReport {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            status: SourceStatus::Completed,
            pages_requested: 0,
            pages_skipped: 0,
            fetched: 0,
            extracted: 0,
            failed: 0,
            admitted: 0,
            duplicates_dropped: 0,
            failure: None,
        }
    }

    pub fn not_started(source: Source) -> Self {
        Self {
            status: SourceStatus::NotStarted,
            ..Self::new(source)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: Source,
    pub reason: String,
}

/// Why a run ended with the result set it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// At least one posting was admitted.
    Results,
    /// Sources answered but nothing usable matched.
    NoMatches,
    /// Every attempted source failed to fetch.
    AllSourcesFailed,
    /// Cancelled before anything was admitted.
    Cancelled,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Results => "results",
            RunOutcome::NoMatches => "no_matches",
            RunOutcome::AllSourcesFailed => "all_sources_failed",
            RunOutcome::Cancelled => "cancelled",
        }
    }
}

/// Immutable account of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRunSummary {
    fetched: usize,
    extracted: usize,
    duplicates_dropped: usize,
    failed: usize,
    pages_skipped: usize,
    result_count: usize,
    failures: Vec<SourceFailure>,
    sources: Vec<SourceReport>,
    source_breakdown: BTreeMap<Source, usize>,
    date_range: Option<(NaiveDate, NaiveDate)>,
    elapsed: Duration,
    cancelled: bool,
    outcome: RunOutcome,
}

impl PipelineRunSummary {
    /// Raw listing documents returned by all fetchers.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Listings turned into postings.
    pub fn extracted(&self) -> usize {
        self.extracted
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Listings dropped because required fields were missing.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn pages_skipped(&self) -> usize {
        self.pages_skipped
    }

    pub fn result_count(&self) -> usize {
        self.result_count
    }

    pub fn failures(&self) -> &[SourceFailure] {
        &self.failures
    }

    pub fn failed_sources(&self) -> Vec<Source> {
        self.failures.iter().map(|f| f.source).collect()
    }

    pub fn sources(&self) -> &[SourceReport] {
        &self.sources
    }

    /// Admitted postings per source.
    pub fn source_breakdown(&self) -> &BTreeMap<Source, usize> {
        &self.source_breakdown
    }

    /// Earliest and latest posted date among admitted postings.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_range
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }
}

/// Collects per-source reports during a run and freezes them into a
/// [`PipelineRunSummary`].
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    sources: Vec<SourceReport>,
    cancelled: bool,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_source(&mut self, report: SourceReport) {
        self.sources.push(report);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn finish(self, results: &DedupedResultSet, elapsed: Duration) -> PipelineRunSummary {
        let sum = |f: fn(&SourceReport) -> usize| self.sources.iter().map(f).sum::<usize>();
        let fetched = sum(|r| r.fetched);
        let extracted = sum(|r| r.extracted);
        let duplicates_dropped = sum(|r| r.duplicates_dropped);
        let failed = sum(|r| r.failed);
        let pages_skipped = sum(|r| r.pages_skipped);

        let failures: Vec<SourceFailure> = self
            .sources
            .iter()
            .filter(|r| r.status == SourceStatus::Failed)
            .map(|r| SourceFailure {
                source: r.source,
                reason: r.failure.clone().unwrap_or_default(),
            })
            .collect();

        let mut source_breakdown = BTreeMap::new();
        for posting in results {
            *source_breakdown.entry(posting.source()).or_insert(0) += 1;
        }

        let date_range = results
            .iter()
            .filter_map(|p| p.posted_date())
            .fold(None, |range: Option<(NaiveDate, NaiveDate)>, date| match range {
                None => Some((date, date)),
                Some((lo, hi)) => Some((lo.min(date), hi.max(date))),
            });

        let attempted = self
            .sources
            .iter()
            .filter(|r| r.status != SourceStatus::NotStarted)
            .count();
        let outcome = if !results.is_empty() {
            RunOutcome::Results
        } else if self.cancelled {
            RunOutcome::Cancelled
        } else if attempted > 0 && failures.len() == attempted {
            RunOutcome::AllSourcesFailed
        } else {
            RunOutcome::NoMatches
        };

        PipelineRunSummary {
            fetched,
            extracted,
            duplicates_dropped,
            failed,
            pages_skipped,
            result_count: results.len(),
            failures,
            sources: self.sources,
            source_breakdown,
            date_range,
            elapsed,
            cancelled: self.cancelled,
            outcome,
        }
    }
}
