//! JobPulse core: pure data model, normalization and aggregation.
mod config;
mod dates;
mod dedupe;
mod normalize;
mod posting;
mod source;
mod summary;
mod trends;
mod vocabulary;

pub use config::{ConfigError, DelayRange, PipelineConfig, RetryConfig, RetryPolicy, ValidatedConfig};
pub use dates::parse_posted_date;
pub use dedupe::{fingerprint, DedupedResultSet};
pub use normalize::{clean_text, normalize_key};
pub use posting::{
    ExtractionError, Field, JobPosting, PostingError, RawListing, UNSPECIFIED_LOCATION,
};
pub use source::{Source, UnknownSource};
pub use summary::{
    PipelineRunSummary, RunOutcome, SourceFailure, SourceReport, SourceStatus, SummaryBuilder,
};
pub use trends::{
    aggregate, aggregate_with, rank, LocationGranularity, TrendEntry, TrendOptions, TrendReport,
    TrendTable,
};
pub use vocabulary::{SkillVocabulary, BUILTIN_SKILLS};
