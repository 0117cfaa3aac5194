//! JobPulse engine: page retrieval, extraction and the run orchestrator.
mod decode;
mod export;
mod extract;
mod fetch;
mod locate;
mod page_client;
mod persist;
mod pipeline;
mod profile;
mod types;

pub use decode::{decode_page, DecodedPage};
pub use export::{
    export_run, parse_csv, read_csv, render_csv, ExportError, ExportOptions, ExportSummary,
    ExportedRow, CSV_COLUMNS,
};
pub use extract::ListingExtractor;
pub use fetch::{system_clock, FetchClock, PagingPolicy, SourceFetcher};
pub use locate::{FieldLocator, ScraperLocator};
pub use page_client::{FetchSettings, PageSource, ReqwestPageClient};
pub use persist::{OutputDir, PersistError};
pub use pipeline::{Pipeline, PipelineRun};
pub use profile::{FieldRule, Probe, SourceProfile, Target};
pub use types::{
    FetchError, PageDocument, PageError, PageFailureKind, PageOutcome, PageToken, SearchQuery,
    SourceBatch,
};
