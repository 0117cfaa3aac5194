use std::fmt;

use jobpulse_core::{RawListing, Source};

/// Zero-based page index within one source's result listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageToken(pub usize);

impl PageToken {
    pub const FIRST: PageToken = PageToken(0);

    pub fn next(self) -> PageToken {
        PageToken(self.0 + 1)
    }
}

/// What to ask a source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: String,
    /// Place filter for boards that support one.
    pub location: String,
}

impl SearchQuery {
    pub fn new(terms: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            terms: terms.into(),
            location: location.into(),
        }
    }
}

/// One fetched result page before it is split into listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Page(PageDocument),
    NoMorePages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    /// Anti-bot wall, captcha or rate limiting.
    Blocked,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl PageFailureKind {
    /// Whether another attempt at the same page may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PageFailureKind::Timeout | PageFailureKind::Blocked | PageFailureKind::Network => true,
            PageFailureKind::HttpStatus(code) => *code >= 500,
            PageFailureKind::InvalidUrl | PageFailureKind::TooLarge { .. } => false,
        }
    }
}

impl fmt::Display for PageFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFailureKind::InvalidUrl => write!(f, "invalid url"),
            PageFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            PageFailureKind::Timeout => write!(f, "timeout"),
            PageFailureKind::Blocked => write!(f, "blocked by anti-bot protection"),
            PageFailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            PageFailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PageError {
    pub kind: PageFailureKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: PageFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A source produced no usable page at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fetching from {source_name} failed: {reason}")]
pub struct FetchError {
    pub source_name: Source,
    pub reason: String,
    pub pages_requested: usize,
}

/// Listings gathered from one source plus paging counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBatch {
    pub source: Source,
    pub listings: Vec<RawListing>,
    pub pages_requested: usize,
    pub pages_skipped: usize,
    /// Cancellation stopped pagination early.
    pub cancelled: bool,
}
