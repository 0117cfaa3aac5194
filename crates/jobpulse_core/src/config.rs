use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::trends::{LocationGranularity, TrendOptions};
use crate::{SkillVocabulary, Source};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("unknown source {0:?}")]
    UnknownSource(String),
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("max_results_per_source must be positive, got {0}")]
    InvalidMaxResults(i64),
    #[error("top_n must be positive, got {0}")]
    InvalidTopN(i64),
    #[error("max_pages_per_source must be positive, got {0}")]
    InvalidMaxPages(i64),
    #[error("retry.max_attempts must be at least 1")]
    InvalidRetryAttempts,
    #[error("retry backoff range is inverted ({initial_ms}ms > {max_ms}ms)")]
    InvalidBackoff { initial_ms: u64, max_ms: u64 },
    #[error("page delay range is inverted ({min_ms}ms > {max_ms}ms)")]
    InvalidDelayRange { min_ms: u64, max_ms: u64 },
    #[error("skill vocabulary contains an empty entry")]
    EmptyVocabularyEntry,
    #[error("skill vocabulary is empty")]
    EmptyVocabulary,
    #[error("skill vocabulary entry {0:?} is too large to match")]
    InvalidVocabularyEntry(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

/// Inclusive range for the random politeness delay between page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const DISABLED: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub fn is_disabled(&self) -> bool {
        self.max_ms == 0
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_ms: 3_000,
            max_ms: 6_000,
        }
    }
}

/// User-facing pipeline configuration, as read from a RON file or built by
/// the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<String>,
    pub query: String,
    /// Search location passed to boards that filter by place.
    pub location: String,
    pub max_results_per_source: i64,
    pub top_n: i64,
    /// Replaces the built-in vocabulary when set.
    pub skill_vocabulary: Option<Vec<String>>,
    pub max_pages_per_source: i64,
    pub retry: RetryConfig,
    pub page_delay_ms: DelayRange,
    pub concurrent: bool,
    pub location_granularity: LocationGranularity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Source::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            query: "software engineer".to_string(),
            location: "United States".to_string(),
            max_results_per_source: 50,
            top_n: 10,
            skill_vocabulary: None,
            max_pages_per_source: 3,
            retry: RetryConfig::default(),
            page_delay_ms: DelayRange::default(),
            concurrent: false,
            location_granularity: LocationGranularity::Full,
        }
    }
}

impl PipelineConfig {
    /// Check every option; nothing is fetched with a config that fails here.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let mut sources = Vec::new();
        for name in &self.sources {
            let source: Source = name
                .parse()
                .map_err(|_| ConfigError::UnknownSource(name.clone()))?;
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let query = crate::clean_text(&self.query);
        if query.is_empty() {
            return Err(ConfigError::EmptyQuery);
        }

        let max_results_per_source = positive(self.max_results_per_source)
            .ok_or(ConfigError::InvalidMaxResults(self.max_results_per_source))?;
        let top_n = positive(self.top_n).ok_or(ConfigError::InvalidTopN(self.top_n))?;
        let max_pages_per_source = positive(self.max_pages_per_source)
            .ok_or(ConfigError::InvalidMaxPages(self.max_pages_per_source))?;

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts);
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff {
                initial_ms: self.retry.initial_backoff_ms,
                max_ms: self.retry.max_backoff_ms,
            });
        }
        if self.page_delay_ms.min_ms > self.page_delay_ms.max_ms {
            return Err(ConfigError::InvalidDelayRange {
                min_ms: self.page_delay_ms.min_ms,
                max_ms: self.page_delay_ms.max_ms,
            });
        }

        let vocabulary = match &self.skill_vocabulary {
            Some(terms) => Arc::new(SkillVocabulary::from_terms(terms)?),
            None => SkillVocabulary::builtin(),
        };

        Ok(ValidatedConfig {
            sources,
            query,
            location: crate::clean_text(&self.location),
            max_results_per_source,
            top_n,
            vocabulary,
            max_pages_per_source,
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            },
            page_delay: self.page_delay_ms,
            concurrent: self.concurrent,
            trend_options: TrendOptions {
                location_granularity: self.location_granularity,
            },
        })
    }
}

fn positive(value: i64) -> Option<NonZeroUsize> {
    usize::try_from(value).ok().and_then(NonZeroUsize::new)
}

/// Page retry schedule: exponential backoff from `initial_backoff`, capped at
/// `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_attempts: retry.max_attempts,
            initial_backoff: Duration::from_millis(retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(retry.max_backoff_ms),
        }
    }
}

/// Configuration that passed [`PipelineConfig::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    sources: Vec<Source>,
    query: String,
    location: String,
    max_results_per_source: NonZeroUsize,
    top_n: NonZeroUsize,
    vocabulary: Arc<SkillVocabulary>,
    max_pages_per_source: NonZeroUsize,
    retry: RetryPolicy,
    page_delay: DelayRange,
    concurrent: bool,
    trend_options: TrendOptions,
}

impl ValidatedConfig {
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn max_results_per_source(&self) -> NonZeroUsize {
        self.max_results_per_source
    }

    pub fn top_n(&self) -> NonZeroUsize {
        self.top_n
    }

    pub fn vocabulary(&self) -> &Arc<SkillVocabulary> {
        &self.vocabulary
    }

    pub fn max_pages_per_source(&self) -> NonZeroUsize {
        self.max_pages_per_source
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn page_delay(&self) -> DelayRange {
        self.page_delay
    }

    pub fn concurrent(&self) -> bool {
        self.concurrent
    }

    pub fn trend_options(&self) -> &TrendOptions {
        &self.trend_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let validated = PipelineConfig::default().validate().unwrap();
        assert_eq!(validated.sources(), &[Source::LinkedIn, Source::RemoteOk]);
        assert_eq!(validated.top_n().get(), 10);
        assert_eq!(validated.retry().max_attempts, 3);
    }

    #[test]
    fn duplicate_sources_collapse() {
        let config = PipelineConfig {
            sources: vec!["remoteok".into(), "RemoteOK".into()],
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate().unwrap().sources(), &[Source::RemoteOk]);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(350));
    }
}
