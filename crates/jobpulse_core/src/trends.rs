use std::collections::HashMap;
use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::normalize::{clean_text, normalize_key};
use crate::{DedupedResultSet, UNSPECIFIED_LOCATION};

/// How location strings are bucketed before counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationGranularity {
    /// Count the location string as extracted.
    #[default]
    Full,
    /// Count only the part before the first comma ("Austin, TX" -> "Austin").
    City,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrendOptions {
    pub location_granularity: LocationGranularity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendEntry {
    pub value: String,
    pub count: usize,
}

/// Ranked occurrence counts for one category: descending count, ties in
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrendTable {
    entries: Vec<TrendEntry>,
    distinct: usize,
}

impl TrendTable {
    pub fn ranked(&self) -> &[TrendEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct values seen before truncation to top-N.
    pub fn distinct(&self) -> usize {
        self.distinct
    }

    /// Count for `value`, matched case-insensitively, if it made the table.
    pub fn count_of(&self, value: &str) -> Option<usize> {
        let key = normalize_key(value);
        self.entries
            .iter()
            .find(|entry| normalize_key(&entry.value) == key)
            .map(|entry| entry.count)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrendReport {
    pub skills: TrendTable,
    pub titles: TrendTable,
    pub locations: TrendTable,
}

/// Aggregate with default options.
pub fn aggregate(set: &DedupedResultSet, top_n: i64) -> Result<TrendReport, ConfigError> {
    aggregate_with(set, top_n, &TrendOptions::default())
}

/// Build skill, title and location tables in one pass over `set`.
pub fn aggregate_with(
    set: &DedupedResultSet,
    top_n: i64,
    options: &TrendOptions,
) -> Result<TrendReport, ConfigError> {
    let limit = usize::try_from(top_n)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(ConfigError::InvalidTopN(top_n))?;
    Ok(rank(set, limit, options))
}

/// Like [`aggregate_with`] for an already validated limit.
pub fn rank(set: &DedupedResultSet, limit: NonZeroUsize, options: &TrendOptions) -> TrendReport {
    let mut skills = Counter::default();
    let mut titles = Counter::default();
    let mut locations = Counter::default();

    for posting in set {
        for skill in posting.skills() {
            skills.bump(skill);
        }
        titles.bump(posting.title());
        let location = match options.location_granularity {
            LocationGranularity::Full => posting.location().to_string(),
            LocationGranularity::City => city_of(posting.location()),
        };
        locations.bump(&location);
    }

    TrendReport {
        skills: skills.into_table(limit.get()),
        titles: titles.into_table(limit.get()),
        locations: locations.into_table(limit.get()),
    }
}

fn city_of(location: &str) -> String {
    let city = location.split(',').next().map(clean_text).unwrap_or_default();
    if city.is_empty() {
        UNSPECIFIED_LOCATION.to_string()
    } else {
        city
    }
}

/// Counts keyed by normalized value; keeps the first-seen spelling for display.
#[derive(Default)]
struct Counter {
    index: HashMap<String, usize>,
    entries: Vec<TrendEntry>,
}

impl Counter {
    fn bump(&mut self, value: &str) {
        let key = normalize_key(value);
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].count += 1,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(TrendEntry {
                    value: clean_text(value),
                    count: 1,
                });
            }
        }
    }

    fn into_table(mut self, limit: usize) -> TrendTable {
        let distinct = self.entries.len();
        // Stable sort keeps first-seen order among equal counts.
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(limit);
        TrendTable {
            entries: self.entries,
            distinct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::city_of;

    #[test]
    fn city_takes_text_before_first_comma() {
        assert_eq!(city_of("Austin, TX, United States"), "Austin");
        assert_eq!(city_of("Remote"), "Remote");
        assert_eq!(city_of(", TX"), "unspecified");
    }
}
