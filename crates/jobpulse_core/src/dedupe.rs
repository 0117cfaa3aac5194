use std::collections::HashSet;

use crate::normalize::normalize_key;
use crate::JobPosting;

// `normalize_key` strips control characters, so the unit separator cannot
// appear inside a component.
const KEY_SEPARATOR: char = '\u{1f}';

/// Content identity of a posting: lowercased, whitespace-collapsed
/// `(title, company, location)`.
pub fn fingerprint(title: &str, company: &str, location: &str) -> String {
    let mut key = normalize_key(title);
    key.push(KEY_SEPARATOR);
    key.push_str(&normalize_key(company));
    key.push(KEY_SEPARATOR);
    key.push_str(&normalize_key(location));
    key
}

/// Fingerprint-unique postings in first-admitted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupedResultSet {
    postings: Vec<JobPosting>,
    seen: HashSet<String>,
}

impl DedupedResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `posting` unless its fingerprint is already present.
    /// Returns `true` when the posting was newly admitted.
    pub fn admit(&mut self, posting: JobPosting) -> bool {
        if self.seen.contains(posting.fingerprint()) {
            return false;
        }
        self.seen.insert(posting.fingerprint().to_string());
        self.postings.push(posting);
        true
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobPosting> {
        self.postings.iter()
    }

    pub fn as_slice(&self) -> &[JobPosting] {
        &self.postings
    }
}

impl<'a> IntoIterator for &'a DedupedResultSet {
    type Item = &'a JobPosting;
    type IntoIter = std::slice::Iter<'a, JobPosting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}

impl FromIterator<JobPosting> for DedupedResultSet {
    fn from_iter<T: IntoIterator<Item = JobPosting>>(iter: T) -> Self {
        let mut set = Self::new();
        for posting in iter {
            set.admit(posting);
        }
        set
    }
}
