use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::dedupe::fingerprint;
use crate::normalize::clean_text;
use crate::Source;

/// Location used when a listing does not carry one.
pub const UNSPECIFIED_LOCATION: &str = "unspecified";

/// One listing document as handed from the fetcher to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    /// Markup of a single listing card.
    pub document: String,
    pub source: Source,
    pub fetch_timestamp: DateTime<Utc>,
    /// Page the card was found on.
    pub source_url: String,
}

/// Named fields a listing may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Company,
    Location,
    Skills,
    PostedDate,
    Link,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Company => "company",
            Field::Location => "location",
            Field::Skills => "skills",
            Field::PostedDate => "posted_date",
            Field::Link => "link",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostingError {
    #[error("required field {0} is empty")]
    EmptyField(Field),
}

/// A listing whose required fields could not be located.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{listing_source} listing is missing required field {missing_field}")]
pub struct ExtractionError {
    pub listing_source: Source,
    pub missing_field: Field,
}

/// Normalized job posting. Title and company are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPosting {
    title: String,
    company: String,
    location: String,
    skills: BTreeSet<String>,
    posted_date: Option<NaiveDate>,
    source: Source,
    source_url: String,
    fingerprint: String,
}

impl JobPosting {
    /// Builds a posting from its required parts. Text is whitespace-collapsed;
    /// location starts out as [`UNSPECIFIED_LOCATION`].
    pub fn new(
        title: &str,
        company: &str,
        source: Source,
        source_url: impl Into<String>,
    ) -> Result<Self, PostingError> {
        let title = clean_text(title);
        if title.is_empty() {
            return Err(PostingError::EmptyField(Field::Title));
        }
        let company = clean_text(company);
        if company.is_empty() {
            return Err(PostingError::EmptyField(Field::Company));
        }
        let location = UNSPECIFIED_LOCATION.to_string();
        let fingerprint = fingerprint(&title, &company, &location);
        Ok(Self {
            title,
            company,
            location,
            skills: BTreeSet::new(),
            posted_date: None,
            source,
            source_url: source_url.into(),
            fingerprint,
        })
    }

    /// Sets the location; `None` or blank text keeps [`UNSPECIFIED_LOCATION`].
    pub fn with_location(mut self, location: Option<&str>) -> Self {
        let cleaned = location.map(clean_text).filter(|l| !l.is_empty());
        self.location = cleaned.unwrap_or_else(|| UNSPECIFIED_LOCATION.to_string());
        self.fingerprint = fingerprint(&self.title, &self.company, &self.location);
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skills = skills
            .into_iter()
            .map(|s| clean_text(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    pub fn with_posted_date(mut self, date: Option<NaiveDate>) -> Self {
        self.posted_date = date;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn skills(&self) -> &BTreeSet<String> {
        &self.skills
    }

    pub fn posted_date(&self) -> Option<NaiveDate> {
        self.posted_date
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
