use std::sync::Arc;

use jobpulse_core::{
    parse_posted_date, ExtractionError, Field, JobPosting, PostingError, RawListing,
    SkillVocabulary,
};
use url::Url;

use crate::locate::{FieldLocator, ScraperLocator};
use crate::profile::SourceProfile;

/// Turns raw listing markup into [`JobPosting`]s using each board's field rules.
pub struct ListingExtractor<L = ScraperLocator> {
    locator: L,
    vocabulary: Arc<SkillVocabulary>,
}

impl ListingExtractor<ScraperLocator> {
    pub fn new(vocabulary: Arc<SkillVocabulary>) -> Self {
        Self::with_locator(ScraperLocator, vocabulary)
    }
}

impl<L: FieldLocator> ListingExtractor<L> {
    pub fn with_locator(locator: L, vocabulary: Arc<SkillVocabulary>) -> Self {
        Self {
            locator,
            vocabulary,
        }
    }

    /// Title and company are required; every other field falls back to its
    /// default when it cannot be located.
    pub fn extract(&self, listing: RawListing) -> Result<JobPosting, ExtractionError> {
        let profile = SourceProfile::for_source(listing.source);
        let locate = |field: Field| self.locator.locate(&listing.document, profile.rule(field));
        let missing = |field: Field| ExtractionError {
            listing_source: listing.source,
            missing_field: field,
        };

        let title = locate(Field::Title).ok_or_else(|| missing(Field::Title))?;
        let company = locate(Field::Company).ok_or_else(|| missing(Field::Company))?;

        let source_url = locate(Field::Link)
            .and_then(|href| resolve_link(&listing.source_url, &href))
            .unwrap_or_else(|| listing.source_url.clone());
        let skills = locate(Field::Skills)
            .map(|text| self.vocabulary.match_skills(&text))
            .unwrap_or_default();
        let today = listing.fetch_timestamp.date_naive();
        let posted_date = locate(Field::PostedDate).and_then(|raw| parse_posted_date(&raw, today));
        let location = locate(Field::Location);

        let posting = JobPosting::new(&title, &company, listing.source, source_url)
            .map_err(|PostingError::EmptyField(field)| missing(field))?;
        Ok(posting
            .with_location(location.as_deref())
            .with_skills(skills)
            .with_posted_date(posted_date))
    }
}

fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(page_url)
            .and_then(|base| base.join(href))
            .ok()
            .map(|url| url.to_string()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_link;

    #[test]
    fn relative_links_resolve_against_page() {
        assert_eq!(
            resolve_link("https://remoteok.com/remote-rust-jobs", "/remote-jobs/123").as_deref(),
            Some("https://remoteok.com/remote-jobs/123")
        );
        assert_eq!(
            resolve_link("https://x.test/a", "https://y.test/b").as_deref(),
            Some("https://y.test/b")
        );
    }
}
