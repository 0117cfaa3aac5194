use jobpulse_core::{DedupedResultSet, JobPosting, Source};
use pretty_assertions::assert_eq;

fn posting(title: &str, company: &str, location: &str, source: Source, url: &str) -> JobPosting {
    JobPosting::new(title, company, source, url)
        .unwrap()
        .with_location(Some(location))
}

#[test]
fn same_content_from_different_sources_is_admitted_once() {
    let mut set = DedupedResultSet::new();
    let first = posting("Rust Engineer", "Acme", "Berlin", Source::LinkedIn, "https://a/1");
    let again = posting("rust  engineer", "ACME", "berlin", Source::RemoteOk, "https://b/9");

    assert!(set.admit(first));
    assert!(!set.admit(again));
    assert_eq!(set.len(), 1);

    // First occurrence keeps its attribution.
    let kept = set.iter().next().unwrap();
    assert_eq!(kept.source(), Source::LinkedIn);
    assert_eq!(kept.source_url(), "https://a/1");
}

#[test]
fn readmitting_identical_posting_grows_by_at_most_one() {
    let mut set = DedupedResultSet::new();
    let p = posting("Data Scientist", "Initech", "Austin, TX", Source::LinkedIn, "u");
    set.admit(p.clone());
    set.admit(p.clone());
    set.admit(p);
    assert_eq!(set.len(), 1);
}

#[test]
fn location_is_part_of_identity() {
    let mut set = DedupedResultSet::new();
    assert!(set.admit(posting("Engineer", "Acme", "Berlin", Source::LinkedIn, "u1")));
    assert!(set.admit(posting("Engineer", "Acme", "Remote", Source::LinkedIn, "u2")));
    assert_eq!(set.len(), 2);
}

#[test]
fn iteration_follows_admission_order() {
    let set: DedupedResultSet = [
        posting("C", "x", "l", Source::RemoteOk, "3"),
        posting("A", "x", "l", Source::RemoteOk, "1"),
        posting("c", "X", "L", Source::LinkedIn, "dup"),
        posting("B", "x", "l", Source::RemoteOk, "2"),
    ]
    .into_iter()
    .collect();

    let titles: Vec<&str> = set.iter().map(|p| p.title()).collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
}

#[test]
fn embedded_control_characters_cannot_merge_distinct_postings() {
    let mut set = DedupedResultSet::new();
    let a = posting("Rust\u{1f}Acme", "Berlin", "Remote", Source::LinkedIn, "u1");
    let b = posting("Rust", "Acme\u{1f}Berlin", "Remote", Source::LinkedIn, "u2");

    assert_ne!(a.fingerprint(), b.fingerprint());
    assert!(set.admit(a));
    assert!(set.admit(b));
    assert_eq!(set.len(), 2);
}
