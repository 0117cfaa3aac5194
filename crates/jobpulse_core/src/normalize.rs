/// Collapse all whitespace runs (including newlines and tabs) into single spaces
/// and trim both ends. Control characters count as whitespace, so the result
/// never contains one.
pub fn clean_text(input: &str) -> String {
    input
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Identity key used for fingerprints and trend buckets: whitespace-collapsed and
/// lowercased.
pub fn normalize_key(input: &str) -> String {
    clean_text(input).to_lowercase()
}
