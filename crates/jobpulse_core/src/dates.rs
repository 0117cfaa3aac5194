use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

/// Parse a posted-date string as shown by job boards.
///
/// Accepts ISO dates and date-times as well as relative phrases such as
/// "3 days ago", "yesterday" or "Posted 2 weeks ago". Relative phrases resolve
/// against `today`, which callers take from the fetch timestamp so extraction
/// stays deterministic. Anything else yields `None`.
pub fn parse_posted_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(date) = parse_absolute(trimmed) {
        return Some(date);
    }

    let lowered = trimmed.to_lowercase();
    let phrase = strip_noise(&lowered);
    if let Some(date) = parse_absolute(phrase) {
        return Some(date);
    }

    if ["just now", "today", "hour", "minute", "second"]
        .iter()
        .any(|needle| phrase.contains(needle))
    {
        return Some(today);
    }
    if phrase.contains("yesterday") {
        return today.checked_sub_days(Days::new(1));
    }

    let amount = leading_amount(phrase)?;
    let days = if phrase.contains("day") {
        amount
    } else if phrase.contains("week") {
        amount.checked_mul(7)?
    } else if phrase.contains("month") {
        amount.checked_mul(30)?
    } else if phrase.contains("year") {
        amount.checked_mul(365)?
    } else {
        return None;
    };
    today.checked_sub_days(Days::new(days))
}

fn parse_absolute(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

fn strip_noise(phrase: &str) -> &str {
    let mut rest = phrase.trim();
    for prefix in ["posted", "reposted", "on"] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            if stripped.is_empty() || stripped.starts_with(char::is_whitespace) {
                rest = stripped.trim_start();
            }
        }
    }
    rest
}

/// First number in the phrase; "a"/"an" count as one.
fn leading_amount(phrase: &str) -> Option<u64> {
    for word in phrase.split(|c: char| c.is_whitespace() || c == '+') {
        if word == "a" || word == "an" {
            return Some(1);
        }
        let digits: String = word.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
    }
    None
}
