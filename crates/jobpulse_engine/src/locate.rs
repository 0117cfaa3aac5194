use jobpulse_core::clean_text;
use scraper::{ElementRef, Html, Selector};

use crate::profile::{FieldRule, Probe, Target};

/// Finds the text of one field inside a listing document.
pub trait FieldLocator: Send + Sync {
    /// Whitespace-collapsed, non-empty text for `rule`, or `None`.
    fn locate(&self, document: &str, rule: &FieldRule) -> Option<String>;
}

/// [`FieldLocator`] backed by `scraper` CSS selectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperLocator;

impl FieldLocator for ScraperLocator {
    fn locate(&self, document: &str, rule: &FieldRule) -> Option<String> {
        let fragment = parse_listing(document);
        rule.probes
            .iter()
            .find_map(|probe| run_probe(&fragment, probe))
            .or_else(|| rule.fallback.map(str::to_string))
    }
}

/// Table rows only survive HTML parsing inside a table.
fn parse_listing(document: &str) -> Html {
    let trimmed = document.trim_start();
    let is_row = trimmed
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("<tr"));
    if is_row {
        Html::parse_fragment(&format!("<table>{document}</table>"))
    } else {
        Html::parse_fragment(document)
    }
}

fn run_probe(fragment: &Html, probe: &Probe) -> Option<String> {
    let selector = Selector::parse(probe.selector).ok()?;
    let value = match probe.target {
        Target::Text => fragment.select(&selector).next().map(element_text)?,
        Target::Attr(name) => fragment
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(name))
            .map(clean_text)?,
        Target::AllText { skip_prefix } => fragment
            .select(&selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .filter(|text| skip_prefix.is_none_or(|prefix| !text.starts_with(prefix)))
            .collect::<Vec<_>>()
            .join(" "),
    };
    (!value.is_empty()).then_some(value)
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}
