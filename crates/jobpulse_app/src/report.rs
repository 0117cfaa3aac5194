//! Plain-text rendering of a finished run.

use std::fmt::Write;

use jobpulse_core::{RunOutcome, SourceReport, SourceStatus, TrendTable};
use jobpulse_engine::PipelineRun;

pub fn render(run: &PipelineRun) -> String {
    let mut out = String::new();
    let summary = &run.summary;

    let _ = writeln!(
        out,
        "JobPulse run: {} posting(s) in {:.1}s",
        summary.result_count(),
        summary.elapsed().as_secs_f64()
    );
    let _ = writeln!(
        out,
        "  fetched {} | extracted {} | duplicates dropped {} | unusable {} | pages skipped {}",
        summary.fetched(),
        summary.extracted(),
        summary.duplicates_dropped(),
        summary.failed(),
        summary.pages_skipped()
    );
    match summary.outcome() {
        RunOutcome::Results => {}
        RunOutcome::NoMatches => {
            let _ = writeln!(out, "  No postings matched the query.");
        }
        RunOutcome::AllSourcesFailed => {
            let _ = writeln!(out, "  Every source failed; nothing was collected.");
        }
        RunOutcome::Cancelled => {
            let _ = writeln!(out, "  Run cancelled before any posting was collected.");
        }
    }
    if summary.cancelled() && summary.outcome() == RunOutcome::Results {
        let _ = writeln!(out, "  Run was cancelled; results are partial.");
    }
    if let Some((from, to)) = summary.date_range() {
        let _ = writeln!(out, "  posted between {from} and {to}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Sources");
    for report in summary.sources() {
        let _ = writeln!(out, "  {}", source_line(report));
    }

    if !summary.source_breakdown().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Postings by source");
        for (source, count) in summary.source_breakdown() {
            let _ = writeln!(out, "  {:<10} {count}", source.display_name());
        }
    }

    for (heading, table) in [
        ("Top skills", &run.trends.skills),
        ("Top titles", &run.trends.titles),
        ("Top locations", &run.trends.locations),
    ] {
        let _ = writeln!(out);
        render_table(&mut out, heading, table);
    }
    out
}

fn source_line(report: &SourceReport) -> String {
    let name = report.source.display_name();
    match report.status {
        SourceStatus::NotStarted => format!("{name:<10} not started"),
        SourceStatus::Failed => format!(
            "{name:<10} failed after {} page(s): {}",
            report.pages_requested,
            report.failure.as_deref().unwrap_or("unknown error")
        ),
        SourceStatus::Completed => format!(
            "{name:<10} pages {} (skipped {}) | fetched {} | admitted {} | duplicates {} | unusable {}",
            report.pages_requested,
            report.pages_skipped,
            report.fetched,
            report.admitted,
            report.duplicates_dropped,
            report.failed
        ),
    }
}

fn render_table(out: &mut String, heading: &str, table: &TrendTable) {
    let _ = writeln!(out, "{heading} ({} distinct)", table.distinct());
    if table.is_empty() {
        let _ = writeln!(out, "  (none)");
        return;
    }
    let width = table.values().map(|v| v.chars().count()).max().unwrap_or(0);
    for (rank, entry) in table.ranked().iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<width$}  {}",
            rank + 1,
            entry.value,
            entry.count
        );
    }
}
