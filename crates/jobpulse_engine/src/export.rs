use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use jobpulse_core::{JobPosting, Source, TrendTable};
use serde_json::{json, Value};

use crate::persist::{OutputDir, PersistError};
use crate::pipeline::PipelineRun;

/// Column order of the CSV export.
pub const CSV_COLUMNS: [&str; 7] = [
    "title",
    "company",
    "location",
    "skills",
    "posted_date",
    "source_name",
    "source_url",
];

const SKILL_SEPARATOR: &str = "; ";

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub csv_filename: String,
    pub manifest_filename: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            csv_filename: "jobs.csv".to_string(),
            manifest_filename: Some("manifest.json".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub row_count: usize,
    pub csv_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("malformed csv at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// One CSV row read back from an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRow {
    pub title: String,
    pub company: String,
    pub location: String,
    pub skills: Vec<String>,
    pub posted_date: Option<NaiveDate>,
    pub source_name: String,
    pub source_url: String,
}

/// Write the result set as CSV plus an optional JSON manifest of the summary
/// and trend tables.
pub fn export_run(
    output_dir: &Path,
    run: &PipelineRun,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let dir = OutputDir::new(output_dir);
    let csv = render_csv(run.results.iter());
    let csv_path = dir.write_atomic(&options.csv_filename, csv.as_bytes())?;

    let manifest_path = match &options.manifest_filename {
        Some(name) => {
            let manifest = build_manifest(run, &options.csv_filename);
            let body = serde_json::to_string_pretty(&manifest)
                .unwrap_or_else(|_| manifest.to_string());
            Some(dir.write_atomic(name, body.as_bytes())?)
        }
        None => None,
    };

    Ok(ExportSummary {
        row_count: run.results.len(),
        csv_path,
        manifest_path,
    })
}

pub fn render_csv<'a>(postings: impl IntoIterator<Item = &'a JobPosting>) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_COLUMNS.iter().copied());
    for posting in postings {
        let skills = posting
            .skills()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(SKILL_SEPARATOR);
        let date = posting
            .posted_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        push_record(
            &mut out,
            [
                posting.title(),
                posting.company(),
                posting.location(),
                skills.as_str(),
                date.as_str(),
                posting.source().as_str(),
                posting.source_url(),
            ],
        );
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

/// Read a CSV file written by [`export_run`].
pub fn read_csv(path: &Path) -> Result<Vec<ExportedRow>, ExportError> {
    let content = fs::read_to_string(path)?;
    parse_csv(&content)
}

pub fn parse_csv(content: &str) -> Result<Vec<ExportedRow>, ExportError> {
    let records = split_records(content)?;
    let mut records = records.into_iter();
    match records.next() {
        Some((_, header)) if header == CSV_COLUMNS => {}
        Some((line, _)) => {
            return Err(ExportError::Malformed {
                line,
                reason: "unexpected header".to_string(),
            })
        }
        None => return Ok(Vec::new()),
    }

    records
        .map(|(line, mut fields)| {
            if fields.len() != CSV_COLUMNS.len() {
                return Err(ExportError::Malformed {
                    line,
                    reason: format!("expected {} fields, found {}", CSV_COLUMNS.len(), fields.len()),
                });
            }
            let source_url = fields.pop().unwrap_or_default();
            let source_name = fields.pop().unwrap_or_default();
            let date = fields.pop().unwrap_or_default();
            let skills = fields.pop().unwrap_or_default();
            let location = fields.pop().unwrap_or_default();
            let company = fields.pop().unwrap_or_default();
            let title = fields.pop().unwrap_or_default();

            let posted_date = if date.is_empty() {
                None
            } else {
                Some(NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                    ExportError::Malformed {
                        line,
                        reason: format!("bad posted_date {date:?}: {e}"),
                    }
                })?)
            };
            let skills = skills
                .split(SKILL_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();

            Ok(ExportedRow {
                title,
                company,
                location,
                skills,
                posted_date,
                source_name,
                source_url,
            })
        })
        .collect()
}

/// Split RFC 4180 text into records, each tagged with its starting line.
fn split_records(content: &str) -> Result<Vec<(usize, Vec<String>)>, ExportError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push((record_line, std::mem::take(&mut fields)));
                line += 1;
                record_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(ExportError::Malformed {
            line: record_line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }
    Ok(records)
}

fn build_manifest(run: &PipelineRun, csv_filename: &str) -> Value {
    let summary = &run.summary;
    json!({
        "csv": csv_filename,
        "outcome": summary.outcome().as_str(),
        "result_count": summary.result_count(),
        "fetched": summary.fetched(),
        "extracted": summary.extracted(),
        "duplicates_dropped": summary.duplicates_dropped(),
        "failed": summary.failed(),
        "pages_skipped": summary.pages_skipped(),
        "elapsed_secs": summary.elapsed().as_secs_f64(),
        "cancelled": summary.cancelled(),
        "failures": summary.failures().iter().map(|f| {
            json!({ "source": f.source.as_str(), "reason": f.reason })
        }).collect::<Vec<_>>(),
        "source_breakdown": summary
            .source_breakdown()
            .iter()
            .map(|(source, count)| (source.as_str().to_string(), json!(count)))
            .collect::<serde_json::Map<_, _>>(),
        "date_range": summary.date_range().map(|(from, to)| {
            json!({ "from": from.to_string(), "to": to.to_string() })
        }),
        "trends": {
            "skills": table_json(&run.trends.skills),
            "titles": table_json(&run.trends.titles),
            "locations": table_json(&run.trends.locations),
        },
        "sources": Source::ALL.iter().filter_map(|source| {
            summary.sources().iter().find(|r| r.source == *source)
        }).map(|r| {
            json!({
                "source": r.source.as_str(),
                "pages_requested": r.pages_requested,
                "pages_skipped": r.pages_skipped,
                "fetched": r.fetched,
                "extracted": r.extracted,
                "admitted": r.admitted,
                "duplicates_dropped": r.duplicates_dropped,
                "failed": r.failed,
            })
        }).collect::<Vec<_>>(),
    })
}

fn table_json(table: &TrendTable) -> Value {
    Value::Array(
        table
            .ranked()
            .iter()
            .map(|entry| json!({ "value": entry.value, "count": entry.count }))
            .collect(),
    )
}
