//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use zipsift_core::ExtractionOutcome;
use zipsift_core::types::Entry;

pub struct JsonFormatter;

#[derive(Serialize)]
struct PlacedOutput {
    entry: String,
    path: String,
}

#[derive(Serialize)]
struct RejectedOutput {
    entry: String,
    extension: Option<String>,
    media_type: String,
}

#[derive(Serialize)]
struct FailedOutput {
    entry: String,
    stage: &'static str,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ExtractionOutput {
    planned: usize,
    staged: usize,
    placed: Vec<PlacedOutput>,
    rejected: Vec<RejectedOutput>,
    skipped: Vec<String>,
    failed: Vec<FailedOutput>,
    warnings: Vec<String>,
    duration_ms: u128,
}

#[derive(Serialize)]
struct EntryOutput<'a> {
    name: &'a str,
    directory: bool,
    size: u64,
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }

    fn extraction_output(outcome: &ExtractionOutcome) -> ExtractionOutput {
        ExtractionOutput {
            planned: outcome.planned,
            staged: outcome.staged,
            placed: outcome
                .results
                .iter()
                .filter(|r| r.accepted)
                .map(|r| PlacedOutput {
                    entry: r.entry.clone(),
                    path: r.final_path.display().to_string(),
                })
                .collect(),
            rejected: outcome
                .rejections
                .iter()
                .map(|r| RejectedOutput {
                    entry: r.entry.clone(),
                    extension: r.extension.clone(),
                    media_type: r.media_type.clone(),
                })
                .collect(),
            skipped: outcome.skipped.clone(),
            failed: outcome
                .failures
                .iter()
                .map(|f| FailedOutput {
                    entry: f.entry.clone(),
                    stage: f.stage.as_str(),
                    code: f.error.code(),
                    message: f.error.to_string(),
                })
                .collect(),
            warnings: outcome.warnings.clone(),
            duration_ms: outcome.duration.as_millis(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, outcome: &ExtractionOutcome) -> Result<()> {
        let output = JsonOutput::new(
            "extract",
            outcome.status().as_str(),
            Self::extraction_output(outcome),
        );
        Self::output(&output)
    }

    fn format_listing_short(&self, entries: &[&Entry]) -> Result<()> {
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        Self::output(&JsonOutput::new("list", "success", names))
    }

    fn format_listing_long(&self, entries: &[&Entry], _human_readable: bool) -> Result<()> {
        let data: Vec<EntryOutput<'_>> = entries
            .iter()
            .map(|e| EntryOutput {
                name: e.name(),
                directory: e.is_directory(),
                size: e.size(),
            })
            .collect();
        Self::output(&JsonOutput::new("list", "success", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::new(
            "warning",
            "success",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
