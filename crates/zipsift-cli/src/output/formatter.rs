//! Output formatter trait for CLI results.

use anyhow::Result;
use serde::Serialize;
use zipsift_core::ExtractionOutcome;
use zipsift_core::types::Entry;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the outcome of an extraction run
    fn format_extraction_result(&self, outcome: &ExtractionOutcome) -> Result<()>;

    /// Format entry names, one per line
    fn format_listing_short(&self, entries: &[&Entry]) -> Result<()>;

    /// Format entries with type and size
    fn format_listing_long(&self, entries: &[&Entry], human_readable: bool) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn new(operation: impl Into<String>, status: &'static str, data: T) -> Self {
        Self {
            operation: operation.into(),
            status,
            data,
        }
    }
}
