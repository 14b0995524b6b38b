//! Extraction run reporting.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::SiftError;

/// Pipeline stage an entry was in when something happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Selecting entries from the index.
    Planning,
    /// Extracting entries into the staging area.
    Staging,
    /// Sniffing staged files.
    Validation,
    /// Moving accepted files into the destination.
    Relocation,
}

impl Stage {
    /// Returns a lowercase stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Staging => "staging",
            Self::Validation => "validation",
            Self::Relocation => "relocation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-entry error that did not stop the run.
#[derive(Debug)]
pub struct EntryFailure {
    /// Archive entry name.
    pub entry: String,

    /// Stage the failure happened in.
    pub stage: Stage,

    /// The underlying error.
    pub error: SiftError,
}

impl EntryFailure {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(entry: impl Into<String>, stage: Stage, error: SiftError) -> Self {
        Self {
            entry: entry.into(),
            stage,
            error,
        }
    }
}

/// Outcome of relocating one staged entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationResult {
    /// Archive entry name.
    pub entry: String,

    /// Where the entry was staged.
    pub staged_path: PathBuf,

    /// Where the entry was (or would have been) placed.
    pub final_path: PathBuf,

    /// `true` if the entry now exists at `final_path`.
    pub accepted: bool,
}

/// A staged file whose sniffed content did not match its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Archive entry name.
    pub entry: String,

    /// Where the entry was staged.
    pub staged_path: PathBuf,

    /// Extension claimed by the file name.
    pub extension: Option<String>,

    /// Media type the content was sniffed as.
    pub media_type: String,
}

/// Overall classification of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// The selection matched no entry.
    NothingMatched,
    /// Entries were selected but none reached the destination.
    AllRejected,
    /// Some selected entries reached the destination.
    Partial,
    /// Every selected entry reached the destination.
    Complete,
    /// The run was cancelled before finishing.
    Cancelled,
}

impl OutcomeStatus {
    /// Returns a lowercase status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NothingMatched => "nothing-matched",
            Self::AllRejected => "all-rejected",
            Self::Partial => "partial",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Report of a staged extraction run.
///
/// Results are kept in extraction order. Per-entry problems never abort the
/// run; they are collected in `rejections` and `failures`.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// One result per entry that reached the relocation stage.
    pub results: Vec<RelocationResult>,

    /// Entries whose content did not match the registry.
    pub rejections: Vec<Rejection>,

    /// Entries that failed in some stage.
    pub failures: Vec<EntryFailure>,

    /// Entries left out because their target already existed.
    pub skipped: Vec<String>,

    /// Number of entries selected for extraction.
    pub planned: usize,

    /// Number of entries that reached the staging area.
    pub staged: usize,

    /// Wall-clock duration of the run.
    pub duration: Duration,

    /// Non-fatal problems, mostly from cleanup.
    pub warnings: Vec<String>,

    /// `true` if the run stopped early on request.
    pub cancelled: bool,
}

impl ExtractionOutcome {
    /// Creates a new empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Records a per-entry failure.
    pub fn add_failure(&mut self, entry: impl Into<String>, stage: Stage, error: SiftError) {
        self.failures.push(EntryFailure::new(entry, stage, error));
    }

    /// Returns the number of entries placed in the destination.
    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.results.iter().filter(|r| r.accepted).count()
    }

    /// Returns the final paths of every placed entry, in extraction order.
    #[must_use]
    pub fn accepted_paths(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter(|r| r.accepted)
            .map(|r| r.final_path.as_path())
            .collect()
    }

    /// Returns whether any entry failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Classifies the run.
    #[must_use]
    pub fn status(&self) -> OutcomeStatus {
        if self.cancelled {
            return OutcomeStatus::Cancelled;
        }
        if self.planned == 0 && self.failures.is_empty() {
            return OutcomeStatus::NothingMatched;
        }
        match self.accepted_count() {
            0 => OutcomeStatus::AllRejected,
            n if n == self.planned && self.failures.is_empty() => OutcomeStatus::Complete,
            _ => OutcomeStatus::Partial,
        }
    }
}

/// Callback trait for progress reporting during a run.
///
/// The trait requires `Send` to allow use in multi-threaded contexts.
///
/// # Examples
///
/// ```
/// use zipsift_core::ProgressCallback;
/// use zipsift_core::Stage;
///
/// struct SimpleProgress;
///
/// impl ProgressCallback for SimpleProgress {
///     fn on_stage_start(&mut self, stage: Stage, total: usize) {
///         println!("{stage}: {total} entries");
///     }
///
///     fn on_entry_start(&mut self, entry: &str, total: usize, current: usize) {
///         println!("Processing {current}/{total}: {entry}");
///     }
///
///     fn on_entry_complete(&mut self, entry: &str) {
///         println!("Completed: {entry}");
///     }
///
///     fn on_complete(&mut self) {
///         println!("Run complete");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called when a pipeline stage starts.
    fn on_stage_start(&mut self, stage: Stage, total: usize);

    /// Called when starting to process an entry.
    ///
    /// # Arguments
    ///
    /// * `entry` - Archive name of the entry
    /// * `total` - Number of entries in the current stage
    /// * `current` - Current entry number (1-indexed)
    fn on_entry_start(&mut self, entry: &str, total: usize, current: usize);

    /// Called when an entry has been processed by the current stage.
    fn on_entry_complete(&mut self, entry: &str);

    /// Called once the run has been finalized.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_stage_start(&mut self, _stage: Stage, _total: usize) {}

    fn on_entry_start(&mut self, _entry: &str, _total: usize, _current: usize) {}

    fn on_entry_complete(&mut self, _entry: &str) {}

    fn on_complete(&mut self) {}
}
