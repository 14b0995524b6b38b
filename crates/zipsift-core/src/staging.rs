//! Private staging area for extracted entries.
//!
//! Entries are never written to the destination directly: they are first
//! materialized here, sniffed, and only then relocated. The staging area is
//! created on first use and removed by the run's finalizer, never by `Drop`.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::Result;
use crate::SiftError;
use crate::archive::ArchiveReader;
use crate::report::EntryFailure;
use crate::report::ProgressCallback;
use crate::report::Stage;
use crate::run::CancelFlag;
use crate::types::SafeEntryName;

const STAGING_PREFIX: &str = ".zipsift-";

/// An entry that was materialized in the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    /// Archive entry name.
    pub name: SafeEntryName,

    /// Location inside the staging area.
    pub path: PathBuf,

    /// `true` for directory entries.
    pub is_dir: bool,
}

impl StagedEntry {
    /// Returns the lower-cased extension of the staged file name.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        if self.is_dir {
            return None;
        }
        crate::types::entry::extension(self.name.basename())
    }
}

/// Result of staging a plan.
#[derive(Debug, Default)]
pub struct StagingOutcome {
    /// Successfully staged entries, in plan order.
    pub staged: Vec<StagedEntry>,

    /// Entries the reader failed to extract.
    pub failures: Vec<EntryFailure>,

    /// `true` if staging stopped because of cancellation.
    pub cancelled: bool,
}

/// Where a staging area comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    /// Caller-supplied directory.
    Configured(PathBuf),
    /// Fresh private directory created inside this parent.
    Private(PathBuf),
}

/// Lazily created staging directory.
///
/// # Examples
///
/// ```
/// use zipsift_core::StagingArea;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let base = tempfile::tempdir()?;
/// let mut staging = StagingArea::private_in(base.path());
/// assert!(staging.path().is_none());
///
/// let root = staging.ensure()?.to_path_buf();
/// assert!(root.is_dir());
///
/// staging.remove()?;
/// assert!(!root.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StagingArea {
    origin: Origin,
    root: Option<PathBuf>,
}

impl StagingArea {
    /// Stages into `dir`.
    ///
    /// A missing `dir` is created and owned by the area. An existing one may
    /// hold unrelated files, so a private child directory is created inside
    /// it instead and only that child is ever removed.
    #[must_use]
    pub fn configured(dir: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Configured(dir.into()),
            root: None,
        }
    }

    /// Creates a private temporary directory inside `parent` on first use.
    #[must_use]
    pub fn private_in(parent: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Private(parent.into()),
            root: None,
        }
    }

    /// Returns the staging root once it has been created.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Creates the staging directory if it does not exist yet and returns it.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` if the directory cannot be created.
    pub fn ensure(&mut self) -> Result<&Path> {
        if self.root.is_none() {
            let root = match &self.origin {
                Origin::Configured(dir) if dir.exists() => private_dir(dir)?,
                Origin::Configured(dir) => {
                    fs::create_dir_all(dir).map_err(|e| {
                        SiftError::configuration(format!(
                            "cannot create staging directory {}: {e}",
                            dir.display()
                        ))
                    })?;
                    dir.clone()
                }
                Origin::Private(parent) => {
                    fs::create_dir_all(parent).map_err(|e| {
                        SiftError::configuration(format!(
                            "cannot create staging parent {}: {e}",
                            parent.display()
                        ))
                    })?;
                    private_dir(parent)?
                }
            };
            log::debug!("staging area ready at {}", root.display());
            self.root = Some(root);
        }

        self.root
            .as_deref()
            .ok_or_else(|| SiftError::configuration("staging directory unavailable"))
    }

    /// Extracts every name of the plan into the staging area.
    ///
    /// A failing entry is recorded and skipped; its siblings stay staged.
    ///
    /// # Errors
    ///
    /// Returns an error only if the staging directory itself cannot be
    /// created.
    pub fn extract<R: ArchiveReader + ?Sized>(
        &mut self,
        reader: &mut R,
        names: &[SafeEntryName],
        cancel: &CancelFlag,
        progress: &mut dyn ProgressCallback,
    ) -> Result<StagingOutcome> {
        let mut outcome = StagingOutcome::default();
        if names.is_empty() {
            return Ok(outcome);
        }

        let root = self.ensure()?.to_path_buf();
        progress.on_stage_start(Stage::Staging, names.len());

        for (i, name) in names.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            progress.on_entry_start(name.as_str(), names.len(), i + 1);

            match reader.extract_entry(name, &root) {
                Ok(path) => {
                    let is_dir = path.is_dir();
                    outcome.staged.push(StagedEntry {
                        name: name.clone(),
                        path,
                        is_dir,
                    });
                }
                Err(err) => {
                    log::warn!("failed to stage {name}: {err}");
                    outcome
                        .failures
                        .push(EntryFailure::new(name.as_str(), Stage::Staging, err));
                }
            }
            progress.on_entry_complete(name.as_str());
        }

        Ok(outcome)
    }

    /// Recursively deletes the staging area, children before parents.
    ///
    /// Nothing happens if the area was never created. Deletion continues
    /// past individual failures; the first one is returned.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error met while deleting.
    pub fn remove(&mut self) -> Result<()> {
        let Some(root) = self.root.take() else {
            return Ok(());
        };
        remove_tree(&root)?;
        log::debug!("removed staging area {}", root.display());
        Ok(())
    }
}

/// Creates a uniquely named directory in `parent` that outlives the handle.
fn private_dir(parent: &Path) -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| {
            SiftError::configuration(format!(
                "cannot create staging directory in {}: {e}",
                parent.display()
            ))
        })?;
    Ok(dir.keep())
}

/// Deletes `root` and everything below it without recursion.
pub(crate) fn remove_tree(root: &Path) -> Result<()> {
    let mut first_error = None;

    for entry in WalkDir::new(root).contents_first(true) {
        let result = match entry {
            Ok(entry) if entry.file_type().is_dir() => fs::remove_dir(entry.path()),
            Ok(entry) => fs::remove_file(entry.path()),
            Err(err) => Err(std::io::Error::other(err)),
        };
        if let Err(err) = result {
            log::warn!("cleanup of {} incomplete: {err}", root.display());
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(SiftError::Io(err)),
        None => Ok(()),
    }
}
