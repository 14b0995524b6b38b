//! High-level public API for staged extraction.

use std::path::Path;
use std::path::PathBuf;

use crate::CancelFlag;
use crate::ExtractConfig;
use crate::ExtractionOutcome;
use crate::ExtractionRun;
use crate::MediaTypeRegistry;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::SelectionSpec;
use crate::SiftError;
use crate::sniff::ContentSniffer;

/// Extracts the entries of a ZIP archive selected by `spec` into
/// `destination`, keeping only files whose content matches `registry`.
///
/// Uses default settings otherwise: structure preserved, existing files
/// skipped, private staging directory next to the archive removed
/// afterwards.
///
/// # Arguments
///
/// * `archive_path` - Path to the ZIP archive
/// * `destination` - Directory that receives accepted files (created if
///   absent)
/// * `registry` - Accepted media types per extension
/// * `spec` - Which entries to extract
///
/// # Errors
///
/// Returns an error if:
/// - The destination cannot be created or is not writable
/// - The archive cannot be opened
/// - The registry's signature database is malformed
///
/// Per-entry problems are reported in the returned outcome.
///
/// # Examples
///
/// ```no_run
/// use zipsift_core::MediaTypeRegistry;
/// use zipsift_core::SelectionSpec;
/// use zipsift_core::extract_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = MediaTypeRegistry::new();
/// registry.register("pdf", ["application/pdf"])?;
///
/// let outcome = extract_archive("upload.zip", "/srv/docs", &registry, &SelectionSpec::ByExtension)?;
/// println!("Placed {} files", outcome.accepted_count());
/// # Ok(())
/// # }
/// ```
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    destination: Q,
    registry: &MediaTypeRegistry,
    spec: &SelectionSpec,
) -> Result<ExtractionOutcome> {
    let archive = std::path::absolute(archive_path.as_ref())?;
    let destination = std::path::absolute(destination.as_ref())?;
    // The private staging directory lives next to the archive.
    let base = archive
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let config = ExtractConfig::default()
        .with_base_path(base)
        .with_destination(destination);
    ExtractionRun::new(config, registry).execute_path(&archive, spec, &mut NoopProgress)
}

/// Builder for configuring a staged extraction.
///
/// # Examples
///
/// ```no_run
/// use zipsift_core::ExtractionBuilder;
/// use zipsift_core::MediaTypeRegistry;
/// use zipsift_core::NameCollision;
/// use zipsift_core::SelectionSpec;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = MediaTypeRegistry::new();
/// registry.register("jpg", ["image/jpeg"])?;
///
/// let outcome = ExtractionBuilder::new()
///     .archive("upload.zip")
///     .destination("/srv/images")
///     .registry(registry)
///     .selection(SelectionSpec::prefixes(["photos"]))
///     .collision(NameCollision::Overwrite)
///     .extract()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ExtractionBuilder<'a> {
    archive_path: Option<PathBuf>,
    config: ExtractConfig,
    registry: MediaTypeRegistry,
    selection: Option<SelectionSpec>,
    sniffer: Option<&'a dyn ContentSniffer>,
    cancel: Option<CancelFlag>,
    progress: Option<&'a mut dyn ProgressCallback>,
}

impl<'a> ExtractionBuilder<'a> {
    /// Creates a new `ExtractionBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the archive file path.
    #[must_use]
    pub fn archive<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.archive_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the destination directory.
    #[must_use]
    pub fn destination<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.destination = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replaces the whole configuration. The destination set by
    /// [`destination`](Self::destination) is kept if `config` has none.
    #[must_use]
    pub fn config(mut self, config: ExtractConfig) -> Self {
        let destination = self.config.destination.take();
        self.config = config;
        if self.config.destination.is_none() {
            self.config.destination = destination;
        }
        self
    }

    /// Sets the media-type registry.
    #[must_use]
    pub fn registry(mut self, registry: MediaTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the selection. Defaults to [`SelectionSpec::ByExtension`].
    #[must_use]
    pub fn selection(mut self, spec: SelectionSpec) -> Self {
        self.selection = Some(spec);
        self
    }

    /// Sets the collision policy.
    #[must_use]
    pub fn collision(mut self, collision: crate::NameCollision) -> Self {
        self.config = self.config.with_collision(collision);
        self
    }

    /// Preserves or flattens the directory structure.
    #[must_use]
    pub fn preserve_structure(mut self, preserve: bool) -> Self {
        self.config = self.config.with_preserve_structure(preserve);
        self
    }

    /// Replaces the content sniffer.
    #[must_use]
    pub fn sniffer(mut self, sniffer: &'a dyn ContentSniffer) -> Self {
        self.sniffer = Some(sniffer);
        self
    }

    /// Uses an externally owned cancellation flag.
    #[must_use]
    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Reports progress to `progress`.
    #[must_use]
    pub fn progress(mut self, progress: &'a mut dyn ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Executes the extraction with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` if the archive or destination is
    /// not set, or any error [`ExtractionRun::execute_path`] returns.
    pub fn extract(self) -> Result<ExtractionOutcome> {
        let archive_path = self
            .archive_path
            .ok_or_else(|| SiftError::configuration("archive path not set"))?;
        if self.config.destination.is_none() {
            return Err(SiftError::configuration("destination not set"));
        }

        let spec = self.selection.unwrap_or(SelectionSpec::ByExtension);
        let mut run = ExtractionRun::new(self.config, &self.registry);
        if let Some(sniffer) = self.sniffer {
            run = run.with_sniffer(sniffer);
        }
        if let Some(cancel) = self.cancel {
            run = run.with_cancel_flag(cancel);
        }

        let mut noop = NoopProgress;
        let progress: &mut dyn ProgressCallback = match self.progress {
            Some(progress) => progress,
            None => &mut noop,
        };
        run.execute_path(archive_path, &spec, progress)
    }
}

impl std::fmt::Debug for ExtractionBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionBuilder")
            .field("archive_path", &self.archive_path)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}
