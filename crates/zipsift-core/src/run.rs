//! Staged extraction run: plan, stage, validate, relocate, finalize.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::ExtractConfig;
use crate::MediaTypeRegistry;
use crate::Result;
use crate::SiftError;
use crate::archive::ArchiveReader;
use crate::archive::ZipReader;
use crate::gate::ValidationGate;
use crate::gate::Verdict;
use crate::index::ArchiveIndex;
use crate::plan::SelectionPlanner;
use crate::plan::SelectionSpec;
use crate::relocate::Relocator;
use crate::relocate::Transfer;
use crate::report::ExtractionOutcome;
use crate::report::ProgressCallback;
use crate::report::Rejection;
use crate::report::Stage;
use crate::sniff::ContentSniffer;
use crate::sniff::MagicSniffer;
use crate::staging::StagingArea;
use crate::types::DestDir;

static DEFAULT_SNIFFER: MagicSniffer = MagicSniffer::new();

/// Shared cancellation flag, checked between entries in every stage.
///
/// Clones share the same flag, so one clone can be handed to a signal
/// handler while the run holds another.
///
/// # Examples
///
/// ```
/// use zipsift_core::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let handle = flag.clone();
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lifecycle of an [`ExtractionRun`].
///
/// A run moves forward only. `Closed` is reached on every exit path, after
/// the archive has been closed and cleanup has been attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
    /// Not started.
    Idle,
    /// Archive open, index loaded.
    Opened,
    /// Entries selected.
    Planned,
    /// Entries extracted into the staging area.
    Staged,
    /// Staged files sniffed.
    Validated,
    /// Accepted files placed in the destination.
    Relocated,
    /// Archive closed and cleanup attempted.
    Closed,
}

impl RunState {
    /// Returns a lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Opened => "opened",
            Self::Planned => "planned",
            Self::Staged => "staged",
            Self::Validated => "validated",
            Self::Relocated => "relocated",
            Self::Closed => "closed",
        }
    }
}

/// One staged extraction of one archive.
///
/// The registry is borrowed for the whole run and never modified. A run can
/// be executed once.
///
/// # Examples
///
/// ```no_run
/// use zipsift_core::ExtractConfig;
/// use zipsift_core::ExtractionRun;
/// use zipsift_core::MediaTypeRegistry;
/// use zipsift_core::NoopProgress;
/// use zipsift_core::SelectionSpec;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let mut registry = MediaTypeRegistry::new();
/// registry.register("jpg", ["image/jpeg"])?;
///
/// let config = ExtractConfig::default().with_destination("/srv/images");
/// let mut run = ExtractionRun::new(config, &registry);
/// let outcome = run.execute_path("upload.zip", &SelectionSpec::ByExtension, &mut NoopProgress)?;
///
/// for path in outcome.accepted_paths() {
///     println!("{}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ExtractionRun<'a> {
    config: ExtractConfig,
    registry: &'a MediaTypeRegistry,
    sniffer: &'a dyn ContentSniffer,
    cancel: CancelFlag,
    state: RunState,
}

impl<'a> ExtractionRun<'a> {
    /// Creates a run using the built-in content sniffer.
    #[must_use]
    pub fn new(config: ExtractConfig, registry: &'a MediaTypeRegistry) -> Self {
        Self {
            config,
            registry,
            sniffer: &DEFAULT_SNIFFER,
            cancel: CancelFlag::new(),
            state: RunState::Idle,
        }
    }

    /// Replaces the content sniffer.
    #[must_use]
    pub fn with_sniffer(mut self, sniffer: &'a dyn ContentSniffer) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Uses an externally owned cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns a handle that cancels this run.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Returns the run configuration.
    #[must_use]
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Opens the ZIP archive at `archive` (resolved against the base path)
    /// and executes the run.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` before anything is touched if the
    /// configuration or destination is unusable, and `SiftError::ArchiveOpen`
    /// if the archive cannot be opened. Per-entry problems are reported in
    /// the outcome instead.
    pub fn execute_path(
        &mut self,
        archive: impl AsRef<Path>,
        spec: &SelectionSpec,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionOutcome> {
        let archive = self.config.resolve(archive.as_ref());
        let dest = self.prepare(Some(&archive))?;

        let mut reader = match ZipReader::open(&archive) {
            Ok(reader) => reader,
            Err(err) => {
                let mut outcome = ExtractionOutcome::new();
                self.remove_archive(&archive, &mut outcome);
                self.transition(RunState::Closed);
                return Err(err);
            }
        };

        self.run(&mut reader, &dest, Some(&archive), spec, progress)
    }

    /// Executes the run against an already opened reader.
    ///
    /// The reader is closed before this returns. The archive file itself is
    /// never deleted by this method since its path is unknown.
    ///
    /// # Errors
    ///
    /// Same as [`execute_path`](Self::execute_path), minus archive opening.
    pub fn execute<R: ArchiveReader + ?Sized>(
        &mut self,
        reader: &mut R,
        spec: &SelectionSpec,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionOutcome> {
        let dest = match self.prepare(None) {
            Ok(dest) => dest,
            Err(err) => {
                if let Err(close) = reader.close() {
                    log::warn!("failed to close archive: {close}");
                }
                self.transition(RunState::Closed);
                return Err(err);
            }
        };
        self.run(reader, &dest, None, spec, progress)
    }

    /// Validates the configuration and establishes the destination.
    fn prepare(&self, archive: Option<&Path>) -> Result<DestDir> {
        if self.state != RunState::Idle {
            return Err(SiftError::configuration(format!(
                "run already {}",
                self.state.as_str()
            )));
        }
        self.config.validate()?;

        let destination = self
            .config
            .destination
            .as_deref()
            .ok_or_else(|| SiftError::configuration("no destination directory set"))?;
        let dest = DestDir::create(self.config.resolve(destination), self.config.dir_mode)?;

        if let Some(staging) = &self.config.staging_dir {
            let staging = self.config.resolve(staging);
            let staging = staging.canonicalize().unwrap_or(staging);
            if self.config.remove_staging && dest.as_path().starts_with(&staging) {
                return Err(SiftError::configuration(format!(
                    "destination {} lies inside the staging directory {} that is removed after the run",
                    dest.as_path().display(),
                    staging.display()
                )));
            }
            if let Some(archive) = archive {
                let archive = archive
                    .canonicalize()
                    .unwrap_or_else(|_| archive.to_path_buf());
                if archive.starts_with(&staging) {
                    return Err(SiftError::configuration(format!(
                        "archive {} lies inside the staging directory {}",
                        archive.display(),
                        staging.display()
                    )));
                }
            }
        }

        Ok(dest)
    }

    fn run<R: ArchiveReader + ?Sized>(
        &mut self,
        reader: &mut R,
        dest: &DestDir,
        archive: Option<&Path>,
        spec: &SelectionSpec,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionOutcome> {
        let started = Instant::now();
        let mut outcome = ExtractionOutcome::new();
        let mut staging = match &self.config.staging_dir {
            Some(dir) => StagingArea::configured(self.config.resolve(dir)),
            None => StagingArea::private_in(&self.config.base_path),
        };

        self.transition(RunState::Opened);
        let result = self.pipeline(reader, dest, spec, &mut staging, &mut outcome, progress);
        if let Err(err) = &result {
            log::warn!("run aborted in state {}: {err}", self.state.as_str());
        }

        self.finalize(reader, &mut staging, archive, &mut outcome);
        outcome.duration = started.elapsed();
        progress.on_complete();

        result.map(|()| outcome)
    }

    fn pipeline<R: ArchiveReader + ?Sized>(
        &mut self,
        reader: &mut R,
        dest: &DestDir,
        spec: &SelectionSpec,
        staging: &mut StagingArea,
        outcome: &mut ExtractionOutcome,
        progress: &mut dyn ProgressCallback,
    ) -> Result<()> {
        let gate = ValidationGate::new(self.registry, self.sniffer)?
            .with_workers(self.config.validation_workers);
        let index = ArchiveIndex::load(reader)?.with_strategy(self.config.scan);

        let plan = SelectionPlanner::new(&index, self.registry)
            .keep_empty_directories(self.config.keep_empty_directories)
            .plan(spec);
        outcome.planned = plan.len();
        outcome.failures.extend(plan.rejected);
        self.transition(RunState::Planned);
        if plan.names.is_empty() {
            return Ok(());
        }

        let staged = staging.extract(reader, &plan.names, &self.cancel, progress)?;
        outcome.staged = staged.staged.len();
        outcome.failures.extend(staged.failures);
        self.transition(RunState::Staged);
        if staged.cancelled {
            outcome.cancelled = true;
            return Ok(());
        }

        progress.on_stage_start(Stage::Validation, staged.staged.len());
        let verdicts = gate.check_all(&staged.staged, &self.cancel)?;
        let mut accepted = Vec::with_capacity(staged.staged.len());
        for (entry, verdict) in staged.staged.into_iter().zip(verdicts) {
            progress.on_entry_complete(entry.name.as_str());
            match verdict {
                Verdict::Accepted { .. } => accepted.push(entry),
                Verdict::Rejected { media_type } => outcome.rejections.push(Rejection {
                    entry: entry.name.to_string(),
                    extension: entry.extension(),
                    staged_path: entry.path,
                    media_type,
                }),
                Verdict::Failed(err) => {
                    log::warn!("cannot validate {}: {err}", entry.name);
                    outcome.add_failure(entry.name.as_str(), Stage::Validation, err);
                }
                Verdict::Cancelled => outcome.cancelled = true,
            }
        }
        self.transition(RunState::Validated);
        if outcome.cancelled {
            return Ok(());
        }

        let transfer = if self.config.remove_staging {
            Transfer::Move
        } else {
            Transfer::Copy
        };
        let batch = Relocator::new(dest, &self.config.placement)
            .with_dir_mode(self.config.dir_mode)
            .with_transfer(transfer)
            .relocate(&accepted, &self.cancel, progress);
        outcome.results = batch.results;
        outcome.skipped = batch.skipped;
        outcome.failures.extend(batch.failures);
        outcome.cancelled |= batch.cancelled;
        self.transition(RunState::Relocated);

        Ok(())
    }

    /// Closes the archive and removes temporary state. Never fails: problems
    /// become warnings on the outcome.
    fn finalize<R: ArchiveReader + ?Sized>(
        &mut self,
        reader: &mut R,
        staging: &mut StagingArea,
        archive: Option<&Path>,
        outcome: &mut ExtractionOutcome,
    ) {
        if let Err(err) = reader.close() {
            log::warn!("failed to close archive: {err}");
            outcome.add_warning(format!("failed to close archive: {err}"));
        }

        if self.config.remove_staging {
            let root = staging.path().map(Path::to_path_buf);
            if let Err(err) = staging.remove() {
                let root = root.unwrap_or_default();
                outcome.add_warning(format!(
                    "failed to remove staging directory {}: {err}",
                    root.display()
                ));
            }
        } else if let Some(root) = staging.path() {
            log::info!("staged files kept in {}", root.display());
        }

        if let Some(archive) = archive {
            self.remove_archive(archive, outcome);
        }

        self.transition(RunState::Closed);
    }

    fn remove_archive(&self, archive: &Path, outcome: &mut ExtractionOutcome) {
        if !self.config.remove_archive {
            return;
        }
        match fs::remove_file(archive) {
            Ok(()) => log::debug!("removed archive {}", archive.display()),
            Err(err) => {
                log::warn!("failed to remove archive {}: {err}", archive.display());
                outcome.add_warning(format!(
                    "failed to remove archive {}: {err}",
                    archive.display()
                ));
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("run state {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
    }
}

impl std::fmt::Debug for ExtractionRun<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRun")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
