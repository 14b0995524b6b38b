//! Placement of accepted files into the destination directory.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::Result;
use crate::SiftError;
use crate::config::NameCollision;
use crate::config::PlacementPolicy;
use crate::config::SuffixValue;
use crate::report::EntryFailure;
use crate::report::ProgressCallback;
use crate::report::RelocationResult;
use crate::report::Stage;
use crate::run::CancelFlag;
use crate::staging::StagedEntry;
use crate::types::DestDir;
use crate::types::SafeEntryName;
use crate::types::dest_dir::create_dir_all_with_mode;
use crate::types::dest_dir::is_writable;

/// How staged bytes reach the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Rename, falling back to copy and delete across filesystems.
    Move,
    /// Copy, leaving the staged file in place.
    Copy,
}

/// Results of relocating a batch.
#[derive(Debug, Default)]
pub struct RelocationBatch {
    /// One result per processed entry, in input order.
    pub results: Vec<RelocationResult>,

    /// Entries left out because their target already existed.
    pub skipped: Vec<String>,

    /// Entries whose transfer failed.
    pub failures: Vec<EntryFailure>,

    /// `true` if the batch stopped because of cancellation.
    pub cancelled: bool,
}

/// Strictly increasing microsecond clock for suffix tokens.
#[derive(Debug, Default)]
struct SuffixClock {
    last: u128,
}

impl SuffixClock {
    fn next(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_micros());
        let micros = now.max(self.last + 1);
        self.last = micros;
        format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
    }
}

/// Moves accepted staged entries into a destination.
///
/// # Examples
///
/// ```
/// use zipsift_core::PlacementPolicy;
/// use zipsift_core::Relocator;
/// use zipsift_core::types::DestDir;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let dir = tempfile::tempdir()?;
/// let dest = DestDir::new(dir.path())?;
/// let policy = PlacementPolicy {
///     preserve_structure: false,
///     ..Default::default()
/// };
/// let relocator = Relocator::new(&dest, &policy);
///
/// let name = zipsift_core::types::SafeEntryName::validate("img/cat.jpg")?;
/// assert_eq!(relocator.target_dir(&name), dest.as_path());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Relocator<'a> {
    dest: &'a DestDir,
    policy: &'a PlacementPolicy,
    dir_mode: u32,
    transfer: Transfer,
    clock: SuffixClock,
}

impl<'a> Relocator<'a> {
    /// Creates a relocator that copies files with `0o755` directories.
    #[must_use]
    pub fn new(dest: &'a DestDir, policy: &'a PlacementPolicy) -> Self {
        Self {
            dest,
            policy,
            dir_mode: 0o755,
            transfer: Transfer::Copy,
            clock: SuffixClock::default(),
        }
    }

    /// Sets the mode for directories created in the destination.
    #[must_use]
    pub const fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets the transfer method.
    #[must_use]
    pub const fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = transfer;
        self
    }

    /// Returns the directory a file entry named `name` is placed in.
    #[must_use]
    pub fn target_dir(&self, name: &SafeEntryName) -> PathBuf {
        if !self.policy.preserve_structure {
            return self.dest.as_path().to_path_buf();
        }
        match name.relative_path().parent() {
            Some(parent) => self.dest.join(parent),
            None => self.dest.as_path().to_path_buf(),
        }
    }

    /// Relocates each staged entry in order.
    ///
    /// A failing entry is recorded and the batch continues.
    pub fn relocate(
        &mut self,
        accepted: &[StagedEntry],
        cancel: &CancelFlag,
        progress: &mut dyn ProgressCallback,
    ) -> RelocationBatch {
        let mut batch = RelocationBatch::default();
        progress.on_stage_start(Stage::Relocation, accepted.len());

        for (i, staged) in accepted.iter().enumerate() {
            if cancel.is_cancelled() {
                batch.cancelled = true;
                break;
            }
            progress.on_entry_start(staged.name.as_str(), accepted.len(), i + 1);
            self.relocate_one(staged, &mut batch);
            progress.on_entry_complete(staged.name.as_str());
        }

        batch
    }

    fn relocate_one(&mut self, staged: &StagedEntry, batch: &mut RelocationBatch) {
        let entry = staged.name.as_str().to_string();
        let target = self.target_path(staged);

        let mut result = RelocationResult {
            entry: entry.clone(),
            staged_path: staged.path.clone(),
            final_path: target.clone(),
            accepted: false,
        };

        let placed = if staged.is_dir {
            self.place_directory(&target)
        } else {
            match self.place_file(&staged.path, &target) {
                Ok(false) => {
                    log::debug!("skipping {entry}: {} exists", target.display());
                    batch.skipped.push(entry);
                    batch.results.push(result);
                    return;
                }
                other => other.map(|_| ()),
            }
        };

        match placed {
            Ok(()) => {
                result.accepted = true;
                log::trace!("placed {entry} at {}", target.display());
            }
            Err(err) => {
                log::warn!("failed to relocate {entry}: {err}");
                batch
                    .failures
                    .push(EntryFailure::new(entry, Stage::Relocation, err));
            }
        }
        batch.results.push(result);
    }

    fn target_path(&mut self, staged: &StagedEntry) -> PathBuf {
        let dir = self.target_dir(&staged.name);
        let name = staged.name.basename();

        if staged.is_dir {
            return if self.policy.preserve_structure {
                self.dest.join(staged.name.relative_path())
            } else {
                dir.join(name)
            };
        }

        if self.policy.collision != NameCollision::Suffix {
            return dir.join(name);
        }

        let token = match &self.policy.suffix_value {
            SuffixValue::Fixed(value) => value.clone(),
            SuffixValue::Timestamp => self.clock.next(),
        };
        let (stem, ext) = split_name(name);
        let separator = &self.policy.separator;

        let candidate = dir.join(join_name(&format!("{stem}{separator}{token}"), ext));
        if !candidate.exists() {
            return candidate;
        }
        (1u64..)
            .map(|n| dir.join(join_name(&format!("{stem}{separator}{token}-{n}"), ext)))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }

    fn place_directory(&self, target: &Path) -> Result<()> {
        if target.is_dir() {
            return Ok(());
        }
        create_dir_all_with_mode(target, self.dir_mode).map_err(|e| relocation_error(target, e))
    }

    /// Returns `Ok(false)` when the file was skipped.
    fn place_file(&self, staged: &Path, target: &Path) -> Result<bool> {
        if let Some(parent) = target.parent() {
            create_dir_all_with_mode(parent, self.dir_mode)
                .map_err(|e| relocation_error(target, e))?;
        }

        if target.exists() || target.is_symlink() {
            if target.is_dir() {
                return Err(relocation_error(target, "a directory is in the way"));
            }
            match self.policy.collision {
                NameCollision::Skip => return Ok(false),
                NameCollision::Overwrite if !is_writable(target) => {
                    return Err(relocation_error(target, "existing file is not writable"));
                }
                NameCollision::Overwrite => {}
                // Suffixed targets were free a moment ago.
                NameCollision::Suffix => {
                    return Err(relocation_error(target, "target appeared concurrently"));
                }
            }
        }

        match self.transfer {
            Transfer::Copy => {
                fs::copy(staged, target).map_err(|e| relocation_error(target, e))?;
            }
            Transfer::Move => move_file(staged, target)?,
        }
        Ok(true)
    }
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| relocation_error(to, e))?;
    if let Err(e) = fs::remove_file(from) {
        log::warn!("moved {} but could not remove it: {e}", from.display());
    }
    Ok(())
}

fn relocation_error(path: &Path, reason: impl ToString) -> SiftError {
    SiftError::Relocation {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Splits a file name into stem and extension, keeping dot files whole.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn join_name(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::NoopProgress;
    use tempfile::TempDir;

    struct Fixture {
        _stage: TempDir,
        _out: TempDir,
        stage: PathBuf,
        dest: DestDir,
    }

    impl Fixture {
        fn new() -> Self {
            let stage = TempDir::new().unwrap();
            let out = TempDir::new().unwrap();
            Self {
                stage: stage.path().to_path_buf(),
                dest: DestDir::new(out.path()).unwrap(),
                _stage: stage,
                _out: out,
            }
        }

        fn file(&self, name: &str, data: &[u8]) -> StagedEntry {
            let path = self.stage.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, data).unwrap();
            StagedEntry {
                name: SafeEntryName::validate(name).unwrap(),
                path,
                is_dir: false,
            }
        }

        fn dir(&self, name: &str) -> StagedEntry {
            let path = self.stage.join(name);
            fs::create_dir_all(&path).unwrap();
            StagedEntry {
                name: SafeEntryName::validate(name).unwrap(),
                path,
                is_dir: true,
            }
        }
    }

    fn policy(preserve_structure: bool, collision: NameCollision) -> PlacementPolicy {
        PlacementPolicy {
            preserve_structure,
            collision,
            ..Default::default()
        }
    }

    fn run(relocator: &mut Relocator<'_>, staged: &[StagedEntry]) -> RelocationBatch {
        relocator.relocate(staged, &CancelFlag::new(), &mut NoopProgress)
    }

    #[test]
    fn test_preserve_structure() {
        let fx = Fixture::new();
        let policy = policy(true, NameCollision::Skip);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(&mut relocator, &[fx.file("img/cat.jpg", b"cat")]);
        assert!(batch.results[0].accepted);
        assert_eq!(batch.results[0].final_path, fx.dest.join("img/cat.jpg"));
        assert_eq!(fs::read(fx.dest.join("img/cat.jpg")).unwrap(), b"cat");
        assert!(fx.stage.join("img/cat.jpg").exists(), "copy keeps staging");
    }

    #[test]
    fn test_flatten() {
        let fx = Fixture::new();
        let policy = policy(false, NameCollision::Skip);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(&mut relocator, &[fx.file("a/b/deep.txt", b"x")]);
        assert_eq!(batch.results[0].final_path, fx.dest.join("deep.txt"));
        assert!(!fx.dest.join("a").exists());
    }

    #[test]
    fn test_move_removes_staged_file() {
        let fx = Fixture::new();
        let policy = policy(true, NameCollision::Skip);
        let mut relocator = Relocator::new(&fx.dest, &policy).with_transfer(Transfer::Move);

        let staged = fx.file("a.txt", b"moved");
        let batch = run(&mut relocator, std::slice::from_ref(&staged));
        assert!(batch.results[0].accepted);
        assert!(!staged.path.exists());
        assert_eq!(fs::read(fx.dest.join("a.txt")).unwrap(), b"moved");
    }

    #[test]
    fn test_skip_existing() {
        let fx = Fixture::new();
        fs::write(fx.dest.join("a.txt"), b"old").unwrap();
        let policy = policy(true, NameCollision::Skip);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(&mut relocator, &[fx.file("a.txt", b"new")]);
        assert!(!batch.results[0].accepted);
        assert_eq!(batch.skipped, vec!["a.txt".to_string()]);
        assert!(batch.failures.is_empty());
        assert_eq!(fs::read(fx.dest.join("a.txt")).unwrap(), b"old");
    }

    #[test]
    fn test_overwrite_existing() {
        let fx = Fixture::new();
        fs::write(fx.dest.join("a.txt"), b"old").unwrap();
        let policy = policy(true, NameCollision::Overwrite);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(&mut relocator, &[fx.file("a.txt", b"new")]);
        assert!(batch.results[0].accepted);
        assert_eq!(fs::read(fx.dest.join("a.txt")).unwrap(), b"new");
    }

    #[test]
    #[cfg(unix)]
    fn test_overwrite_read_only_target_fails() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        let existing = fx.dest.join("a.txt");
        fs::write(&existing, b"old").unwrap();
        fs::set_permissions(&existing, fs::Permissions::from_mode(0o444)).unwrap();
        if is_writable(&existing) {
            // Running as root: permission bits are not enforced.
            return;
        }

        let policy = policy(true, NameCollision::Overwrite);
        let mut relocator = Relocator::new(&fx.dest, &policy);
        let batch = run(&mut relocator, &[fx.file("a.txt", b"new")]);

        assert!(!batch.results[0].accepted);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].stage, Stage::Relocation);
        assert_eq!(fs::read(&existing).unwrap(), b"old");
    }

    #[test]
    fn test_suffix_fixed_never_overwrites() {
        let fx = Fixture::new();
        let policy = PlacementPolicy {
            preserve_structure: false,
            collision: NameCollision::Suffix,
            separator: "_".into(),
            suffix_value: SuffixValue::Fixed("v1".into()),
        };
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(
            &mut relocator,
            &[fx.file("a/cat.jpg", b"one"), fx.file("b/cat.jpg", b"two")],
        );
        assert_eq!(batch.results[0].final_path, fx.dest.join("cat_v1.jpg"));
        assert_eq!(batch.results[1].final_path, fx.dest.join("cat_v1-1.jpg"));
        assert_eq!(fs::read(fx.dest.join("cat_v1.jpg")).unwrap(), b"one");
        assert_eq!(fs::read(fx.dest.join("cat_v1-1.jpg")).unwrap(), b"two");
    }

    #[test]
    fn test_suffix_timestamp_distinct() {
        let fx = Fixture::new();
        let policy = PlacementPolicy {
            preserve_structure: false,
            collision: NameCollision::Suffix,
            ..Default::default()
        };
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let staged: Vec<_> = (0..5)
            .map(|i| fx.file(&format!("d{i}/same.txt"), b"x"))
            .collect();
        let batch = run(&mut relocator, &staged);

        let mut paths: Vec<_> = batch.results.iter().map(|r| r.final_path.clone()).collect();
        assert!(batch.results.iter().all(|r| r.accepted));
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 5);
        for path in &paths {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("same_") && name.ends_with(".txt"), "{name}");
        }
    }

    #[test]
    fn test_suffix_clock_strictly_increasing() {
        let mut clock = SuffixClock::default();
        let tokens: Vec<String> = (0..100).map(|_| clock.next()).collect();
        let mut deduped = tokens.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), tokens.len());
        assert!(tokens[0].contains('.'));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("cat.jpg"), ("cat", Some("jpg")));
        assert_eq!(split_name("a.tar.gz"), ("a.tar", Some("gz")));
        assert_eq!(split_name("README"), ("README", None));
        assert_eq!(split_name(".env"), (".env", None));
    }

    #[test]
    fn test_directory_entries_recreated() {
        let fx = Fixture::new();
        let policy = policy(true, NameCollision::Skip);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(&mut relocator, &[fx.dir("docs/empty/")]);
        assert!(batch.results[0].accepted);
        assert!(fx.dest.join("docs/empty").is_dir());

        let again = run(&mut relocator, &[fx.dir("docs/empty/")]);
        assert!(again.results[0].accepted);
    }

    #[test]
    fn test_directory_in_the_way_fails() {
        let fx = Fixture::new();
        fs::create_dir(fx.dest.join("clash.txt")).unwrap();
        let policy = policy(true, NameCollision::Overwrite);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let batch = run(&mut relocator, &[fx.file("clash.txt", b"x")]);
        assert!(!batch.results[0].accepted);
        assert!(matches!(
            batch.failures[0].error,
            SiftError::Relocation { .. }
        ));
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let fx = Fixture::new();
        let policy = policy(true, NameCollision::Overwrite);
        let mut relocator = Relocator::new(&fx.dest, &policy);

        let missing = fx.file("gone.txt", b"x");
        fs::remove_file(&missing.path).unwrap();

        let batch = run(&mut relocator, &[missing, fx.file("ok.txt", b"ok")]);
        assert!(!batch.results[0].accepted);
        assert!(batch.results[1].accepted);
        assert_eq!(batch.failures.len(), 1);
    }
}
