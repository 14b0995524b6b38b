//! Content validation of staged files.

use std::path::Path;

use rayon::prelude::*;

use crate::MediaTypeRegistry;
use crate::Result;
use crate::SiftError;
use crate::run::CancelFlag;
use crate::sniff::ContentSniffer;
use crate::sniff::SignatureDb;
use crate::staging::StagedEntry;
use crate::types::entry::extension;

/// Decision for one staged entry.
#[derive(Debug)]
pub enum Verdict {
    /// The entry may be relocated. `media_type` is `None` when nothing was
    /// sniffed (directories, validation disabled).
    Accepted {
        /// Sniffed media type.
        media_type: Option<String>,
    },

    /// The sniffed content does not match the registry rule.
    Rejected {
        /// Sniffed media type.
        media_type: String,
    },

    /// The file could not be classified; treated as a rejection.
    Failed(SiftError),

    /// Not checked because the run was cancelled.
    Cancelled,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Sniffs staged files and checks them against a [`MediaTypeRegistry`].
///
/// # Examples
///
/// ```
/// use zipsift_core::MagicSniffer;
/// use zipsift_core::MediaTypeRegistry;
/// use zipsift_core::ValidationGate;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let dir = tempfile::tempdir()?;
/// let path = dir.path().join("notes.txt");
/// std::fs::write(&path, "just text")?;
///
/// let mut registry = MediaTypeRegistry::new();
/// registry.register("txt", ["text/plain"])?;
/// let sniffer = MagicSniffer::new();
/// let gate = ValidationGate::new(&registry, &sniffer)?;
///
/// assert_eq!(gate.classify(&path)?, "text/plain");
/// assert!(gate.accept(&path)?);
/// # Ok(())
/// # }
/// ```
pub struct ValidationGate<'a> {
    registry: &'a MediaTypeRegistry,
    sniffer: &'a dyn ContentSniffer,
    signatures: Option<SignatureDb>,
    workers: usize,
}

impl<'a> ValidationGate<'a> {
    /// Creates a gate, loading the registry's signature database if one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::SignatureDb` if the database is malformed.
    pub fn new(registry: &'a MediaTypeRegistry, sniffer: &'a dyn ContentSniffer) -> Result<Self> {
        let signatures = registry.signature_db().map(SignatureDb::load).transpose()?;
        Ok(Self {
            registry,
            sniffer,
            signatures,
            workers: 1,
        })
    }

    /// Sets the number of threads used by [`check_all`](Self::check_all).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Returns the media type of the file at `path`, by content only.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Classification` if the file cannot be read.
    pub fn classify(&self, path: &Path) -> Result<String> {
        self.sniffer.detect(path, self.signatures.as_ref())
    }

    /// Returns `true` if the file at `path` may be kept.
    ///
    /// Directories are always accepted and nothing is sniffed while the
    /// registry is not validating.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Classification` if the file cannot be read.
    pub fn accept(&self, path: &Path) -> Result<bool> {
        if path.is_dir() || !self.registry.is_validating() {
            return Ok(true);
        }
        let claimed = path
            .file_name()
            .and_then(|name| extension(&name.to_string_lossy()))
            .unwrap_or_default();
        let sniffed = self.classify(path)?;
        Ok(self.registry.is_accepted(&claimed, &sniffed))
    }

    /// Checks one staged entry.
    pub fn check(&self, staged: &StagedEntry) -> Verdict {
        if staged.is_dir || !self.registry.is_validating() {
            return Verdict::Accepted { media_type: None };
        }

        let sniffed = match self.classify(&staged.path) {
            Ok(sniffed) => sniffed,
            Err(err) => return Verdict::Failed(err),
        };
        let claimed = staged.extension().unwrap_or_default();

        if self.registry.is_accepted(&claimed, &sniffed) {
            Verdict::Accepted {
                media_type: Some(sniffed),
            }
        } else {
            log::debug!("rejecting {}: .{claimed} sniffed as {sniffed}", staged.name);
            Verdict::Rejected { media_type: sniffed }
        }
    }

    /// Checks a batch, returning one verdict per entry in input order.
    ///
    /// With more than one worker the batch is sniffed on a bounded thread
    /// pool; entries not yet started when `cancel` fires get
    /// [`Verdict::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be created.
    pub fn check_all(&self, staged: &[StagedEntry], cancel: &CancelFlag) -> Result<Vec<Verdict>> {
        let check = |entry: &StagedEntry| {
            if cancel.is_cancelled() {
                Verdict::Cancelled
            } else {
                self.check(entry)
            }
        };

        if self.workers <= 1 || staged.len() <= 1 || !self.registry.is_validating() {
            return Ok(staged.iter().map(check).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| SiftError::Io(std::io::Error::other(e)))?;

        Ok(pool.install(|| staged.par_iter().map(check).collect()))
    }
}

impl std::fmt::Debug for ValidationGate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("registry", &self.registry)
            .field("signatures", &self.signatures)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MagicSniffer;
    use crate::test_utils::JPEG_BYTES;
    use crate::test_utils::PNG_BYTES;
    use crate::types::SafeEntryName;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn registry() -> MediaTypeRegistry {
        let mut registry = MediaTypeRegistry::new();
        registry.register("jpg", ["image/jpeg"]).unwrap();
        registry.register("txt", ["text/plain"]).unwrap();
        registry
    }

    fn stage(dir: &Path, name: &str, data: &[u8]) -> StagedEntry {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, data).unwrap();
        StagedEntry {
            name: SafeEntryName::validate(name).unwrap(),
            path,
            is_dir: false,
        }
    }

    struct CountingSniffer(AtomicUsize);

    impl ContentSniffer for CountingSniffer {
        fn detect(&self, _path: &Path, _signatures: Option<&SignatureDb>) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("application/octet-stream".into())
        }
    }

    #[test]
    fn test_matching_content_is_accepted() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = stage(temp.path(), "img/cat.jpg", JPEG_BYTES);
        assert!(matches!(
            gate.check(&entry),
            Verdict::Accepted { media_type: Some(ref m) } if m == "image/jpeg"
        ));
    }

    #[test]
    fn test_disguised_content_is_rejected() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = stage(temp.path(), "img/cat.txt", JPEG_BYTES);
        assert!(matches!(
            gate.check(&entry),
            Verdict::Rejected { ref media_type } if media_type == "image/jpeg"
        ));
        assert!(!gate.accept(&entry.path).unwrap());
    }

    #[test]
    fn test_unregistered_extension_is_rejected() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = stage(temp.path(), "logo.png", PNG_BYTES);
        assert!(!gate.check(&entry).is_accepted());
    }

    #[test]
    fn test_disabled_validation_sniffs_nothing() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry();
        registry.set_validation(false);
        let sniffer = CountingSniffer(AtomicUsize::new(0));
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = stage(temp.path(), "cat.txt", JPEG_BYTES);
        assert!(gate.check(&entry).is_accepted());
        assert!(gate.accept(&entry.path).unwrap());
        assert_eq!(sniffer.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_directories_always_accepted() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = CountingSniffer(AtomicUsize::new(0));
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = StagedEntry {
            name: SafeEntryName::validate("docs/").unwrap(),
            path: temp.path().to_path_buf(),
            is_dir: true,
        };
        assert!(gate.check(&entry).is_accepted());
        assert!(gate.accept(temp.path()).unwrap());
        assert_eq!(sniffer.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_vanished_file_fails() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = stage(temp.path(), "gone.txt", b"x");
        fs::remove_file(&entry.path).unwrap();
        assert!(matches!(
            gate.check(&entry),
            Verdict::Failed(SiftError::Classification { .. })
        ));
    }

    #[test]
    fn test_check_all_parallel_preserves_order() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer)
            .unwrap()
            .with_workers(4);

        let staged: Vec<_> = (0..32)
            .map(|i| {
                if i % 2 == 0 {
                    stage(temp.path(), &format!("f{i}.jpg"), JPEG_BYTES)
                } else {
                    stage(temp.path(), &format!("f{i}.txt"), JPEG_BYTES)
                }
            })
            .collect();

        let verdicts = gate.check_all(&staged, &CancelFlag::new()).unwrap();
        assert_eq!(verdicts.len(), staged.len());
        for (i, verdict) in verdicts.iter().enumerate() {
            assert_eq!(verdict.is_accepted(), i % 2 == 0, "entry {i}");
        }
    }

    #[test]
    fn test_check_all_cancelled() {
        let temp = TempDir::new().unwrap();
        let registry = registry();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let staged = vec![stage(temp.path(), "a.txt", b"a")];
        let verdicts = gate.check_all(&staged, &cancel).unwrap();
        assert!(matches!(verdicts[0], Verdict::Cancelled));
    }

    #[test]
    fn test_signature_db_loaded_from_registry() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("magic.db");
        fs::write(&db, "0 ffd8ff image/x-custom\n").unwrap();

        let mut registry = registry();
        registry.set_signature_db(&db).unwrap();
        registry.register("jpg", ["image/x-custom"]).unwrap();
        let sniffer = MagicSniffer::new();
        let gate = ValidationGate::new(&registry, &sniffer).unwrap();

        let entry = stage(temp.path(), "cat.jpg", JPEG_BYTES);
        assert!(gate.check(&entry).is_accepted());
    }

    #[test]
    fn test_malformed_signature_db_is_fatal() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("magic.db");
        fs::write(&db, "not a rule\n").unwrap();

        let mut registry = registry();
        registry.set_signature_db(&db).unwrap();
        let sniffer = MagicSniffer::new();
        let err = ValidationGate::new(&registry, &sniffer).unwrap_err();
        assert!(matches!(err, SiftError::SignatureDb { line: 1, .. }));
    }
}
