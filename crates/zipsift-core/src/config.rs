//! Configuration for staged extraction runs.

use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::SiftError;
use crate::index::ScanStrategy;

/// What to do when a relocated file's target name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NameCollision {
    /// Append a suffix to every relocated file name so nothing is ever
    /// overwritten.
    Suffix,

    /// Keep the name and replace an existing file, provided it is writable.
    Overwrite,

    /// Keep the name and leave an existing file alone.
    #[default]
    Skip,
}

/// Token inserted by [`NameCollision::Suffix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuffixValue {
    /// The same caller-chosen token for every file.
    Fixed(String),

    /// A strictly increasing `seconds.micros` timestamp.
    Timestamp,
}

/// How accepted files are laid out in the destination.
///
/// # Examples
///
/// ```
/// use zipsift_core::NameCollision;
/// use zipsift_core::PlacementPolicy;
/// use zipsift_core::SuffixValue;
///
/// let policy = PlacementPolicy {
///     preserve_structure: false,
///     collision: NameCollision::Suffix,
///     suffix_value: SuffixValue::Fixed("v2".into()),
///     ..Default::default()
/// };
/// assert_eq!(policy.separator, "_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPolicy {
    /// Recreate the entry's directories under the destination instead of
    /// flattening everything into it.
    pub preserve_structure: bool,

    /// Conflict handling for existing targets.
    pub collision: NameCollision,

    /// Text placed between the file stem and the suffix token.
    pub separator: String,

    /// Suffix token used by [`NameCollision::Suffix`].
    pub suffix_value: SuffixValue,
}

impl Default for PlacementPolicy {
    /// Structure preserved, existing files skipped, `_` separator,
    /// timestamp suffixes.
    fn default() -> Self {
        Self {
            preserve_structure: true,
            collision: NameCollision::default(),
            separator: "_".to_string(),
            suffix_value: SuffixValue::Timestamp,
        }
    }
}

/// Settings for one extraction run.
///
/// Relative paths are resolved against `base_path` when the run starts.
///
/// # Examples
///
/// ```
/// use zipsift_core::ExtractConfig;
/// use zipsift_core::NameCollision;
///
/// let config = ExtractConfig::default()
///     .with_base_path("/srv/uploads")
///     .with_destination("accepted")
///     .with_collision(NameCollision::Overwrite)
///     .with_validation_workers(4);
///
/// assert_eq!(
///     config.resolve(std::path::Path::new("accepted")),
///     std::path::PathBuf::from("/srv/uploads/accepted")
/// );
/// assert!(config.remove_staging);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Directory that relative archive, destination and staging paths are
    /// resolved against.
    pub base_path: PathBuf,

    /// Where accepted files end up. Required.
    pub destination: Option<PathBuf>,

    /// Staging directory. A directory that already exists is not staged into
    /// directly: a private child is created inside it. A private temporary
    /// directory inside `base_path` is used when unset.
    pub staging_dir: Option<PathBuf>,

    /// Delete the staging directory when the run ends.
    pub remove_staging: bool,

    /// Delete the archive file when the run ends.
    pub remove_archive: bool,

    /// Permission bits for directories created in the destination (Unix).
    pub dir_mode: u32,

    /// Number of threads used to sniff staged files.
    pub validation_workers: usize,

    /// How directory prefixes are scanned.
    pub scan: ScanStrategy,

    /// Reproduce directory entries even when they are empty.
    pub keep_empty_directories: bool,

    /// Destination layout and collision handling.
    pub placement: PlacementPolicy,
}

impl Default for ExtractConfig {
    /// Default values:
    /// - `base_path`: `.`
    /// - `destination`: none
    /// - `staging_dir`: none (private temporary directory)
    /// - `remove_staging`: true
    /// - `remove_archive`: false
    /// - `dir_mode`: `0o755`
    /// - `validation_workers`: 1
    /// - `scan`: full
    /// - `keep_empty_directories`: false
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            destination: None,
            staging_dir: None,
            remove_staging: true,
            remove_archive: false,
            dir_mode: 0o755,
            validation_workers: 1,
            scan: ScanStrategy::Full,
            keep_empty_directories: false,
            placement: PlacementPolicy::default(),
        }
    }
}

impl ExtractConfig {
    /// Sets the base path.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Sets the destination directory.
    #[must_use]
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Sets an explicit staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Keeps or removes the staging directory at run end.
    #[must_use]
    pub const fn with_remove_staging(mut self, remove: bool) -> Self {
        self.remove_staging = remove;
        self
    }

    /// Keeps or removes the archive at run end.
    #[must_use]
    pub const fn with_remove_archive(mut self, remove: bool) -> Self {
        self.remove_archive = remove;
        self
    }

    /// Sets the mode for created directories.
    #[must_use]
    pub const fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets the number of validation threads.
    #[must_use]
    pub const fn with_validation_workers(mut self, workers: usize) -> Self {
        self.validation_workers = workers;
        self
    }

    /// Sets the prefix scan strategy.
    #[must_use]
    pub const fn with_scan(mut self, scan: ScanStrategy) -> Self {
        self.scan = scan;
        self
    }

    /// Reproduces empty directories in the destination.
    #[must_use]
    pub const fn with_keep_empty_directories(mut self, keep: bool) -> Self {
        self.keep_empty_directories = keep;
        self
    }

    /// Replaces the placement policy.
    #[must_use]
    pub fn with_placement(mut self, placement: PlacementPolicy) -> Self {
        self.placement = placement;
        self
    }

    /// Preserves or flattens the directory structure.
    #[must_use]
    pub const fn with_preserve_structure(mut self, preserve: bool) -> Self {
        self.placement.preserve_structure = preserve;
        self
    }

    /// Sets the collision policy.
    #[must_use]
    pub const fn with_collision(mut self, collision: NameCollision) -> Self {
        self.placement.collision = collision;
        self
    }

    /// Switches to [`NameCollision::Suffix`] with the given token and
    /// optional separator.
    #[must_use]
    pub fn with_suffix(mut self, value: SuffixValue, separator: Option<&str>) -> Self {
        self.placement.collision = NameCollision::Suffix;
        self.placement.suffix_value = value;
        if let Some(separator) = separator {
            self.placement.separator = separator.to_string();
        }
        self
    }

    /// Resolves `path` against the base path unless it is absolute.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Checks the settings that can be checked without touching the
    /// filesystem.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.destination.is_none() {
            return Err(SiftError::configuration("no destination directory set"));
        }
        if self.validation_workers == 0 {
            return Err(SiftError::configuration(
                "validation_workers must be at least 1",
            ));
        }
        if self.dir_mode > 0o7777 {
            return Err(SiftError::configuration(format!(
                "invalid directory mode {:o}",
                self.dir_mode
            )));
        }
        if let SuffixValue::Fixed(value) = &self.placement.suffix_value {
            if self.placement.collision == NameCollision::Suffix && value.trim().is_empty() {
                return Err(SiftError::configuration("suffix value cannot be empty"));
            }
            if value.contains(['/', '\\', '\0']) {
                return Err(SiftError::configuration(format!(
                    "suffix value contains a path separator: {value:?}"
                )));
            }
        }
        if self.placement.separator.contains(['/', '\\', '\0']) {
            return Err(SiftError::configuration(format!(
                "suffix separator contains a path separator: {:?}",
                self.placement.separator
            )));
        }
        Ok(())
    }
}
