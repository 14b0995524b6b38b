//! Validated destination directory type.

use crate::Result;
use crate::SiftError;
use std::path::Path;
use std::path::PathBuf;

/// A validated destination directory for relocated files.
///
/// This type represents a directory that has been validated to:
/// - Exist on the filesystem
/// - Be a directory (not a file)
/// - Be writable by the current process
/// - Be represented as an absolute canonical path
///
/// Failing any of these is a configuration problem: the run cannot place a
/// single file, so construction errors are reported as
/// `SiftError::Configuration`.
///
/// # Examples
///
/// ```no_run
/// use zipsift_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::create("/tmp/uploads", 0o755)?;
/// println!("Relocating into: {}", dest.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Creates a new `DestDir` from an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path does not exist
    /// - The path exists but is not a directory
    /// - The path cannot be canonicalized
    /// - The directory is not writable (on Unix)
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(SiftError::configuration(format!(
                "directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(SiftError::configuration(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            SiftError::configuration(format!(
                "failed to canonicalize path {}: {e}",
                path.display()
            ))
        })?;

        if !is_writable(&canonical) {
            return Err(SiftError::configuration(format!(
                "directory is not writable: {}",
                canonical.display()
            )));
        }

        Ok(Self(canonical))
    }

    /// Creates the directory (and its parents) if absent, then validates it.
    ///
    /// Newly created directories get `mode` on Unix; existing directories
    /// keep their permissions.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` if the directory cannot be created
    /// or fails validation.
    pub fn create(path: impl Into<PathBuf>, mode: u32) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            create_dir_all_with_mode(&path, mode).map_err(|e| {
                SiftError::configuration(format!(
                    "cannot create directory {}: {e}",
                    path.display()
                ))
            })?;
        }
        Self::new(path)
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a relative path to this destination directory.
    #[inline]
    #[must_use]
    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.0.join(path)
    }
}

/// Recursively creates `path`, applying `mode` to created directories on Unix.
pub(crate) fn create_dir_all_with_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder.create(path)
}

/// Checks effective write permission for `path`.
///
/// Uses `access(2)` on Unix so that ownership, group membership and ACLs are
/// honoured; elsewhere falls back to the read-only attribute.
pub(crate) fn is_writable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let Ok(path_cstring) = CString::new(path.as_os_str().as_bytes()) else {
            return false;
        };

        // SAFETY: access() is safe to call with a valid C string.
        // The pointer is valid for the duration of the call.
        #[allow(unsafe_code)]
        let result = unsafe { libc::access(path_cstring.as_ptr(), libc::W_OK) };
        result == 0
    }

    #[cfg(not(unix))]
    {
        std::fs::metadata(path).is_ok_and(|m| !m.permissions().readonly())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dest_dir_valid() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("dest should be valid");
        assert!(dest.as_path().is_absolute());
    }

    #[test]
    fn test_dest_dir_nonexistent() {
        let result = DestDir::new("/nonexistent/directory/that/does/not/exist");
        assert!(matches!(result, Err(SiftError::Configuration { .. })));
    }

    #[test]
    fn test_dest_dir_not_a_directory() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file_path = temp.path().join("file.txt");
        fs::write(&file_path, "test").expect("failed to write file");

        assert!(matches!(
            DestDir::new(file_path),
            Err(SiftError::Configuration { .. })
        ));
    }

    #[test]
    fn test_dest_dir_create_nested() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let nested = temp.path().join("a").join("b").join("c");

        let dest = DestDir::create(&nested, 0o755).expect("should create nested dirs");
        assert!(nested.is_dir());
        assert_eq!(dest.as_path(), nested.canonicalize().unwrap());
    }

    #[test]
    fn test_dest_dir_create_under_file_fails() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file_path = temp.path().join("blocker");
        fs::write(&file_path, "x").unwrap();

        let result = DestDir::create(file_path.join("sub"), 0o755);
        assert!(matches!(result, Err(SiftError::Configuration { .. })));
    }

    #[test]
    fn test_dest_dir_canonicalization() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let subdir = temp.path().join("subdir");
        fs::create_dir(&subdir).expect("failed to create subdir");

        let dest = DestDir::new(subdir.join(".").join("..")).expect("should create dest dir");
        assert_eq!(dest.as_path(), temp.path().canonicalize().unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn test_dest_dir_created_with_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("failed to create temp dir");
        let dir = temp.path().join("moded");
        DestDir::create(&dir, 0o700).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & 0o077, 0, "group/other bits must stay cleared");
    }

    #[test]
    fn test_is_writable_for_fresh_file() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file_path = temp.path().join("w.txt");
        fs::write(&file_path, "x").unwrap();
        assert!(is_writable(&file_path));
        assert!(!is_writable(&temp.path().join("missing.txt")));
    }
}
