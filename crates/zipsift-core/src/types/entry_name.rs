//! Validated archive entry name.

use crate::Result;
use crate::SiftError;
use std::path::PathBuf;

/// An archive entry name that is safe to materialize under a root directory.
///
/// `SafeEntryName` represents a name that has been validated to not contain:
/// - Parent directory segments (`..`)
/// - Null bytes
/// - Absolute roots (`/foo`, `\foo`) or drive prefixes (`C:`)
///
/// # Security Properties
///
/// - Can ONLY be constructed through [`SafeEntryName::validate`]
/// - NO `From<String>` implementation
/// - [`SafeEntryName::relative_path`] always stays below the directory it is
///   joined to
///
/// # Examples
///
/// ```
/// use zipsift_core::types::SafeEntryName;
///
/// let name = SafeEntryName::validate("img/./cat.jpg")?;
/// assert_eq!(name.as_str(), "img/./cat.jpg");
/// assert_eq!(name.relative_path(), std::path::PathBuf::from("img/cat.jpg"));
///
/// assert!(SafeEntryName::validate("../etc/passwd").is_err());
/// # Ok::<(), zipsift_core::SiftError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeEntryName {
    raw: String,
    segments: Vec<String>,
    directory: bool,
}

impl SafeEntryName {
    /// Validates an entry name as read from the archive.
    ///
    /// Both `/` and `\` are treated as separators when checking segments so
    /// that a name crafted on one platform cannot traverse on another.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::PathTraversal` if the name is empty, contains a
    /// null byte, is absolute, carries a drive prefix, or has a `..` segment.
    pub fn validate(name: &str) -> Result<Self> {
        let traversal = || SiftError::PathTraversal {
            entry: name.to_string(),
        };

        if name.is_empty() || name.contains('\0') {
            return Err(traversal());
        }

        if name.starts_with('/') || name.starts_with('\\') || has_drive_prefix(name) {
            return Err(traversal());
        }

        let mut segments = Vec::new();
        for segment in name.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => return Err(traversal()),
                normal => segments.push(normal.to_string()),
            }
        }

        if segments.is_empty() {
            return Err(traversal());
        }

        Ok(Self {
            raw: name.to_string(),
            segments,
            directory: name.ends_with('/') || name.ends_with('\\'),
        })
    }

    /// Returns the name exactly as stored in the archive.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the normalized relative path (no `.` or empty segments).
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }

    /// Returns `true` if the name ends with a separator.
    #[must_use]
    pub const fn is_directory_marker(&self) -> bool {
        self.directory
    }

    /// Returns the last normalized segment.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }
}

impl std::fmt::Display for SafeEntryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_plain_names() {
        let name = SafeEntryName::validate("docs/b/c.txt").unwrap();
        assert_eq!(name.as_str(), "docs/b/c.txt");
        assert_eq!(name.basename(), "c.txt");
        assert_eq!(name.relative_path(), PathBuf::from("docs").join("b").join("c.txt"));
        assert!(!name.is_directory_marker());
    }

    #[test]
    fn test_validate_directory_marker() {
        let name = SafeEntryName::validate("docs/b/").unwrap();
        assert!(name.is_directory_marker());
        assert_eq!(name.basename(), "b");
    }

    #[test]
    fn test_reject_parent_segments() {
        for raw in [
            "../etc/passwd",
            "foo/../../etc/passwd",
            "foo/..",
            "..\\windows\\system32",
            "a\\..\\..\\b",
        ] {
            assert!(
                matches!(
                    SafeEntryName::validate(raw),
                    Err(SiftError::PathTraversal { .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_reject_absolute_and_prefixed() {
        for raw in ["/etc/passwd", "\\\\server\\share", "C:\\Windows", "c:foo"] {
            assert!(SafeEntryName::validate(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_reject_empty_and_null() {
        assert!(SafeEntryName::validate("").is_err());
        assert!(SafeEntryName::validate("./").is_err());
        assert!(SafeEntryName::validate("a\0b").is_err());
    }

    #[test]
    fn test_dots_inside_names_are_fine() {
        let name = SafeEntryName::validate("v1..2/notes..txt").unwrap();
        assert_eq!(name.basename(), "notes..txt");
    }
}
