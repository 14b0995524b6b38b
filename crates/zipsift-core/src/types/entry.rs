//! Archive entry metadata.

/// Kind of entry found in an archive index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file entry.
    File,

    /// Directory marker entry.
    Directory,
}

/// One named item in the archive index.
///
/// Names always use `/` separators, whatever the host platform, and are
/// never modified after being read from the archive.
///
/// # Examples
///
/// ```
/// use zipsift_core::types::Entry;
///
/// let entry = Entry::file("img/cat.jpg", 2048);
/// assert_eq!(entry.basename(), "cat.jpg");
/// assert_eq!(entry.extension().as_deref(), Some("jpg"));
///
/// let dir = Entry::directory("img/");
/// assert!(dir.is_directory());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    size: u64,
}

impl Entry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: EntryKind, size: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
        }
    }

    /// Creates a regular file entry.
    #[must_use]
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, EntryKind::File, size)
    }

    /// Creates a directory entry.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Directory, 0)
    }

    /// Returns the entry name as stored in the archive.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Returns the uncompressed size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if this is a directory marker.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }

    /// Returns the last path component, ignoring a trailing slash.
    #[must_use]
    pub fn basename(&self) -> &str {
        basename(&self.name)
    }

    /// Returns the lower-cased text after the last `.` of the basename.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension(self.basename())
    }
}

/// Returns the last `/`-separated component of an archive name.
pub(crate) fn basename(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Returns the lower-cased extension of a file name, if it has one.
pub(crate) fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
