//! Archive reader abstraction.
//!
//! The pipeline talks to archives only through [`ArchiveReader`]: list the
//! entries once, extract named entries to a directory, close the handle. The
//! ZIP implementation lives in [`zip`]; tests substitute their own readers to
//! simulate corrupt entries.

pub mod zip;

use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::types::Entry;
use crate::types::SafeEntryName;

pub use self::zip::ZipReader;

/// Read access to an opened archive.
///
/// A reader is owned by exactly one run and closed exactly once. Every
/// operation after [`close`](Self::close) fails with
/// [`ArchiveErrorCode::Closed`](crate::ArchiveErrorCode::Closed).
pub trait ArchiveReader {
    /// Lists every entry in archive physical order.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::ArchiveRead` if the central directory cannot be
    /// walked, or if the reader has been closed.
    fn list_entries(&mut self) -> Result<Vec<Entry>>;

    /// Extracts a single entry below `dest`, preserving its relative
    /// directory structure, and returns the path written.
    ///
    /// Directory entries are created as directories.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::ArchiveRead` with the matching archive code if the
    /// entry is missing, unreadable or fails its checksum. A partially
    /// written file is removed before returning.
    fn extract_entry(&mut self, name: &SafeEntryName, dest: &Path) -> Result<PathBuf>;

    /// Extracts several entries in order.
    ///
    /// One result per name is returned; a failing entry does not stop the
    /// ones after it.
    fn extract_to(
        &mut self,
        names: &[SafeEntryName],
        dest: &Path,
    ) -> Vec<(SafeEntryName, Result<PathBuf>)> {
        names
            .iter()
            .map(|name| (name.clone(), self.extract_entry(name, dest)))
            .collect()
    }

    /// Releases the archive handle.
    ///
    /// Closing an already closed reader is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the underlying handle fails.
    fn close(&mut self) -> Result<()>;

    /// Returns `true` once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}
