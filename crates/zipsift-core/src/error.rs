//! Error types for staged archive extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `SiftError`.
pub type Result<T> = std::result::Result<T, SiftError>;

/// Failure codes reported by the archive reader.
///
/// Every code maps to a distinct, user-legible message so that a failed open
/// or a failed entry can be explained without inspecting the underlying
/// library error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveErrorCode {
    /// The archive structure is internally inconsistent.
    Inconsistent,
    /// The requested entry does not exist in the archive.
    NoSuchEntry,
    /// The file is not a ZIP archive.
    NotAnArchive,
    /// The archive file could not be opened.
    Open,
    /// Reading archive data failed.
    Read,
    /// Seeking inside the archive failed.
    Seek,
    /// Writing extracted data failed.
    Write,
    /// Entry data does not match its stored checksum.
    Crc,
    /// The entry uses a compression method that is not supported.
    UnsupportedCompression,
    /// Multi-volume (split) archives are not supported.
    MultiVolume,
    /// The archive handle was used after it had been closed.
    Closed,
}

impl ArchiveErrorCode {
    /// Returns the human-readable message for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Inconsistent => "zip archive inconsistent",
            Self::NoSuchEntry => "no such file in archive",
            Self::NotAnArchive => "not a zip archive",
            Self::Open => "can't open file",
            Self::Read => "read error",
            Self::Seek => "seek error",
            Self::Write => "write error",
            Self::Crc => "CRC error",
            Self::UnsupportedCompression => "compression method not supported",
            Self::MultiVolume => "multi-disk zip archives not supported",
            Self::Closed => "containing zip archive was closed",
        }
    }

    /// Returns a stable identifier suitable for machine-readable output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inconsistent => "INCONSISTENT",
            Self::NoSuchEntry => "NO_SUCH_ENTRY",
            Self::NotAnArchive => "NOT_AN_ARCHIVE",
            Self::Open => "OPEN",
            Self::Read => "READ",
            Self::Seek => "SEEK",
            Self::Write => "WRITE",
            Self::Crc => "CRC",
            Self::UnsupportedCompression => "UNSUPPORTED_COMPRESSION",
            Self::MultiVolume => "MULTI_VOLUME",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ArchiveErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors that can occur during a staged extraction run.
#[derive(Error, Debug)]
pub enum SiftError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run is misconfigured (missing or unusable directories, invalid
    /// registry input). Raised before any extraction begins.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The archive could not be opened.
    #[error("cannot open archive {path}: {code} ({detail})")]
    ArchiveOpen {
        /// Path of the archive.
        path: PathBuf,
        /// Reader failure code.
        code: ArchiveErrorCode,
        /// Underlying library message.
        detail: String,
    },

    /// A single entry could not be listed or extracted.
    #[error("cannot extract {entry}: {code} ({detail})")]
    ArchiveRead {
        /// Archive entry name.
        entry: String,
        /// Reader failure code.
        code: ArchiveErrorCode,
        /// Underlying library message.
        detail: String,
    },

    /// The content sniffer could not inspect a staged file.
    #[error("cannot classify {path}: {reason}")]
    Classification {
        /// Staged file path.
        path: PathBuf,
        /// Why classification failed.
        reason: String,
    },

    /// An accepted file could not be moved into the destination.
    #[error("cannot relocate {path}: {reason}")]
    Relocation {
        /// Target path in the destination directory.
        path: PathBuf,
        /// Why relocation failed.
        reason: String,
    },

    /// An entry name would escape the extraction root.
    #[error("path traversal detected: {entry}")]
    PathTraversal {
        /// The offending entry name.
        entry: String,
    },

    /// The custom signature database is malformed.
    #[error("invalid signature database {path} line {line}: {reason}")]
    SignatureDb {
        /// Path of the signature database.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },
}

impl SiftError {
    /// Creates a `Configuration` error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error aborts the whole run.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipsift_core::SiftError;
    ///
    /// let err = SiftError::configuration("no destination");
    /// assert!(err.is_fatal());
    ///
    /// let err = SiftError::PathTraversal {
    ///     entry: "../etc/passwd".into(),
    /// };
    /// assert!(!err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::ArchiveOpen { .. } | Self::SignatureDb { .. }
        )
    }

    /// Returns `true` if this error concerns a single entry and the batch
    /// can continue without it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ArchiveRead { .. }
                | Self::Classification { .. }
                | Self::Relocation { .. }
                | Self::PathTraversal { .. }
        )
    }

    /// Returns the archive reader code attached to this error, if any.
    #[must_use]
    pub const fn archive_code(&self) -> Option<ArchiveErrorCode> {
        match self {
            Self::ArchiveOpen { code, .. } | Self::ArchiveRead { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns a stable identifier for this error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::Configuration { .. } => "CONFIGURATION",
            Self::ArchiveOpen { .. } => "ARCHIVE_OPEN",
            Self::ArchiveRead { .. } => "ARCHIVE_READ",
            Self::Classification { .. } => "CLASSIFICATION",
            Self::Relocation { .. } => "RELOCATION",
            Self::PathTraversal { .. } => "PATH_TRAVERSAL",
            Self::SignatureDb { .. } => "SIGNATURE_DB",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_CODES: [ArchiveErrorCode; 11] = [
        ArchiveErrorCode::Inconsistent,
        ArchiveErrorCode::NoSuchEntry,
        ArchiveErrorCode::NotAnArchive,
        ArchiveErrorCode::Open,
        ArchiveErrorCode::Read,
        ArchiveErrorCode::Seek,
        ArchiveErrorCode::Write,
        ArchiveErrorCode::Crc,
        ArchiveErrorCode::UnsupportedCompression,
        ArchiveErrorCode::MultiVolume,
        ArchiveErrorCode::Closed,
    ];

    #[test]
    fn test_archive_codes_have_distinct_messages() {
        let messages: HashSet<_> = ALL_CODES.iter().map(|c| c.message()).collect();
        assert_eq!(messages.len(), ALL_CODES.len());

        let ids: HashSet<_> = ALL_CODES.iter().map(|c| c.as_str()).collect();
        assert_eq!(ids.len(), ALL_CODES.len());
    }

    #[test]
    fn test_archive_open_display() {
        let err = SiftError::ArchiveOpen {
            path: PathBuf::from("bundle.zip"),
            code: ArchiveErrorCode::NotAnArchive,
            detail: "missing end of central directory".into(),
        };
        let display = err.to_string();
        assert!(display.contains("bundle.zip"));
        assert!(display.contains("not a zip archive"));
        assert!(err.is_fatal());
        assert_eq!(err.archive_code(), Some(ArchiveErrorCode::NotAnArchive));
    }

    #[test]
    fn test_path_traversal_error() {
        let err = SiftError::PathTraversal {
            entry: "../etc/passwd".into(),
        };
        assert!(err.to_string().contains("path traversal"));
        assert!(err.to_string().contains("../etc/passwd"));
        assert!(err.is_recoverable());
        assert_eq!(err.code(), "PATH_TRAVERSAL");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SiftError = io_err.into();
        assert!(matches!(err, SiftError::Io(_)));
        assert!(!err.is_fatal());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_fatal_and_recoverable_are_disjoint() {
        let errors = vec![
            SiftError::configuration("missing destination"),
            SiftError::ArchiveRead {
                entry: "a.txt".into(),
                code: ArchiveErrorCode::Crc,
                detail: "Invalid checksum".into(),
            },
            SiftError::Classification {
                path: PathBuf::from("a.txt"),
                reason: "gone".into(),
            },
            SiftError::Relocation {
                path: PathBuf::from("a.txt"),
                reason: "read-only".into(),
            },
            SiftError::SignatureDb {
                path: PathBuf::from("magic.db"),
                line: 3,
                reason: "bad hex".into(),
            },
        ];

        for err in errors {
            assert!(
                !(err.is_fatal() && err.is_recoverable()),
                "{} is both fatal and recoverable",
                err.code()
            );
        }
    }
}
