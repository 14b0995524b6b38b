//! Error conversion utilities for CLI.
//!
//! Converts zipsift-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use zipsift_core::ArchiveErrorCode;
use zipsift_core::SiftError;

/// Converts `SiftError` to a user-friendly anyhow error with context.
pub fn convert_sift_error(err: SiftError, archive: &Path) -> anyhow::Error {
    match err {
        SiftError::ArchiveOpen { code, detail, .. } => {
            let hint = match code {
                ArchiveErrorCode::NotAnArchive => "The file is not a ZIP archive.",
                ArchiveErrorCode::MultiVolume => "Multi-volume archives are not supported.",
                ArchiveErrorCode::Open => "Check that the file exists and is readable.",
                _ => "The archive may be corrupted or truncated.",
            };
            anyhow!(
                "Cannot open archive '{}': {} ({detail})\nHINT: {hint}",
                archive.display(),
                code.message()
            )
        }
        SiftError::ArchiveRead {
            entry,
            code,
            detail,
        } => {
            anyhow!(
                "Cannot read '{}' from archive '{}': {} ({detail})\n\
                 HINT: The archive may be corrupted or malformed.",
                entry,
                archive.display(),
                code.message()
            )
        }
        SiftError::Configuration { reason } => {
            anyhow!(
                "Invalid configuration: {reason}\n\
                 HINT: Check the output directory, --staging-dir, --rule and --suffix-value options."
            )
        }
        SiftError::SignatureDb { path, line, reason } => {
            let location = if line == 0 {
                path.display().to_string()
            } else {
                format!("{}:{line}", path.display())
            };
            anyhow!(
                "Invalid signature database {location}: {reason}\n\
                 HINT: Each rule reads '<offset> <hex-bytes> <media/type>', e.g. '0 89504e47 image/png'."
            )
        }
        SiftError::PathTraversal { entry } => {
            anyhow!(
                "Security violation: Archive '{}' attempted path traversal with '{entry}'\n\
                 HINT: This archive may be malicious. Do not extract from untrusted sources.",
                archive.display()
            )
        }
        SiftError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        err @ (SiftError::Classification { .. } | SiftError::Relocation { .. }) => {
            anyhow::Error::from(err)
                .context(format!("Error processing archive '{}'", archive.display()))
        }
    }
}

/// Adds archive context to a core result.
pub fn add_archive_context<T>(result: Result<T, SiftError>, archive: &Path) -> anyhow::Result<T> {
    result.map_err(|e| convert_sift_error(e, archive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_not_an_archive() {
        let err = SiftError::ArchiveOpen {
            path: PathBuf::from("notes.txt"),
            code: ArchiveErrorCode::NotAnArchive,
            detail: "invalid Zip archive".into(),
        };
        let msg = format!("{:?}", convert_sift_error(err, Path::new("notes.txt")));
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("not a ZIP archive"));
    }

    #[test]
    fn test_convert_signature_db_error() {
        let err = SiftError::SignatureDb {
            path: PathBuf::from("magic.db"),
            line: 3,
            reason: "bad offset".into(),
        };
        let msg = format!("{:?}", convert_sift_error(err, Path::new("a.zip")));
        assert!(msg.contains("magic.db:3"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let converted = convert_sift_error(SiftError::Io(io_err), Path::new("a.zip"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("I/O error"));
    }
}
