//! Content-based media type detection.
//!
//! Detection only looks at file bytes, never at the file name. The order is:
//!
//! 1. empty file: `application/x-empty`
//! 2. user signature database rules, first match wins
//! 3. built-in magic numbers (`infer`)
//! 4. valid UTF-8 without NUL bytes: `text/plain`
//! 5. anything else: `application/octet-stream`

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::SiftError;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 8192;

/// Media type reported for zero-length files.
pub const EMPTY: &str = "application/x-empty";

/// Media type reported for UTF-8 text without a known signature.
pub const TEXT_PLAIN: &str = "text/plain";

/// Media type reported when nothing else matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Maps file contents to a canonical media type string.
///
/// Implementations must be shareable across the validation thread pool.
pub trait ContentSniffer: Send + Sync {
    /// Detects the media type of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Classification` if the file cannot be read.
    fn detect(&self, path: &Path, signatures: Option<&SignatureDb>) -> Result<String>;
}

/// Default sniffer: signature database, then `infer`, then a text heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl MagicSniffer {
    /// Creates a new sniffer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Detects the media type of an in-memory buffer.
    #[must_use]
    pub fn detect_bytes(buf: &[u8], signatures: Option<&SignatureDb>) -> String {
        if buf.is_empty() {
            return EMPTY.to_string();
        }
        if let Some(media_type) = signatures.and_then(|db| db.lookup(buf)) {
            return media_type.to_string();
        }
        if let Some(kind) = infer::get(buf) {
            return kind.mime_type().to_string();
        }
        if looks_like_text(buf) {
            return TEXT_PLAIN.to_string();
        }
        OCTET_STREAM.to_string()
    }
}

impl ContentSniffer for MagicSniffer {
    fn detect(&self, path: &Path, signatures: Option<&SignatureDb>) -> Result<String> {
        let classification = |e: std::io::Error| SiftError::Classification {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let file = File::open(path).map_err(classification)?;
        let mut buf = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut buf)
            .map_err(classification)?;

        Ok(Self::detect_bytes(&buf, signatures))
    }
}

fn looks_like_text(buf: &[u8]) -> bool {
    if buf.contains(&0) {
        return false;
    }
    match std::str::from_utf8(buf) {
        Ok(_) => true,
        // A multi-byte character cut off by the read window is still text.
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0,
    }
}

/// One user-defined signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRule {
    /// Byte offset the signature starts at.
    pub offset: usize,

    /// Bytes that must appear at `offset`.
    pub magic: Vec<u8>,

    /// Media type reported on a match.
    pub media_type: String,
}

impl SignatureRule {
    fn matches(&self, buf: &[u8]) -> bool {
        buf.get(self.offset..)
            .is_some_and(|tail| tail.starts_with(&self.magic))
    }
}

/// User signature database.
///
/// The file is UTF-8 text with one rule per line:
///
/// ```text
/// # offset  magic-bytes (hex)  media type
/// 0         89504e47           image/png
/// 0x08      57454250           image/webp
/// ```
///
/// Offsets are decimal or `0x`-prefixed hexadecimal. Blank lines and lines
/// starting with `#` are ignored. Rules are tried in file order.
///
/// # Examples
///
/// ```
/// use zipsift_core::SignatureDb;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let db = SignatureDb::parse("0 cafe application/x-cafe\n", "inline".as_ref())?;
/// assert_eq!(db.lookup(&[0xca, 0xfe, 0x00]), Some("application/x-cafe"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureDb {
    path: PathBuf,
    rules: Vec<SignatureRule>,
}

impl SignatureDb {
    /// Loads and parses the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::SignatureDb` if the file cannot be read or a line
    /// is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SiftError::SignatureDb {
            path: path.to_path_buf(),
            line: 0,
            reason: e.to_string(),
        })?;
        let db = Self::parse(&text, path)?;
        log::debug!(
            "loaded {} signature rules from {}",
            db.rules.len(),
            path.display()
        );
        Ok(db)
    }

    /// Parses database text; `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::SignatureDb` naming the first malformed line.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut rules = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let error = |reason: String| SiftError::SignatureDb {
                path: path.to_path_buf(),
                line: number + 1,
                reason,
            };

            let mut fields = line.split_whitespace();
            let (Some(offset), Some(magic), Some(media_type), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(error(format!(
                    "expected '<offset> <hex-bytes> <media-type>', got {line:?}"
                )));
            };

            let offset = parse_offset(offset).ok_or_else(|| error(format!("bad offset {offset:?}")))?;
            let magic = parse_hex(magic).ok_or_else(|| error(format!("bad hex bytes {magic:?}")))?;
            if !media_type.contains('/') {
                return Err(error(format!("bad media type {media_type:?}")));
            }

            rules.push(SignatureRule {
                offset,
                magic,
                media_type: media_type.to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            rules,
        })
    }

    /// Returns the media type of the first rule matching `buf`.
    #[must_use]
    pub fn lookup(&self, buf: &[u8]) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(buf))
            .map(|rule| rule.media_type.as_str())
    }

    /// Returns the rules in file order.
    #[must_use]
    pub fn rules(&self) -> &[SignatureRule] {
        &self.rules
    }

    /// Returns the path the database was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_offset(text: &str) -> Option<usize> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if text.is_empty() || text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::JPEG_BYTES;
    use crate::test_utils::PDF_BYTES;
    use crate::test_utils::PNG_BYTES;
    use tempfile::TempDir;

    #[test]
    fn test_detect_bytes_builtin() {
        assert_eq!(MagicSniffer::detect_bytes(JPEG_BYTES, None), "image/jpeg");
        assert_eq!(MagicSniffer::detect_bytes(PNG_BYTES, None), "image/png");
        assert_eq!(MagicSniffer::detect_bytes(PDF_BYTES, None), "application/pdf");
    }

    #[test]
    fn test_detect_bytes_text_and_binary() {
        assert_eq!(MagicSniffer::detect_bytes(b"plain words\n", None), TEXT_PLAIN);
        assert_eq!(MagicSniffer::detect_bytes("héllo wörld".as_bytes(), None), TEXT_PLAIN);
        assert_eq!(MagicSniffer::detect_bytes(b"", None), EMPTY);
        assert_eq!(
            MagicSniffer::detect_bytes(&[0x01, 0x00, 0xfe, 0x7f], None),
            OCTET_STREAM
        );
    }

    #[test]
    fn test_truncated_utf8_is_text() {
        let mut buf = "a".repeat(10).into_bytes();
        buf.extend_from_slice(&"é".as_bytes()[..1]);
        assert!(looks_like_text(&buf));
        assert!(!looks_like_text(&[0xff, 0xfe, b'a']));
    }

    #[test]
    fn test_detect_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cat.txt");
        std::fs::write(&path, JPEG_BYTES).unwrap();

        let detected = MagicSniffer::new().detect(&path, None).unwrap();
        assert_eq!(detected, "image/jpeg");
    }

    #[test]
    fn test_detect_missing_file_is_classification_error() {
        let err = MagicSniffer::new()
            .detect(Path::new("/nonexistent/file.bin"), None)
            .unwrap_err();
        assert!(matches!(err, SiftError::Classification { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_signature_db_takes_precedence() {
        let db = SignatureDb::parse(
            "# custom\n\n0 ffd8ff image/x-custom-jpeg\n0x04 abcd application/x-test\n",
            Path::new("magic.db"),
        )
        .unwrap();
        assert_eq!(db.rules().len(), 2);
        assert_eq!(
            MagicSniffer::detect_bytes(JPEG_BYTES, Some(&db)),
            "image/x-custom-jpeg"
        );
        assert_eq!(
            db.lookup(&[0, 0, 0, 0, 0xab, 0xcd]),
            Some("application/x-test")
        );
        assert_eq!(db.lookup(&[0xab]), None);
    }

    #[test]
    fn test_signature_db_errors_name_the_line() {
        for (text, line) in [
            ("0 zz image/x\n", 1),
            ("# ok\n0 abc image/x\n", 2),
            ("0 ab\n", 1),
            ("x ab image/x\n", 1),
            ("0 ab nope\n", 1),
            ("0 ab image/x extra\n", 1),
        ] {
            let err = SignatureDb::parse(text, Path::new("magic.db")).unwrap_err();
            assert!(
                matches!(err, SiftError::SignatureDb { line: l, .. } if l == line),
                "{text:?} -> {err}"
            );
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn test_signature_db_load_missing() {
        let err = SignatureDb::load(Path::new("/nonexistent/magic.db")).unwrap_err();
        assert!(matches!(err, SiftError::SignatureDb { line: 0, .. }));
    }
}
