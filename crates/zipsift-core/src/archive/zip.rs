//! ZIP archive reader backed by the `zip` crate.

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use ::zip::result::ZipError;

use super::ArchiveReader;
use crate::ArchiveErrorCode;
use crate::Result;
use crate::SiftError;
use crate::types::Entry;
use crate::types::EntryKind;
use crate::types::SafeEntryName;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

type Handle = ::zip::ZipArchive<BufReader<File>>;

/// Reader for a ZIP archive on disk.
///
/// The file handle is held until [`ArchiveReader::close`] is called or the
/// reader is dropped.
///
/// # Examples
///
/// ```no_run
/// use zipsift_core::archive::ArchiveReader;
/// use zipsift_core::archive::ZipReader;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let mut reader = ZipReader::open("bundle.zip")?;
/// for entry in reader.list_entries()? {
///     println!("{} ({} bytes)", entry.name(), entry.size());
/// }
/// reader.close()?;
/// # Ok(())
/// # }
/// ```
pub struct ZipReader {
    path: PathBuf,
    handle: Option<Handle>,
}

impl ZipReader {
    /// Opens the archive at `path` and reads its central directory.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::ArchiveOpen` if the file cannot be opened or is
    /// not a readable ZIP archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(|e| SiftError::ArchiveOpen {
            path: path.clone(),
            code: ArchiveErrorCode::Open,
            detail: e.to_string(),
        })?;

        let handle = Handle::new(BufReader::new(file)).map_err(|e| SiftError::ArchiveOpen {
            path: path.clone(),
            code: open_code(&e),
            detail: e.to_string(),
        })?;

        log::debug!("opened {} ({} entries)", path.display(), handle.len());
        Ok(Self {
            path,
            handle: Some(handle),
        })
    }

    /// Returns the archive path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&mut self, entry: &str) -> Result<&mut Handle> {
        self.handle.as_mut().ok_or_else(|| {
            read_error(
                entry,
                ArchiveErrorCode::Closed,
                format!("{} is closed", self.path.display()),
            )
        })
    }
}

impl std::fmt::Debug for ZipReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipReader")
            .field("path", &self.path)
            .field("closed", &self.handle.is_none())
            .finish()
    }
}

impl ArchiveReader for ZipReader {
    fn list_entries(&mut self) -> Result<Vec<Entry>> {
        let handle = self.handle("*")?;
        let mut entries = Vec::with_capacity(handle.len());

        for index in 0..handle.len() {
            // Raw access skips decompressor setup so entries with an
            // unsupported method are still listed.
            let file = handle
                .by_index_raw(index)
                .map_err(|e| read_error(&format!("#{index}"), entry_code(&e), e))?;

            let kind = if file.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let size = if file.is_dir() { 0 } else { file.size() };
            entries.push(Entry::new(file.name(), kind, size));
        }

        Ok(entries)
    }

    fn extract_entry(&mut self, name: &SafeEntryName, dest: &Path) -> Result<PathBuf> {
        let raw = name.as_str();
        let output = dest.join(name.relative_path());
        let handle = self.handle(raw)?;

        let mut file = handle
            .by_name(raw)
            .map_err(|e| read_error(raw, entry_code(&e), e))?;

        if file.is_dir() || name.is_directory_marker() {
            fs::create_dir_all(&output)
                .map_err(|e| read_error(raw, ArchiveErrorCode::Write, e))?;
            return Ok(output);
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| read_error(raw, ArchiveErrorCode::Write, e))?;
        }

        match copy_entry(&mut file, &output, raw) {
            Ok(bytes) => {
                log::trace!("staged {raw} ({bytes} bytes)");
                Ok(output)
            }
            Err(err) => {
                remove_partial(&output);
                Err(err)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.handle.take().is_some() {
            log::debug!("closed {}", self.path.display());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

fn copy_entry<R: Read>(reader: &mut R, output: &Path, entry: &str) -> Result<u64> {
    let file = File::create(output).map_err(|e| read_error(entry, ArchiveErrorCode::Write, e))?;
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, file);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(entry, read_code(&e), e)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| read_error(entry, ArchiveErrorCode::Write, e))?;
        total += read as u64;
    }

    writer
        .flush()
        .map_err(|e| read_error(entry, ArchiveErrorCode::Write, e))?;
    Ok(total)
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            log::warn!("failed to remove partial file {}: {e}", path.display());
        }
    }
}

fn read_error(entry: &str, code: ArchiveErrorCode, detail: impl ToString) -> SiftError {
    SiftError::ArchiveRead {
        entry: entry.to_string(),
        code,
        detail: detail.to_string(),
    }
}

fn open_code(err: &ZipError) -> ArchiveErrorCode {
    match err {
        ZipError::Io(e) if e.kind() == ErrorKind::UnexpectedEof => ArchiveErrorCode::NotAnArchive,
        ZipError::Io(e) => read_code(e),
        ZipError::InvalidArchive(_) => {
            let message = err.to_string().to_ascii_lowercase();
            if ["central directory", "eocd", "header", "signature"]
                .iter()
                .any(|needle| message.contains(needle))
            {
                ArchiveErrorCode::NotAnArchive
            } else {
                ArchiveErrorCode::Inconsistent
            }
        }
        _ => entry_code(err),
    }
}

fn entry_code(err: &ZipError) -> ArchiveErrorCode {
    match err {
        ZipError::FileNotFound => ArchiveErrorCode::NoSuchEntry,
        ZipError::Io(e) => read_code(e),
        ZipError::UnsupportedArchive(_) => {
            let message = err.to_string().to_ascii_lowercase();
            if message.contains("multi") || message.contains("disk") {
                ArchiveErrorCode::MultiVolume
            } else {
                ArchiveErrorCode::UnsupportedCompression
            }
        }
        _ => ArchiveErrorCode::Inconsistent,
    }
}

fn read_code(err: &std::io::Error) -> ArchiveErrorCode {
    let message = err.to_string().to_ascii_lowercase();
    if message.contains("checksum") || message.contains("crc") {
        ArchiveErrorCode::Crc
    } else if message.contains("seek") {
        ArchiveErrorCode::Seek
    } else {
        ArchiveErrorCode::Read
    }
}
