//! Type-safe wrappers used throughout the extraction pipeline.
//!
//! Entry names and destination directories are validated upon construction
//! and cannot be created from raw strings or paths without going through
//! validation.

pub mod dest_dir;
pub mod entry;
pub mod entry_name;

pub use dest_dir::DestDir;
pub use entry::Entry;
pub use entry::EntryKind;
pub use entry_name::SafeEntryName;
