//! Staged, content-validated extraction of ZIP archives.
//!
//! `zipsift-core` extracts a selected subset of a ZIP archive into a
//! destination directory, keeping only files whose *sniffed* media type is
//! whitelisted for their extension. Entries are never written to the
//! destination directly: they are materialized in a private staging area,
//! classified by content, and only then relocated.
//!
//! The pipeline is:
//!
//! 1. [`SelectionPlanner`] resolves a [`SelectionSpec`] against the
//!    [`ArchiveIndex`]
//! 2. [`StagingArea`] extracts the plan through an [`ArchiveReader`]
//! 3. [`ValidationGate`] sniffs each staged file and consults the
//!    [`MediaTypeRegistry`]
//! 4. [`Relocator`] places accepted files according to the
//!    [`PlacementPolicy`]
//!
//! [`ExtractionRun`] drives the stages and always finalizes: the archive is
//! closed and temporary state removed on every exit path.
//!
//! # Examples
//!
//! ```no_run
//! use zipsift_core::MediaTypeRegistry;
//! use zipsift_core::SelectionSpec;
//! use zipsift_core::extract_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = MediaTypeRegistry::new();
//! registry.register("jpg", ["image/jpeg"])?;
//! registry.register("txt", ["text/plain"])?;
//!
//! let outcome = extract_archive("upload.zip", "/srv/files", &registry, &SelectionSpec::ByExtension)?;
//! println!("Placed {} files, rejected {}", outcome.accepted_count(), outcome.rejections.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod gate;
pub mod index;
pub mod plan;
pub mod registry;
pub mod relocate;
pub mod report;
pub mod run;
pub mod sniff;
pub mod staging;
#[doc(hidden)]
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use api::ExtractionBuilder;
pub use api::extract_archive;
pub use archive::ArchiveReader;
pub use archive::ZipReader;
pub use config::ExtractConfig;
pub use config::NameCollision;
pub use config::PlacementPolicy;
pub use config::SuffixValue;
pub use error::ArchiveErrorCode;
pub use error::Result;
pub use error::SiftError;
pub use gate::ValidationGate;
pub use gate::Verdict;
pub use index::ArchiveIndex;
pub use index::ScanStrategy;
pub use plan::Plan;
pub use plan::SelectionPlanner;
pub use plan::SelectionSpec;
pub use registry::MediaTypeRegistry;
pub use relocate::Relocator;
pub use relocate::Transfer;
pub use report::EntryFailure;
pub use report::ExtractionOutcome;
pub use report::NoopProgress;
pub use report::OutcomeStatus;
pub use report::ProgressCallback;
pub use report::Rejection;
pub use report::RelocationResult;
pub use report::Stage;
pub use run::CancelFlag;
pub use run::ExtractionRun;
pub use run::RunState;
pub use sniff::ContentSniffer;
pub use sniff::MagicSniffer;
pub use sniff::SignatureDb;
pub use staging::StagedEntry;
pub use staging::StagingArea;
