//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use zipsift_core::ArchiveIndex;
use zipsift_core::ArchiveReader;
use zipsift_core::ZipReader;
use zipsift_core::types::Entry;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let mut reader = add_archive_context(ZipReader::open(&args.archive), &args.archive)?;
    let index = add_archive_context(ArchiveIndex::load(&mut reader), &args.archive)?;
    if let Err(err) = reader.close() {
        log::warn!("failed to close archive: {err}");
    }

    let entries: Vec<&Entry> = match &args.prefix {
        Some(prefix) => index.entries_under_prefix(prefix).collect(),
        None => index.entries().iter().collect(),
    };

    if args.long {
        formatter.format_listing_long(&entries, args.human_readable)?;
    } else {
        formatter.format_listing_short(&entries)?;
    }

    Ok(())
}
