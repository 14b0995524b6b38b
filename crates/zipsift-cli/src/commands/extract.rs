//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::cli::OnConflict;
use crate::error::add_archive_context;
use crate::error::convert_sift_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use std::env;
use std::path::Path;
use std::path::PathBuf;
use zipsift_core::CancelFlag;
use zipsift_core::ExtractConfig;
use zipsift_core::ExtractionRun;
use zipsift_core::MediaTypeRegistry;
use zipsift_core::NameCollision;
use zipsift_core::NoopProgress;
use zipsift_core::ScanStrategy;
use zipsift_core::SelectionSpec;
use zipsift_core::SuffixValue;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, show_progress: bool) -> Result<()> {
    let cwd = env::current_dir().context("failed to get current directory")?;
    let archive = cwd.join(&args.archive);
    let output_dir = args
        .output_dir
        .as_ref()
        .map_or_else(|| cwd.clone(), |dir| cwd.join(dir));

    if args.on_conflict != OnConflict::Suffix
        && (args.suffix_value.is_some() || args.separator.is_some())
    {
        formatter.format_warning("--suffix-value and --separator only apply with --on-conflict suffix");
    }

    let registry = build_registry(args)?;
    let config = build_config(args, &cwd, &archive, output_dir);

    let cancel = CancelFlag::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || handler.cancel()).context("failed to install Ctrl-C handler")?;

    let spec = selection(args);
    let mut run = ExtractionRun::new(config, &registry).with_cancel_flag(cancel);
    let outcome = if show_progress && CliProgress::should_show() {
        let mut progress = CliProgress::new();
        add_archive_context(run.execute_path(&archive, &spec, &mut progress), &args.archive)?
    } else {
        add_archive_context(
            run.execute_path(&archive, &spec, &mut NoopProgress),
            &args.archive,
        )?
    };

    formatter.format_extraction_result(&outcome)?;

    if outcome.cancelled {
        bail!("extraction of '{}' was cancelled", args.archive.display());
    }
    Ok(())
}

fn build_registry(args: &ExtractArgs) -> Result<MediaTypeRegistry> {
    let mut registry = MediaTypeRegistry::new();
    for (extension, media_types) in &args.rules {
        registry
            .register(extension, media_types.iter().cloned())
            .map_err(|e| convert_sift_error(e, &args.archive))?;
    }
    registry.set_validation(!args.no_validate);
    if let Some(db) = &args.signature_db {
        registry
            .set_signature_db(db)
            .map_err(|e| convert_sift_error(e, &args.archive))?;
    }
    Ok(registry)
}

fn build_config(args: &ExtractArgs, cwd: &Path, archive: &Path, output_dir: PathBuf) -> ExtractConfig {
    // Private staging directories are created next to the archive.
    let base = archive.parent().map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);

    let mut config = ExtractConfig::default()
        .with_base_path(base)
        .with_destination(output_dir)
        .with_remove_staging(!args.keep_staging)
        .with_remove_archive(args.remove_archive)
        .with_dir_mode(args.dir_mode)
        .with_validation_workers(usize::from(args.workers))
        .with_keep_empty_directories(args.keep_empty_dirs)
        .with_preserve_structure(!args.flatten);

    if args.contiguous {
        config = config.with_scan(ScanStrategy::Contiguous);
    }
    if let Some(dir) = &args.staging_dir {
        config = config.with_staging_dir(cwd.join(dir));
    }

    match args.on_conflict {
        OnConflict::Skip => config.with_collision(NameCollision::Skip),
        OnConflict::Overwrite => config.with_collision(NameCollision::Overwrite),
        OnConflict::Suffix => {
            let value = args
                .suffix_value
                .clone()
                .map_or(SuffixValue::Timestamp, SuffixValue::Fixed);
            config.with_suffix(value, args.separator.as_deref())
        }
    }
}

fn selection(args: &ExtractArgs) -> SelectionSpec {
    if !args.names.is_empty() {
        if args.greedy {
            SelectionSpec::greedy_names(&args.names)
        } else {
            SelectionSpec::names(&args.names)
        }
    } else if !args.prefixes.is_empty() {
        SelectionSpec::prefixes(&args.prefixes)
    } else if args.all {
        SelectionSpec::All
    } else {
        SelectionSpec::ByExtension
    }
}
