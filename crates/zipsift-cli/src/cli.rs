//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zipsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract archive entries whose content matches their extension
    Extract(ExtractArgs),
    /// List archive contents without extraction
    List(ListArgs),
}

/// What to do when a target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnConflict {
    /// Keep the existing file and leave the entry out
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Place the entry under a suffixed name
    Suffix,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the ZIP archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Accepted media types for an extension, e.g. `jpg=image/jpeg`
    /// (repeatable; several types separated by commas)
    #[arg(short, long = "rule", value_name = "EXT=TYPE[,TYPE]", value_parser = parse_rule)]
    pub rules: Vec<(String, Vec<String>)>,

    /// Accept every file without sniffing its content
    #[arg(long)]
    pub no_validate: bool,

    /// Custom signature database consulted before the built-in one
    #[arg(long, value_name = "FILE")]
    pub signature_db: Option<PathBuf>,

    /// Extract these entry names (repeatable)
    #[arg(short, long = "name", value_name = "NAME", conflicts_with_all = ["prefixes", "all"])]
    pub names: Vec<String>,

    /// Match --name against basenames anywhere in the archive
    #[arg(short, long, requires = "names")]
    pub greedy: bool,

    /// Extract everything below these directories (repeatable)
    #[arg(short, long = "prefix", value_name = "DIR", conflicts_with = "all")]
    pub prefixes: Vec<String>,

    /// Extract every entry, not only those with registered extensions
    #[arg(short, long)]
    pub all: bool,

    /// Place every file directly in the output directory
    #[arg(long)]
    pub flatten: bool,

    /// Conflict handling for existing files
    #[arg(long, value_enum, default_value_t = OnConflict::Skip)]
    pub on_conflict: OnConflict,

    /// Fixed suffix token (default: a microsecond timestamp)
    #[arg(long, value_name = "VALUE")]
    pub suffix_value: Option<String>,

    /// Separator between file stem and suffix
    #[arg(long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Staging directory (default: a private directory next to the archive)
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Keep the staging directory after the run
    #[arg(long)]
    pub keep_staging: bool,

    /// Delete the archive after the run
    #[arg(long)]
    pub remove_archive: bool,

    /// Keep directory entries, including empty ones
    #[arg(long)]
    pub keep_empty_dirs: bool,

    /// Stop prefix scans at the first non-matching entry (sorted archives)
    #[arg(long)]
    pub contiguous: bool,

    /// Number of threads validating staged files
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Mode for directories created in the output directory (octal)
    #[arg(long, default_value = "755", value_parser = parse_mode)]
    pub dir_mode: u32,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the ZIP archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Show detailed entry information
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,

    /// Only list entries below this directory
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<String>,
}

/// Parses `ext=type[,type...]`.
fn parse_rule(s: &str) -> Result<(String, Vec<String>), String> {
    let (extension, types) = s
        .split_once('=')
        .ok_or_else(|| format!("expected EXT=TYPE, got {s:?}"))?;
    let extension = extension.trim().trim_start_matches('.');
    if extension.is_empty() {
        return Err(format!("missing extension in {s:?}"));
    }

    let types: Vec<String> = types
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if types.is_empty() {
        return Err(format!("missing media type in {s:?}"));
    }
    if let Some(bad) = types.iter().find(|t| !t.contains('/')) {
        return Err(format!("invalid media type: {bad}"));
    }

    Ok((extension.to_string(), types))
}

/// Parses an octal permission mode such as `755` or `0o750`.
fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| format!("invalid mode: {s}"))
}
