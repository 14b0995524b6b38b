//! Minimal stderr logger for library diagnostics.

use console::Term;
use console::style;
use log::Level;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;

struct StderrLogger {
    level: LevelFilter,
    term: Term,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("zipsift")
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let label = match record.level() {
            Level::Error => style("error").red().bold(),
            Level::Warn => style("warn").yellow().bold(),
            Level::Info => style("info").green(),
            Level::Debug => style("debug").cyan(),
            Level::Trace => style("trace").dim(),
        };
        let _ = self.term.write_line(&format!("{label}: {}", record.args()));
    }

    fn flush(&self) {
        let _ = self.term.flush();
    }
}

/// Maps the global verbosity flags to a level filter.
pub const fn level_for(verbose: bool, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Installs the logger. With JSON output only errors are logged unless
/// `verbose` is set.
pub fn init(verbose: bool, quiet: bool, json: bool) {
    let level = if json && !verbose {
        LevelFilter::Error
    } else {
        level_for(verbose, quiet)
    };
    let logger = StderrLogger {
        level,
        term: Term::stderr(),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
}
