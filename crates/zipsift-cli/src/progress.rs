//! Progress bar implementation for extraction runs.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use std::fmt::Write;
use zipsift_core::ProgressCallback;
use zipsift_core::Stage;

/// CLI progress bar wrapper implementing `ProgressCallback`.
///
/// One bar is reused for every pipeline stage: its length and message are
/// reset when a stage starts. Cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Creates a new, empty progress bar.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        // Template: "Validating [████████░░░░] 42/100 entries (12s)"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:<11} [{bar:40.cyan/blue}] {pos}/{len} entries ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.eta())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );

        Self { bar }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stdout().is_term()
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_stage_start(&mut self, stage: Stage, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message(stage_label(stage));
    }

    fn on_entry_start(&mut self, _entry: &str, _total: usize, _current: usize) {}

    fn on_entry_complete(&mut self, _entry: &str) {
        self.bar.inc(1);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

const fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Planning => "Planning",
        Stage::Staging => "Staging",
        Stage::Validation => "Validating",
        Stage::Relocation => "Placing",
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
