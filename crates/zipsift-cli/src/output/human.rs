//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use zipsift_core::ExtractionOutcome;
use zipsift_core::OutcomeStatus;
use zipsift_core::types::Entry;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();

        for (count, c) in s.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }

        result.chars().rev().collect()
    }

    fn headline(status: OutcomeStatus) -> (&'static str, &'static str) {
        match status {
            OutcomeStatus::Complete => ("✓", "Extraction complete"),
            OutcomeStatus::Partial => ("⚠", "Extraction partially complete"),
            OutcomeStatus::AllRejected => ("⚠", "No files accepted"),
            OutcomeStatus::NothingMatched => ("•", "No entries matched the selection"),
            OutcomeStatus::Cancelled => ("✗", "Extraction cancelled"),
        }
    }

    fn write_headline(&self, status: OutcomeStatus) {
        let (symbol, text) = Self::headline(status);
        if self.use_colors {
            let symbol = match status {
                OutcomeStatus::Complete => style(symbol).green().bold(),
                OutcomeStatus::Cancelled => style(symbol).red().bold(),
                OutcomeStatus::NothingMatched => style(symbol).dim(),
                OutcomeStatus::Partial | OutcomeStatus::AllRejected => style(symbol).yellow().bold(),
            };
            let _ = self.term.write_line(&format!("{symbol} {text}"));
        } else {
            let _ = self.term.write_line(text);
        }
    }

    fn write_section(&self, title: &str) {
        let _ = self.term.write_line("");
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{}", style(title).yellow().bold()));
        } else {
            let _ = self.term.write_line(title);
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, outcome: &ExtractionOutcome) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_headline(outcome.status());

        let _ = self.term.write_line(&format!(
            "  Entries selected: {}",
            Self::format_number(outcome.planned)
        ));
        let _ = self.term.write_line(&format!(
            "  Files placed:     {}",
            Self::format_number(outcome.accepted_count())
        ));
        let _ = self.term.write_line(&format!(
            "  Rejected:         {}",
            Self::format_number(outcome.rejections.len())
        ));
        if !outcome.skipped.is_empty() {
            let _ = self.term.write_line(&format!(
                "  Skipped:          {}",
                Self::format_number(outcome.skipped.len())
            ));
        }
        if outcome.has_failures() {
            let _ = self.term.write_line(&format!(
                "  Failed:           {}",
                Self::format_number(outcome.failures.len())
            ));
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration:         {:?}", outcome.duration));
            for path in outcome.accepted_paths() {
                let _ = self.term.write_line(&format!("    {}", path.display()));
            }
        }

        if !outcome.rejections.is_empty() {
            self.write_section("Rejected:");
            for rejection in &outcome.rejections {
                let extension = rejection.extension.as_deref().unwrap_or("(none)");
                let _ = self.term.write_line(&format!(
                    "  - {}: content is {}, extension {extension}",
                    rejection.entry, rejection.media_type
                ));
            }
        }

        if self.verbose && !outcome.skipped.is_empty() {
            self.write_section("Skipped (target exists):");
            for entry in &outcome.skipped {
                let _ = self.term.write_line(&format!("  - {entry}"));
            }
        }

        if outcome.has_failures() {
            self.write_section("Failures:");
            for failure in &outcome.failures {
                let _ = self.term.write_line(&format!(
                    "  - {} ({}): {}",
                    failure.entry, failure.stage, failure.error
                ));
            }
        }

        if outcome.has_warnings() {
            self.write_section("Warnings:");
            for warning in &outcome.warnings {
                let _ = self.term.write_line(&format!("  - {warning}"));
            }
        }

        Ok(())
    }

    fn format_listing_short(&self, entries: &[&Entry]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for entry in entries {
            let _ = self.term.write_line(entry.name());
        }

        Ok(())
    }

    fn format_listing_long(&self, entries: &[&Entry], human_readable: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut files = 0;
        let mut total_size = 0;
        for entry in entries {
            let size_str = if human_readable {
                Self::format_size(entry.size())
            } else {
                entry.size().to_string()
            };
            let type_char = if entry.is_directory() { "d" } else { "-" };
            if entry.is_file() {
                files += 1;
                total_size += entry.size();
            }

            let _ = self
                .term
                .write_line(&format!("{type_char} {size_str:>10}  {}", entry.name()));
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} files, {}",
            Self::format_number(files),
            Self::format_size(total_size)
        ));

        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
