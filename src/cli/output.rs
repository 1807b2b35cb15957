//! Styled terminal output for gitsync
//!
//! Status lines, per-repository outcomes and pass summaries, all rendered
//! through `console` so colours switch off automatically when piped.

use console::{StyledObject, style};

use crate::sync::{PassSummary, SyncOutcome, SyncState};

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Warnings go to stderr and survive quiet mode
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Print a verbose step (only if verbose mode is enabled)
    pub fn verbose_step(&self, emoji: &str, message: &str) {
        if self.verbose && !self.quiet {
            println!("  {} {}", style(emoji).cyan(), style(message).dim());
        }
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn step(&self, step: &str) {
        if !self.quiet {
            println!("{} {}", style("❯").cyan(), step);
        }
    }

    /// One line per repository: icon, identity, state, message. Failures
    /// still print in quiet mode.
    pub fn outcome(&self, outcome: &SyncOutcome) {
        let failed = outcome.state.is_failure();
        if self.quiet && !failed {
            return;
        }

        let (icon, state) = state_style(outcome.state);
        let line = format!(
            "{} {:<32} {:<16} {}",
            icon,
            style(&outcome.identity).bold(),
            state,
            style(&outcome.message).dim()
        );
        if failed {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    pub fn summary(&self, summary: &PassSummary) {
        if self.quiet {
            return;
        }
        let text = summary.to_string();
        if summary.has_failures() {
            println!(
                "\n{} {} {}",
                style("✖").red().bold(),
                style(format!("{} of {} failed:", summary.failures(), summary.total())).red(),
                text
            );
        } else {
            println!("\n{} {}", style("✔").green().bold(), text);
        }
    }
}

fn state_style(state: SyncState) -> (StyledObject<&'static str>, StyledObject<&'static str>) {
    let name = state.as_str();
    match state {
        SyncState::UpToDate | SyncState::Updated | SyncState::Recovered => {
            (style("✔").green(), style(name).green())
        }
        SyncState::Behind | SyncState::Ahead | SyncState::Diverged => {
            (style("↻").yellow(), style(name).yellow())
        }
        SyncState::Skipped => (style("–").dim(), style(name).dim()),
        _ => (style("✖").red(), style(name).red().bold()),
    }
}
