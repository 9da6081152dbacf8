//! Console implementations of the batch executor seams.

use std::io::Write;

use anyhow::{Context, Result};

use chansync_queue::{Confirmer, Sink};

/// Writes progress and summary lines to stdout.
///
/// These lines are the feature here, not diagnostics, so they bypass tracing.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    #[allow(clippy::print_stdout)]
    fn line(&mut self, text: &str) {
        println!("{text}");
    }
}

/// Reads a y/N answer from stdin; `--yes` skips the prompt.
#[derive(Debug)]
pub struct ConsoleConfirmer {
    /// Answer affirmatively without prompting.
    assume_yes: bool,
}

impl ConsoleConfirmer {
    /// Creates a confirmer; `assume_yes` bypasses the prompt.
    #[must_use]
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirmer for ConsoleConfirmer {
    #[allow(clippy::print_stdout)]
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        print!("{prompt} [y/N] ");
        std::io::stdout().flush().context("failed to flush stdout")?;
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}
