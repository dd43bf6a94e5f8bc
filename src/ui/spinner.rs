//! Spinner shown while long-running steps such as tool probes execute.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::colors::Theme;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A spinner that draws to stderr, or nothing when hidden.
#[derive(Debug, Clone)]
pub struct StepSpinner {
    progress_bar: ProgressBar,
    theme: Theme,
}

impl StepSpinner {
    /// Starts a spinner unless `quiet` is set or stderr is not a terminal.
    pub fn start(message: impl Into<String>, theme: Theme, quiet: bool) -> Self {
        let visible = !quiet && std::io::stderr().is_terminal();
        let progress_bar = if visible {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::create_style(&theme));
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_message(message.into());
        Self {
            progress_bar,
            theme,
        }
    }

    fn create_style(theme: &Theme) -> ProgressStyle {
        let template = if theme.enabled {
            let rgb = theme.info;
            format!("{{spinner:.color({},{},{})}} {{msg}}", rgb.0, rgb.1, rgb.2)
        } else {
            "{spinner} {msg}".to_string()
        };
        let mut ticks: Vec<&str> = FRAMES.to_vec();
        // Final frame shown once finished.
        ticks.push("✓");
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&ticks)
    }

    pub fn finish_with_success(&self, message: impl Into<String>) {
        let styled = format!("{} {}", self.theme.paint("✓", self.theme.success), message.into());
        self.progress_bar.finish_with_message(styled);
    }

    pub fn finish_with_error(&self, message: impl Into<String>) {
        let styled = format!("{} {}", self.theme.paint("✗", self.theme.error), message.into());
        self.progress_bar.finish_with_message(styled);
    }

    pub fn finish_and_clear(&self) {
        self.progress_bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_spinner_is_hidden() {
        let spinner = StepSpinner::start("probing", Theme::plain(), true);
        assert!(spinner.progress_bar.is_hidden());
        spinner.finish_with_success("done");
    }
}
