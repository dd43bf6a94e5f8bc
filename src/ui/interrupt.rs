//! Ctrl+C handling for generation runs.
//!
//! The handler only raises a flag; the workflow checks it between stages and
//! turns an interruption into a fatal, cleaned-up run.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ui::colors::Theme;

/// Shared cancellation flag set by Ctrl+C.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandler {
    cancel_flag: Arc<AtomicBool>,
}

impl InterruptHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// Install the process-wide Ctrl+C handler.
    ///
    /// Can only succeed once per process.
    pub fn install_handler(&self) -> io::Result<()> {
        let cancel_flag = Arc::clone(&self.cancel_flag);
        ctrlc::set_handler(move || {
            cancel_flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| io::Error::other(e.to_string()))
    }

    /// Raise the flag without a signal.
    pub fn trigger_interrupt(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// One-line notice printed when an interruption is noticed.
    pub fn render_notice(&self, theme: &Theme, stage: &str) -> String {
        format!(
            "{} Interrupted during {}; cleaning up...\n",
            theme.paint_bold("⚠", theme.warning),
            stage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_interrupt() {
        let handler = InterruptHandler::new();
        assert!(!handler.is_interrupted());
        handler.trigger_interrupt();
        assert!(handler.is_interrupted());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let handler = InterruptHandler::new();
        let seen_by_workflow = handler.clone();
        handler.trigger_interrupt();
        assert!(seen_by_workflow.is_interrupted());
    }

    #[test]
    fn test_render_notice() {
        let notice = InterruptHandler::new().render_notice(&Theme::plain(), "generation");
        assert_eq!(notice, "⚠ Interrupted during generation; cleaning up...\n");
    }
}
