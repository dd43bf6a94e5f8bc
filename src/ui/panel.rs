//! Boxed diagnostic panels for reported errors.

use std::collections::BTreeMap;
use std::path::Path;

use owo_colors::Rgb;
use serde_json::Value;

use crate::error::{ErrorDescriptor, ErrorKind};
use crate::ui::colors::Theme;

/// Content of one error panel.
#[derive(Debug, Clone)]
pub struct PanelContent<'a> {
    pub descriptor: &'a ErrorDescriptor,
    /// The raw error text, shown when it says more than the descriptor.
    pub error_message: &'a str,
    pub details: &'a BTreeMap<String, Value>,
    /// Shown only in debug mode.
    pub debug: Option<DebugInfo<'a>>,
}

/// Debug-only footer of a panel.
#[derive(Debug, Clone, Copy)]
pub struct DebugInfo<'a> {
    pub kind: ErrorKind,
    pub log_path: Option<&'a Path>,
}

/// Renders error panels and warning lines.
#[derive(Debug, Clone)]
pub struct PanelRenderer {
    theme: Theme,
    width: usize,
}

impl Default for PanelRenderer {
    fn default() -> Self {
        Self::new(Theme::detect())
    }
}

impl PanelRenderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme, width: 64 }
    }

    /// Set the panel width, including borders.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(24);
        self
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Render the full panel: header, what happened, details, how to fix,
    /// and the debug footer when present.
    pub fn render_error(&self, content: &PanelContent<'_>) -> String {
        let descriptor = content.descriptor;
        let border = if descriptor.recoverable {
            self.theme.warning
        } else {
            self.theme.error
        };
        let inner = self.width - 2;
        let mut out = String::new();

        out.push_str(&self.theme.paint(&format!("╭{}╮", "─".repeat(inner)), border));
        out.push('\n');
        let icon = if descriptor.recoverable { "⚠" } else { "✗" };
        let header = format!("{} {}", icon, descriptor.message);
        for line in wrap(&header, inner - 2) {
            out.push_str(&self.row(&line, border, Some(border), true));
        }
        out.push_str(&self.theme.paint(&format!("├{}┤", "─".repeat(inner)), border));
        out.push('\n');

        out.push_str(&self.section("What happened", border));
        let happened = if content.error_message.is_empty()
            || content.error_message == descriptor.message
        {
            descriptor.message
        } else {
            content.error_message
        };
        for line in wrap(happened, inner - 4) {
            out.push_str(&self.row(&format!("  {}", line), border, None, false));
        }

        if !content.details.is_empty() {
            out.push_str(&self.blank(border));
            out.push_str(&self.section("Details", border));
            for (key, value) in content.details {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                // Multi-line values (stderr tails) keep only their last line.
                let value = value.lines().last().unwrap_or_default();
                for line in wrap(&format!("{}: {}", key, value), inner - 4) {
                    out.push_str(&self.row(&format!("  {}", line), border, Some(self.theme.muted), false));
                }
            }
        }

        out.push_str(&self.blank(border));
        out.push_str(&self.section("How to fix", border));
        for line in wrap(descriptor.solution, inner - 4) {
            out.push_str(&self.row(&format!("  {}", line), border, None, false));
        }
        for action in descriptor.user_actions {
            for line in wrap(&format!("• {}", action), inner - 4) {
                out.push_str(&self.row(&format!("  {}", line), border, None, false));
            }
        }

        if let Some(debug) = content.debug {
            out.push_str(&self.theme.paint(&format!("├{}┤", "─".repeat(inner)), border));
            out.push('\n');
            out.push_str(&self.row(
                &format!("kind: {}", debug.kind),
                border,
                Some(self.theme.muted),
                false,
            ));
            let log = debug
                .log_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no log file)".to_string());
            for line in wrap(&format!("log: {}", log), inner - 2) {
                out.push_str(&self.row(&line, border, Some(self.theme.muted), false));
            }
        }

        out.push_str(&self.theme.paint(&format!("╰{}╯", "─".repeat(inner)), border));
        out.push('\n');
        out
    }

    /// A single-line warning, e.g. for a skipped feature.
    pub fn render_warning(&self, message: &str) -> String {
        format!("{} {}\n", self.theme.paint("⚠", self.theme.warning), message)
    }

    /// A single-line informational note.
    pub fn render_note(&self, message: &str) -> String {
        format!("{} {}\n", self.theme.paint("→", self.theme.info), message)
    }

    fn section(&self, title: &str, border: Rgb) -> String {
        self.row(title, border, Some(self.theme.accent), true)
    }

    fn blank(&self, border: Rgb) -> String {
        self.row("", border, None, false)
    }

    fn row(&self, text: &str, border: Rgb, color: Option<Rgb>, bold: bool) -> String {
        let inner = self.width - 2;
        let padding = inner.saturating_sub(text.chars().count() + 1);
        let styled = match (color, bold) {
            (Some(c), true) => self.theme.paint_bold(text, c),
            (Some(c), false) => self.theme.paint(text, c),
            (None, _) => text.to_string(),
        };
        let edge = self.theme.paint("│", border);
        format!("{} {}{}{}\n", edge, styled, " ".repeat(padding), edge)
    }
}

/// Greedy word wrap on character counts. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
