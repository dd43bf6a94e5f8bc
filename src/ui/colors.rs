//! 24-bit RGB color theme for terminal output.

use owo_colors::{OwoColorize, Rgb};

/// Color palette used by panels, warnings and spinners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Success state color - green (34, 197, 94)
    pub success: Rgb,
    /// Error state color - red (239, 68, 68)
    pub error: Rgb,
    /// Warning state color - yellow (234, 179, 8)
    pub warning: Rgb,
    /// Informational color - blue (59, 130, 246)
    pub info: Rgb,
    /// Muted/secondary text color - gray (107, 114, 128)
    pub muted: Rgb,
    /// Highlight for paths and names - cyan (34, 211, 238)
    pub accent: Rgb,
    /// When false every `paint` call returns the text unchanged.
    pub enabled: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Rgb(34, 197, 94),
            error: Rgb(239, 68, 68),
            warning: Rgb(234, 179, 8),
            info: Rgb(59, 130, 246),
            muted: Rgb(107, 114, 128),
            accent: Rgb(34, 211, 238),
            enabled: true,
        }
    }
}

impl Theme {
    /// Theme with colors on unless `NO_COLOR` is set.
    pub fn detect() -> Self {
        Self::default().with_colors(std::env::var_os("NO_COLOR").is_none())
    }

    /// Theme that never emits escape codes.
    pub fn plain() -> Self {
        Self::default().with_colors(false)
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn paint(&self, text: &str, color: Rgb) -> String {
        if self.enabled {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn paint_bold(&self, text: &str, color: Rgb) -> String {
        if self.enabled {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}
