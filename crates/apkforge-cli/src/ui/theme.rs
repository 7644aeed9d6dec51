//! UI Theme - Design system constants
//!
//! Colors and icons used by every line apkforge prints.

use apkforge_schema::StageOutcome;
use crossterm::style::Color;

#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub colors: ColorScheme,
    pub icons: Icons,
    /// Width the stage title is padded to in `==> title` lines
    pub phase_padding: usize,
}

impl Theme {
    pub fn new() -> Self {
        Self {
            phase_padding: 28,
            ..Self::default()
        }
    }

    pub fn outcome_color(&self, outcome: StageOutcome) -> Color {
        match outcome {
            StageOutcome::Success => self.colors.success,
            StageOutcome::Skipped => self.colors.warning,
            StageOutcome::Failed => self.colors.error,
        }
    }

    pub fn outcome_icon(&self, outcome: StageOutcome) -> &'static str {
        match outcome {
            StageOutcome::Success => self.icons.success,
            StageOutcome::Skipped => self.icons.skipped,
            StageOutcome::Failed => self.icons.error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Stage titles
    pub header: Color,
    /// Paths, sizes and other secondary info
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    /// In-progress downloads
    pub active: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Cyan,
            secondary: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            active: Color::Blue,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Icons {
    /// Stage in progress (●)
    pub active: &'static str,
    pub success: &'static str,
    /// Soft outcome (○)
    pub skipped: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            active: "●",
            success: "✓",
            skipped: "○",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}
