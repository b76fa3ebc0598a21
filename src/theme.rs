//! Colors and styles for the progress monitor
//!
//! All colors the monitor draws with are defined here rather than
//! hardcoded in the render functions.

use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

pub struct Colors;

impl Colors {
    /// Gauge/progress bar background
    pub const BG_GAUGE: Color = Color::Rgb(40, 40, 50);

    /// Default foreground text color
    pub const FG_PRIMARY: Color = Color::White;

    /// Secondary/muted text color
    pub const FG_SECONDARY: Color = Color::Gray;

    /// Borders, titles, highlights
    pub const PRIMARY: Color = Color::Cyan;

    pub const SUCCESS: Color = Color::Green;
    pub const ERROR: Color = Color::Red;

    /// Progress bar fill
    pub const PROGRESS: Color = Color::Green;

    // -------------------------------------------------------------------------
    // Stage list
    // -------------------------------------------------------------------------

    pub const STEP_ACTIVE: Color = Color::Yellow;
    pub const STEP_COMPLETE: Color = Color::Green;
    pub const STEP_PENDING: Color = Color::Gray;
    pub const STEP_FAILED: Color = Color::Red;
}

// =============================================================================
// STYLES
// =============================================================================

pub struct Styles;

impl Styles {
    /// Panel titles
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn progress() -> Style {
        Style::default()
            .fg(Colors::PROGRESS)
            .bg(Colors::BG_GAUGE)
    }

    /// Command echo lines in the log tail
    pub fn command() -> Style {
        Style::default().fg(Colors::FG_SECONDARY)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Colors::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Colors::SUCCESS)
    }
}

/// Status of one stage row in the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Complete,
    Failed,
}

impl StepStatus {
    pub fn style(self) -> Style {
        match self {
            Self::Failed => Style::default().fg(Colors::STEP_FAILED),
            Self::Complete => Style::default().fg(Colors::STEP_COMPLETE),
            Self::Active => Style::default()
                .fg(Colors::STEP_ACTIVE)
                .add_modifier(Modifier::BOLD),
            Self::Pending => Style::default().fg(Colors::STEP_PENDING),
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Pending => "[ ]",
            Self::Active => "[>]",
            Self::Complete => "[x]",
            Self::Failed => "[!]",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_styles_are_distinct() {
        let styles = [
            StepStatus::Pending.style(),
            StepStatus::Active.style(),
            StepStatus::Complete.style(),
            StepStatus::Failed.style(),
        ];
        for (i, a) in styles.iter().enumerate() {
            for b in &styles[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
