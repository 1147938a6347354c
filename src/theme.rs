//! Centralized theme and styling for the full-screen dialog backend
//!
//! All colors and styles used by `dialog::tui` are defined here rather than
//! hardcoded in the renderer.

use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

/// Core color palette for dialogs
pub struct Colors;

impl Colors {
    /// Screen background around the dialog window
    pub const BG_SCREEN: Color = Color::Blue;

    /// Dialog window background
    pub const BG_DIALOG: Color = Color::Gray;

    /// Drop shadow under the dialog window
    pub const SHADOW: Color = Color::Black;

    /// Default dialog text
    pub const FG_DIALOG: Color = Color::Black;

    /// Dialog title
    pub const TITLE: Color = Color::Blue;

    /// Focused list row / button background
    pub const FOCUS_BG: Color = Color::Blue;

    /// Focused list row / button text
    pub const FOCUS_FG: Color = Color::White;

    /// Unfocused button background
    pub const BUTTON_BG: Color = Color::Cyan;

    /// Passed prerequisite check
    pub const SUCCESS: Color = Color::Green;

    /// Failed prerequisite check
    pub const ERROR: Color = Color::Red;
}

// =============================================================================
// PRE-BUILT STYLES
// =============================================================================

/// Pre-built styles for dialog elements
pub struct Styles;

impl Styles {
    /// Area outside the dialog
    pub fn screen() -> Style {
        Style::default().bg(Colors::BG_SCREEN)
    }

    /// Dialog body
    pub fn body() -> Style {
        Style::default().fg(Colors::FG_DIALOG).bg(Colors::BG_DIALOG)
    }

    /// Dialog shadow
    pub fn shadow() -> Style {
        Style::default().bg(Colors::SHADOW)
    }

    /// Dialog title
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::TITLE)
            .bg(Colors::BG_DIALOG)
            .add_modifier(Modifier::BOLD)
    }

    /// Row under the cursor
    pub fn focused_row() -> Style {
        Style::default()
            .fg(Colors::FOCUS_FG)
            .bg(Colors::FOCUS_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Focused button
    pub fn button_active() -> Style {
        Style::default()
            .fg(Colors::FOCUS_FG)
            .bg(Colors::FOCUS_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Other buttons
    pub fn button_inactive() -> Style {
        Style::default().fg(Colors::FG_DIALOG).bg(Colors::BUTTON_BG)
    }

    /// Editable text field
    pub fn input_field() -> Style {
        Style::default().fg(Colors::FOCUS_FG).bg(Colors::FOCUS_BG)
    }

    /// Check result style
    pub fn check_result(ok: bool) -> Style {
        let color = if ok { Colors::SUCCESS } else { Colors::ERROR };
        Style::default()
            .fg(color)
            .bg(Colors::BG_DIALOG)
            .add_modifier(Modifier::BOLD)
    }
}
