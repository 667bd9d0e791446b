//! Style definitions for the UI components.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::{attestation::CheckOutcome, events::ConnectivityStatus, toast::ToastLevel};

// =============================================================================
// Panels
// =============================================================================

pub fn active_panel_border_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn inactive_panel_border_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn selection_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
}

// =============================================================================
// Chat list styles
// =============================================================================

/// Style for chat title (bold, bright).
pub fn chat_name_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn archived_chat_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC)
}

/// Style for section headers like "-- Pinned --".
pub fn section_header_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn timestamp_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn chat_marker_style() -> Style {
    Style::default().fg(Color::Yellow)
}

pub fn tag_style() -> Style {
    Style::default().fg(Color::Magenta)
}

// =============================================================================
// Message list styles
// =============================================================================

pub fn user_sender_style() -> Style {
    Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD)
}

pub fn assistant_sender_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn message_time_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn message_text_style() -> Style {
    Style::default().fg(Color::White)
}

/// Status, branch position and other message metadata.
pub fn message_meta_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn message_error_style() -> Style {
    Style::default().fg(Color::Red)
}

pub fn date_separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

// =============================================================================
// Markdown
// =============================================================================

pub fn heading_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub fn inline_code_style() -> Style {
    Style::default().fg(Color::LightRed)
}

pub fn code_block_style() -> Style {
    Style::default().fg(Color::LightYellow)
}

pub fn code_fence_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn math_style() -> Style {
    Style::default()
        .fg(Color::LightMagenta)
        .add_modifier(Modifier::ITALIC)
}

pub fn link_style() -> Style {
    Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED)
}

pub fn quote_style() -> Style {
    Style::default().fg(Color::Gray)
}

// =============================================================================
// Input
// =============================================================================

pub fn input_prompt_style() -> Style {
    Style::default().fg(Color::Cyan)
}

pub fn input_text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn input_placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

// =============================================================================
// Status line, toasts, attestation
// =============================================================================

pub fn toast_style(level: ToastLevel) -> Style {
    let color = match level {
        ToastLevel::Info => Color::Cyan,
        ToastLevel::Success => Color::Green,
        ToastLevel::Error => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn connectivity_style(status: ConnectivityStatus) -> Style {
    let color = match status {
        ConnectivityStatus::Connected => Color::Green,
        ConnectivityStatus::Connecting => Color::Yellow,
        ConnectivityStatus::Disconnected => Color::DarkGray,
        ConnectivityStatus::Error => Color::Red,
    };
    Style::default().fg(color)
}

pub fn hint_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn check_style(outcome: &CheckOutcome) -> Style {
    match outcome {
        CheckOutcome::Passed => Style::default().fg(Color::Green),
        CheckOutcome::Failed(_) => Style::default().fg(Color::Red),
        CheckOutcome::Skipped(_) => Style::default().fg(Color::Yellow),
    }
}

pub fn field_label_style() -> Style {
    Style::default().fg(Color::Gray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_name_style_is_bold_white() {
        let style = chat_name_style();
        assert_eq!(style.fg, Some(Color::White));
        assert!(style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn error_toast_is_red() {
        assert_eq!(toast_style(ToastLevel::Error).fg, Some(Color::Red));
        assert_eq!(toast_style(ToastLevel::Success).fg, Some(Color::Green));
    }

    #[test]
    fn check_styles_follow_outcome() {
        assert_eq!(check_style(&CheckOutcome::Passed).fg, Some(Color::Green));
        assert_eq!(
            check_style(&CheckOutcome::Failed("x".to_owned())).fg,
            Some(Color::Red)
        );
    }

    #[test]
    fn connected_channel_is_green() {
        assert_eq!(
            connectivity_style(ConnectivityStatus::Connected).fg,
            Some(Color::Green)
        );
    }
}
