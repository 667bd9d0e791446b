//! Message input field rendering.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::{message_input_state::MessageInputState, shell_state::ActivePane};

use super::styles;

/// Placeholder text shown when the input is not focused and empty.
const PLACEHOLDER_TEXT: &str = "Press 'i' to type a message...";

/// Prompt symbol shown before the first input line.
const PROMPT_SYMBOL: &str = "> ";
const CONTINUATION_SYMBOL: &str = "  ";

/// Tallest the input box grows, borders included.
pub const MAX_INPUT_HEIGHT: u16 = 8;

/// Height of the input box for the current text, borders included.
pub fn input_height(input_state: &MessageInputState) -> u16 {
    let lines = input_state.text().split('\n').count().max(1);
    (lines as u16).saturating_add(2).min(MAX_INPUT_HEIGHT)
}

/// Renders the message input field.
pub fn render_message_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input_state: &MessageInputState,
    active_pane: ActivePane,
) {
    let is_focused = active_pane == ActivePane::MessageInput;

    let border_style = if is_focused {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };

    let lines = build_input_lines(input_state, is_focused);
    let (cursor_row, cursor_col) = cursor_row_col(input_state);
    let visible_rows = area.height.saturating_sub(2) as usize;
    let scroll = cursor_row.saturating_sub(visible_rows.saturating_sub(1));

    let paragraph = Paragraph::new(lines)
        .scroll((scroll.min(u16::MAX as usize) as u16, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        );

    frame.render_widget(paragraph, area);

    if is_focused {
        // Saturating arithmetic keeps very long inputs from overflowing.
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(PROMPT_SYMBOL.len() as u16)
            .saturating_add(cursor_col.min(u16::MAX as usize) as u16);
        let cursor_y = area
            .y
            .saturating_add(1)
            .saturating_add((cursor_row - scroll).min(u16::MAX as usize) as u16);
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

/// Builds the lines shown in the input field.
fn build_input_lines(input_state: &MessageInputState, is_focused: bool) -> Vec<Line<'static>> {
    let prompt_style = styles::input_prompt_style();

    if input_state.is_empty() && !is_focused {
        return vec![Line::from(vec![
            Span::styled(PROMPT_SYMBOL.to_owned(), prompt_style),
            Span::styled(
                PLACEHOLDER_TEXT.to_owned(),
                styles::input_placeholder_style(),
            ),
        ])];
    }

    input_state
        .text()
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            let prefix = if index == 0 {
                PROMPT_SYMBOL
            } else {
                CONTINUATION_SYMBOL
            };
            Line::from(vec![
                Span::styled(prefix.to_owned(), prompt_style),
                Span::styled(line.to_owned(), styles::input_text_style()),
            ])
        })
        .collect()
}

/// Returns the cursor's line index and display column within that line.
fn cursor_row_col(input_state: &MessageInputState) -> (usize, usize) {
    let before: String = input_state
        .text()
        .chars()
        .take(input_state.cursor_position())
        .collect();
    let row = before.matches('\n').count();
    let current_line = before.rsplit('\n').next().unwrap_or_default();
    (row, current_line.width())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn typed(text: &str) -> MessageInputState {
        let mut state = MessageInputState::default();
        for ch in text.chars() {
            if ch == '\n' {
                state.insert_newline();
            } else {
                state.insert_char(ch);
            }
        }
        state
    }

    #[test]
    fn shows_placeholder_when_empty_and_unfocused() {
        let lines = build_input_lines(&MessageInputState::default(), false);

        let text = text_of(&lines);
        assert_eq!(text.len(), 1);
        assert!(text[0].contains(PLACEHOLDER_TEXT));
        assert!(text[0].starts_with(PROMPT_SYMBOL));
    }

    #[test]
    fn shows_empty_prompt_when_focused_and_empty() {
        let lines = build_input_lines(&MessageInputState::default(), true);

        assert_eq!(text_of(&lines), vec![PROMPT_SYMBOL.to_owned()]);
    }

    #[test]
    fn shows_text_when_has_content() {
        let lines = build_input_lines(&typed("Hi"), false);

        assert_eq!(text_of(&lines), vec!["> Hi".to_owned()]);
    }

    #[test]
    fn multi_line_text_gets_continuation_prefix() {
        let lines = build_input_lines(&typed("first\nsecond"), true);

        assert_eq!(
            text_of(&lines),
            vec!["> first".to_owned(), "  second".to_owned()]
        );
    }

    #[test]
    fn cursor_tracks_line_and_column() {
        let state = typed("ab\n日本");

        assert_eq!(cursor_row_col(&state), (1, 4));
    }

    #[test]
    fn input_height_grows_with_lines_up_to_limit() {
        assert_eq!(input_height(&MessageInputState::default()), 3);
        assert_eq!(input_height(&typed("a\nb")), 4);
        assert_eq!(input_height(&typed(&"x\n".repeat(20))), MAX_INPUT_HEIGHT);
    }
}
