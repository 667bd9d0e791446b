//! Message list rendering logic.
//!
//! Handles visual formatting of the displayed thread:
//! - Header line per message (time, sender, branch position, progress)
//! - Markdown body wrapped to the panel width
//! - Date separators between messages from different days
//! - Error, source and usage footers

use chrono::{Local, TimeZone};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
    widgets::ListItem,
};
use unicode_width::UnicodeWidthChar;

use crate::domain::{
    history::ChatHistory,
    message::{Message, Role},
};

use super::{markdown::render_markdown, styles};

const BODY_INDENT: &str = "  ";

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line (e.g., "——— 14 Feb 2026 ———").
    DateSeparator(String),
    Message(MessageView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub time: String,
    pub sender: String,
    pub role: Role,
    /// One-based position among sibling branches, when there is more than one.
    pub branch: Option<(usize, usize)>,
    pub progress: Option<String>,
    pub content: String,
    pub error: Option<String>,
    pub sources: Vec<String>,
    pub usage: Option<String>,
}

/// Builds a list of visual elements from the displayed thread.
pub fn build_message_list_elements(
    thread: &[&Message],
    history: &ChatHistory,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<chrono::NaiveDate> = None;

    for message in thread {
        let msg_date = timestamp_to_date(message.timestamp_s);
        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(format_date(msg_date)));
        }
        prev_date = Some(msg_date);

        elements.push(MessageListElement::Message(message_view(message, history)));
    }

    elements
}

fn message_view(message: &Message, history: &ChatHistory) -> MessageView {
    let sender = match message.role {
        Role::User => "You".to_owned(),
        Role::Assistant => message.model.clone().unwrap_or_else(|| "Assistant".to_owned()),
        Role::System => "System".to_owned(),
    };

    let progress = if message.is_streaming() {
        Some(
            message
                .latest_status()
                .filter(|status| !status.done)
                .map(|status| status.description.clone())
                .unwrap_or_else(|| "generating".to_owned()),
        )
    } else {
        None
    };

    MessageView {
        time: format_time(message.timestamp_s),
        sender,
        role: message.role,
        branch: history
            .sibling_position(&message.id)
            .filter(|(_, count)| *count > 1)
            .map(|(index, count)| (index + 1, count)),
        progress,
        content: message.display_content(),
        error: message.error.clone(),
        sources: message
            .sources
            .iter()
            .map(|source| match &source.url {
                Some(url) if *url != source.name => format!("{} <{url}>", source.name),
                _ => source.name.clone(),
            })
            .collect(),
        usage: message
            .usage
            .and_then(|usage| usage.total_tokens)
            .map(|total| format!("{total} tokens")),
    }
}

/// Converts a message index to the corresponding element index in the list.
///
/// Since the element list contains both messages and date separators,
/// this function finds the element index for a given message index.
/// Returns `None` if the message index is out of range.
pub fn message_index_to_element_index(
    elements: &[MessageListElement],
    message_index: usize,
) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, element)| matches!(element, MessageListElement::Message(_)))
        .nth(message_index)
        .map(|(element_index, _)| element_index)
}

/// Converts a list element to a ListItem, wrapping text to `width` columns.
pub fn element_to_list_item(element: &MessageListElement, width: usize) -> ListItem<'static> {
    match element {
        MessageListElement::DateSeparator(date) => date_separator_item(date),
        MessageListElement::Message(view) => ListItem::new(message_lines(view, width)),
    }
}

fn date_separator_item(date: &str) -> ListItem<'static> {
    let separator = format!("——— {} ———", date);
    let line = Line::from(vec![Span::styled(
        separator,
        styles::date_separator_style(),
    )])
    .alignment(Alignment::Center);
    ListItem::new(vec![Line::default(), line, Line::default()])
}

pub fn message_lines(view: &MessageView, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![header_line(view)];
    let body_width = width.saturating_sub(BODY_INDENT.len());

    let body = match view.role {
        Role::User => view
            .content
            .lines()
            .map(|line| Line::from(Span::styled(line.to_owned(), styles::message_text_style())))
            .collect(),
        Role::Assistant | Role::System => render_markdown(&view.content),
    };

    for line in body {
        for wrapped in wrap_line(line, body_width) {
            lines.push(indented(wrapped));
        }
    }

    if let Some(error) = &view.error {
        let line = Line::from(Span::styled(format!("✗ {error}"), styles::message_error_style()));
        lines.extend(wrap_line(line, body_width).into_iter().map(indented));
    }

    for (index, source) in view.sources.iter().enumerate() {
        let line = Line::from(Span::styled(
            format!("[{}] {source}", index + 1),
            styles::message_meta_style(),
        ));
        lines.extend(wrap_line(line, body_width).into_iter().map(indented));
    }

    lines.push(Line::default());
    lines
}

fn header_line(view: &MessageView) -> Line<'static> {
    let sender_style = match view.role {
        Role::User => styles::user_sender_style(),
        Role::Assistant | Role::System => styles::assistant_sender_style(),
    };

    let mut spans = vec![
        Span::styled(format!("{:>5} ", view.time), styles::message_time_style()),
        Span::styled(view.sender.clone(), sender_style),
    ];

    if let Some((position, count)) = view.branch {
        spans.push(Span::styled(
            format!(" ‹{position}/{count}›"),
            styles::message_meta_style(),
        ));
    }
    if let Some(progress) = &view.progress {
        spans.push(Span::styled(
            format!(" … {progress}"),
            styles::message_meta_style(),
        ));
    }
    if let Some(usage) = &view.usage {
        spans.push(Span::styled(
            format!(" · {usage}"),
            styles::message_meta_style(),
        ));
    }

    Line::from(spans)
}

fn indented(line: Line<'static>) -> Line<'static> {
    let mut spans = vec![Span::raw(BODY_INDENT)];
    spans.extend(line.spans);
    Line::from(spans)
}

/// Splits a styled line into lines no wider than `width` display columns.
pub fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line];
    }

    let mut wrapped = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for span in line.spans {
        let style = span.style;
        let mut chunk = String::new();

        for ch in span.content.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width + ch_width > width && current_width > 0 {
                if !chunk.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut chunk), style));
                }
                wrapped.push(Line::from(std::mem::take(&mut current)));
                current_width = 0;
            }
            chunk.push(ch);
            current_width += ch_width;
        }

        if !chunk.is_empty() {
            current.push(Span::styled(chunk, style));
        }
    }

    if !current.is_empty() {
        wrapped.push(Line::from(current));
    }
    wrapped
}

fn timestamp_to_date(timestamp_s: i64) -> chrono::NaiveDate {
    match Local.timestamp_opt(timestamp_s, 0) {
        chrono::LocalResult::Single(dt) => dt.date_naive(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        chrono::LocalResult::None => Local::now().date_naive(),
    }
}

fn format_date(date: chrono::NaiveDate) -> String {
    // Format: "14 Feb 2026"
    date.format("%-d %b %Y").to_string()
}

fn format_time(timestamp_s: i64) -> String {
    match Local.timestamp_opt(timestamp_s, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%H:%M").to_string(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.format("%H:%M").to_string(),
        chrono::LocalResult::None => "??:??".to_owned(),
    }
}
