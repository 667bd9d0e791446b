use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::domain::{
    chat::ChatSummary,
    chat_list_state::{ChatListSection, ChatListState, ChatListUiState},
    open_chat_state::{OpenChatState, OpenChatUiState},
    shell_state::{ActivePane, ShellState},
};

use super::attestation_panel::render_attestation_panel;
use super::message_input::{input_height, render_message_input};
use super::message_rendering::{
    build_message_list_elements, element_to_list_item, message_index_to_element_index,
};
use super::styles;

const TIMESTAMP_WIDTH: usize = 5;
const PINNED_MARKER: &str = "★ ";
const SHARED_MARKER: &str = "⇗ ";

pub fn render(frame: &mut Frame<'_>, state: &mut ShellState) {
    let [content_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .areas(frame.area());

    let [chats_area, messages_with_input_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .areas(content_area);

    let [messages_area, input_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(input_height(state.message_input())),
        ])
        .areas(messages_with_input_area);

    let active_pane = state.active_pane();
    render_chat_list_panel(frame, chats_area, state, active_pane);
    render_messages_panel(frame, messages_area, state, active_pane);
    render_message_input(frame, input_area, state.message_input(), active_pane);

    frame.render_widget(Paragraph::new(status_line(state)), status_area);

    render_attestation_panel(frame, content_area, state.attestation());
}

fn panel_block(title: String, is_active: bool) -> Block<'static> {
    let border_style = if is_active {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

fn render_chat_list_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ShellState,
    active_pane: ActivePane,
) {
    let is_active = active_pane == ActivePane::ChatList;
    let chat_list = state.chat_list();
    let title = chat_list_title(state);

    let message = match chat_list.ui_state() {
        ChatListUiState::Loading => Some("Loading chats..."),
        ChatListUiState::Empty => Some("No chats yet. Press n to start one."),
        ChatListUiState::Error => Some("Failed to load chats. Press r to retry."),
        ChatListUiState::Ready => None,
    };

    if let Some(message) = message {
        let panel = Paragraph::new(message).block(panel_block(title, is_active));
        frame.render_widget(panel, area);
        return;
    }

    // Inner width = area width - 2 (borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let items = build_chat_list_items(chat_list, inner_width);
    let list = List::new(items)
        .block(panel_block(title, is_active))
        .highlight_style(styles::selection_style());

    let visual_index = chat_list
        .selected_index()
        .map(|index| compute_visual_index(chat_list, index));

    let mut list_state = ListState::default();
    list_state.select(visual_index);
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn chat_list_title(state: &ShellState) -> String {
    let count = state.chat_list().visible_chats().len();
    let account = match (state.user(), state.server_name()) {
        (Some(user), "") => user.name.clone(),
        (Some(user), server) => format!("{} @ {server}", user.name),
        (None, server) => server.to_owned(),
    };

    if account.is_empty() {
        format!("Chats ({count})")
    } else {
        format!("Chats ({count}) · {account}")
    }
}

/// Builds the list of visual items including section headers.
fn build_chat_list_items(chat_list: &ChatListState, width: usize) -> Vec<ListItem<'static>> {
    let mut items = Vec::new();
    for (section, chats) in chat_list.sections() {
        items.push(section_header_item(section));
        for chat in chats {
            items.push(ListItem::new(chat_list_item_line(chat, width)));
        }
    }
    items
}

/// Computes the visual index in the list (accounting for section headers).
fn compute_visual_index(chat_list: &ChatListState, chat_index: usize) -> usize {
    let mut remaining = chat_index;
    let mut headers = 0;
    for (_, chats) in chat_list.sections() {
        headers += 1;
        if remaining < chats.len() {
            break;
        }
        remaining -= chats.len();
    }
    chat_index + headers
}

fn section_header_item(section: ChatListSection) -> ListItem<'static> {
    let line = Line::from(vec![Span::styled(
        format!("-- {} --", section.label()),
        styles::section_header_style(),
    )]);
    ListItem::new(line)
}

fn chat_list_item_line(chat: &ChatSummary, width: usize) -> Line<'static> {
    let timestamp = format_chat_timestamp(chat.updated_at_s);

    let mut markers = String::new();
    if chat.pinned && !chat.archived {
        markers.push_str(PINNED_MARKER);
    }
    if chat.is_shared() {
        markers.push_str(SHARED_MARKER);
    }

    let tags = chat
        .tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ");
    let tags = if tags.is_empty() {
        tags
    } else {
        format!(" {tags}")
    };

    // timestamp + " " + markers + title + tags
    let fixed_len = TIMESTAMP_WIDTH + 1 + markers.width();
    let available = width.saturating_sub(fixed_len);
    let (title, tags) = fit_title_and_tags(&chat.title, &tags, available);

    let title_style = if chat.archived {
        styles::archived_chat_style()
    } else {
        styles::chat_name_style()
    };

    let mut spans = vec![
        Span::styled(format!("{timestamp:>5} "), styles::timestamp_style()),
    ];
    if !markers.is_empty() {
        spans.push(Span::styled(markers, styles::chat_marker_style()));
    }
    spans.push(Span::styled(title, title_style));
    if !tags.is_empty() {
        spans.push(Span::styled(tags, styles::tag_style()));
    }

    Line::from(spans)
}

/// Keeps the title whole when it fits and shortens the tags instead.
fn fit_title_and_tags(title: &str, tags: &str, available: usize) -> (String, String) {
    let title_width = title.width();
    if title_width + tags.width() <= available {
        return (title.to_owned(), tags.to_owned());
    }
    if title_width <= available {
        return (title.to_owned(), truncate_to_width(tags, available - title_width));
    }
    (truncate_to_width(title, available), String::new())
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_owned();
    }
    if width == 0 {
        return String::new();
    }

    let mut truncated = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width + 1 > width {
            break;
        }
        truncated.push(ch);
        used += ch_width;
    }
    truncated.push('…');
    truncated
}

fn format_chat_timestamp(timestamp_s: i64) -> String {
    use chrono::{Local, TimeZone};

    // Negative or out-of-range timestamps come from corrupted data.
    let datetime = match Local.timestamp_opt(timestamp_s, 0) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => return "     ".to_owned(),
    };

    let today = Local::now().date_naive();

    if datetime.date_naive() == today {
        datetime.format("%H:%M").to_string()
    } else {
        datetime.format("%d.%m").to_string()
    }
}

fn render_messages_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &mut ShellState,
    active_pane: ActivePane,
) {
    let is_active = active_pane == ActivePane::Messages;
    let title = open_chat_title(state);
    let open_chat = state.open_chat();

    let message = match open_chat.ui_state() {
        OpenChatUiState::Empty => Some("Select a chat or press n to start a new one"),
        OpenChatUiState::Loading => Some("Loading messages..."),
        OpenChatUiState::Error => Some("Failed to load messages. Press Enter to retry."),
        OpenChatUiState::Ready if open_chat.thread().is_empty() => {
            Some("No messages yet. Press i to type one.")
        }
        OpenChatUiState::Ready => None,
    };

    if let Some(message) = message {
        let panel = Paragraph::new(message).block(panel_block(title, is_active));
        frame.render_widget(panel, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let elements = build_message_list_elements(&open_chat.thread(), open_chat.history());
    let items: Vec<ListItem<'static>> = elements
        .iter()
        .map(|element| element_to_list_item(element, inner_width))
        .collect();

    // Calculate viewport height (area height minus borders)
    let viewport_height = area.height.saturating_sub(2) as usize;

    // Map message index to element index (accounting for date separators)
    let element_index = open_chat
        .selected_index()
        .and_then(|index| message_index_to_element_index(&elements, index));

    if let Some(index) = element_index {
        state
            .open_chat_mut()
            .update_scroll_offset(index, viewport_height);
    }

    let list = List::new(items)
        .block(panel_block(title, is_active))
        .highlight_style(if is_active {
            styles::selection_style()
        } else {
            Style::default()
        });

    let mut list_state = ListState::default();
    list_state.select(element_index);
    *list_state.offset_mut() = state.open_chat().scroll_offset();
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn open_chat_title(state: &ShellState) -> String {
    let open_chat: &OpenChatState = state.open_chat();
    let model = state
        .models()
        .selected()
        .map(|model| model.name.as_str())
        .unwrap_or("no model");

    if open_chat.is_open() {
        format!("{} · {model}", open_chat.chat_title())
    } else {
        format!("Messages · {model}")
    }
}

fn key_hints(pane: ActivePane) -> &'static str {
    match pane {
        ActivePane::ChatList => {
            "j/k move · enter open · n new · p pin · a archive · s share · d delete · m model · q quit"
        }
        ActivePane::Messages => {
            "j/k move · [/] branch · v verify · y copy · i reply · esc back · q quit"
        }
        ActivePane::MessageInput => "enter send · ctrl+n newline · ctrl+w delete word · esc leave",
    }
}

fn status_line(state: &ShellState) -> Line<'static> {
    let connectivity = state.connectivity_status();
    let mut spans = vec![Span::styled(
        format!("● {}", connectivity.as_label()),
        styles::connectivity_style(connectivity),
    )];

    if let Some(model) = state.models().selected() {
        spans.push(Span::styled(" | ", styles::hint_style()));
        spans.push(Span::styled(model.name.clone(), styles::field_label_style()));
    }

    spans.push(Span::styled(" | ", styles::hint_style()));
    match state.toasts().visible().last() {
        Some(toast) => spans.push(Span::styled(
            toast.text.clone(),
            styles::toast_style(toast.level),
        )),
        None => spans.push(Span::styled(
            key_hints(state.active_pane()),
            styles::hint_style(),
        )),
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        events::ConnectivityStatus,
        model::Model,
        toast::ToastLevel,
        user::{User, UserRole},
    };

    fn chat(id: &str, title: &str) -> ChatSummary {
        ChatSummary {
            id: id.to_owned(),
            title: title.to_owned(),
            updated_at_s: 0,
            ..ChatSummary::default()
        }
    }

    fn pinned(id: &str, title: &str) -> ChatSummary {
        ChatSummary {
            pinned: true,
            ..chat(id, title)
        }
    }

    fn model(id: &str) -> Model {
        Model {
            id: id.to_owned(),
            name: id.to_owned(),
            owned_by: None,
            description: None,
            confidential: true,
        }
    }

    fn line_to_string(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn list_with(chats: Vec<ChatSummary>, show_archived: bool) -> ChatListState {
        let mut list = ChatListState::new(show_archived);
        list.set_ready(chats);
        list
    }

    const TEST_WIDTH: usize = 40;

    #[test]
    fn status_line_renders_connectivity_label() {
        let mut state = ShellState::default();
        state.set_connectivity_status(ConnectivityStatus::Connected);

        let line = line_to_string(&status_line(&state));

        assert!(line.starts_with("● connected"));
    }

    #[test]
    fn status_line_prefers_newest_toast_over_hints() {
        let mut state = ShellState::new(false, 4_000);
        state.push_toast(ToastLevel::Info, "first", 0);
        state.push_toast(ToastLevel::Error, "Pin failed: offline", 0);

        let line = status_line(&state);

        assert!(line_to_string(&line).ends_with("Pin failed: offline"));
        assert_eq!(
            line.spans.last().map(|span| span.style),
            Some(styles::toast_style(ToastLevel::Error))
        );
    }

    #[test]
    fn status_line_shows_hints_for_active_pane() {
        let mut state = ShellState::default();
        state.set_active_pane(ActivePane::MessageInput);

        let line = line_to_string(&status_line(&state));

        assert!(line.ends_with(key_hints(ActivePane::MessageInput)));
    }

    #[test]
    fn chat_row_shows_markers_and_tags() {
        let chat = ChatSummary {
            share_id: Some("s1".to_owned()),
            tags: vec!["work".to_owned()],
            ..pinned("c1", "Plans")
        };

        let text = line_to_string(&chat_list_item_line(&chat, TEST_WIDTH));

        assert!(text.contains("★ ⇗ Plans #work"));
    }

    #[test]
    fn archived_chat_row_is_dimmed() {
        let chat = ChatSummary {
            archived: true,
            ..chat("c1", "Old")
        };

        let line = chat_list_item_line(&chat, TEST_WIDTH);

        let title = line
            .spans
            .iter()
            .find(|span| span.content == "Old")
            .expect("title span");
        assert_eq!(title.style, styles::archived_chat_style());
    }

    #[test]
    fn long_title_is_truncated_to_width() {
        let text = line_to_string(&chat_list_item_line(&chat("c1", &"x".repeat(80)), 20));

        assert!(text.ends_with('…'));
        assert!(text.width() <= 20);
    }

    #[test]
    fn tags_are_dropped_before_title() {
        let (title, tags) = fit_title_and_tags("Title", " #a #b", 7);

        assert_eq!(title, "Title");
        assert_eq!(tags, " …");
    }

    #[test]
    fn build_chat_list_items_adds_section_headers() {
        let list = list_with(vec![pinned("c1", "A"), chat("c2", "B")], false);

        let items = build_chat_list_items(&list, TEST_WIDTH);

        assert_eq!(items.len(), 4);
    }

    #[test]
    fn compute_visual_index_accounts_for_headers() {
        let list = list_with(
            vec![pinned("c1", "A"), chat("c2", "B"), chat("c3", "C")],
            false,
        );

        assert_eq!(compute_visual_index(&list, 0), 1);
        assert_eq!(compute_visual_index(&list, 1), 3);
        assert_eq!(compute_visual_index(&list, 2), 4);
    }

    #[test]
    fn compute_visual_index_with_no_pinned() {
        let list = list_with(vec![chat("c1", "A"), chat("c2", "B")], false);

        assert_eq!(compute_visual_index(&list, 0), 1);
        assert_eq!(compute_visual_index(&list, 1), 2);
    }

    #[test]
    fn chat_list_title_names_account_and_server() {
        let mut state = ShellState::default();
        state.chat_list_mut().set_ready(vec![chat("c1", "A")]);
        state.set_user(User {
            id: "u1".to_owned(),
            email: "ada@example.com".to_owned(),
            name: "Ada".to_owned(),
            role: UserRole::User,
        });
        state.set_server_name("Private AI");

        assert_eq!(chat_list_title(&state), "Chats (1) · Ada @ Private AI");
    }

    #[test]
    fn open_chat_title_includes_selected_model() {
        let mut state = ShellState::default();
        state.models_mut().set_models(vec![model("llama")], None);

        assert_eq!(open_chat_title(&state), "Messages · llama");

        state
            .open_chat_mut()
            .set_loading("c1".to_owned(), "Plans".to_owned());

        assert_eq!(open_chat_title(&state), "Plans · llama");
    }

    #[test]
    fn format_chat_timestamp_shows_time_for_today() {
        let now_s = chrono::Local::now().timestamp();

        let formatted = format_chat_timestamp(now_s);

        assert_eq!(formatted.len(), 5);
        assert!(formatted.contains(':'));
    }

    #[test]
    fn format_chat_timestamp_shows_date_for_past() {
        // 2024-01-15 12:00 UTC
        let formatted = format_chat_timestamp(1_705_320_000);

        assert!(formatted.contains('.'));
    }

    #[test]
    fn format_chat_timestamp_handles_extreme_negative_timestamp() {
        assert_eq!(format_chat_timestamp(i64::MIN), "     ");
    }
}
