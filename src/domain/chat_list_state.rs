use super::chat::ChatSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatListSection {
    Pinned,
    Chats,
    Archived,
}

impl ChatListSection {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pinned => "Pinned",
            Self::Chats => "Chats",
            Self::Archived => "Archived",
        }
    }

    fn of(chat: &ChatSummary) -> Self {
        if chat.archived {
            Self::Archived
        } else if chat.pinned {
            Self::Pinned
        } else {
            Self::Chats
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleField {
    Pinned,
    Archived,
}

/// An optimistic flag flip waiting for server confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub chat_id: String,
    pub field: ToggleField,
    pub previous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    ui_state: ChatListUiState,
    chats: Vec<ChatSummary>,
    show_archived: bool,
    selected_chat_id: Option<String>,
}

impl Default for ChatListState {
    fn default() -> Self {
        Self {
            ui_state: ChatListUiState::Loading,
            chats: Vec::new(),
            show_archived: false,
            selected_chat_id: None,
        }
    }
}

impl ChatListState {
    pub fn new(show_archived: bool) -> Self {
        Self {
            show_archived,
            ..Self::default()
        }
    }

    pub fn ui_state(&self) -> ChatListUiState {
        self.ui_state.clone()
    }

    pub fn show_archived(&self) -> bool {
        self.show_archived
    }

    pub fn all_chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn find(&self, chat_id: &str) -> Option<&ChatSummary> {
        self.chats.iter().find(|chat| chat.id == chat_id)
    }

    /// Rows in display order: pinned, then the rest, then archived when shown.
    pub fn visible_chats(&self) -> Vec<&ChatSummary> {
        self.sections()
            .into_iter()
            .flat_map(|(_, chats)| chats)
            .collect()
    }

    pub fn sections(&self) -> Vec<(ChatListSection, Vec<&ChatSummary>)> {
        let mut sections = vec![ChatListSection::Pinned, ChatListSection::Chats];
        if self.show_archived {
            sections.push(ChatListSection::Archived);
        }

        sections
            .into_iter()
            .map(|section| {
                let chats = self
                    .chats
                    .iter()
                    .filter(|chat| ChatListSection::of(chat) == section)
                    .collect::<Vec<_>>();
                (section, chats)
            })
            .filter(|(_, chats)| !chats.is_empty())
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected_chat_id.as_deref()?;
        self.visible_chats()
            .iter()
            .position(|chat| chat.id == selected)
    }

    pub fn selected_chat(&self) -> Option<&ChatSummary> {
        let selected = self.selected_chat_id.as_deref()?;
        self.visible_chats().into_iter().find(|chat| chat.id == selected)
    }

    pub fn set_loading(&mut self) {
        self.ui_state = ChatListUiState::Loading;
        self.chats.clear();
        self.selected_chat_id = None;
    }

    pub fn set_ready(&mut self, chats: Vec<ChatSummary>) {
        let previous_index = self.selected_index();
        self.chats = chats;
        self.refresh_ui_state();
        self.reselect(previous_index.unwrap_or(0));
    }

    pub fn set_error(&mut self) {
        self.ui_state = ChatListUiState::Error;
        self.chats.clear();
        self.selected_chat_id = None;
    }

    pub fn set_show_archived(&mut self, show_archived: bool) {
        let previous_index = self.selected_index();
        self.show_archived = show_archived;
        self.refresh_ui_state();
        self.reselect(previous_index.unwrap_or(0));
    }

    pub fn select_next(&mut self) {
        let visible = self.visible_chats();
        let Some(index) = self.selected_index() else {
            return;
        };

        let last_index = visible.len().saturating_sub(1);
        let next = std::cmp::min(index.saturating_add(1), last_index);
        self.selected_chat_id = visible.get(next).map(|chat| chat.id.clone());
    }

    pub fn select_previous(&mut self) {
        let visible = self.visible_chats();
        let Some(index) = self.selected_index() else {
            return;
        };

        self.selected_chat_id = visible
            .get(index.saturating_sub(1))
            .map(|chat| chat.id.clone());
    }

    pub fn select_chat(&mut self, chat_id: &str) {
        if self.visible_chats().iter().any(|chat| chat.id == chat_id) {
            self.selected_chat_id = Some(chat_id.to_owned());
        }
    }

    /// Inserts a chat at the top of its section or replaces the row with the same id.
    pub fn upsert(&mut self, chat: ChatSummary) {
        let previous_index = self.selected_index();
        match self.chats.iter_mut().find(|existing| existing.id == chat.id) {
            Some(existing) => *existing = chat,
            None => self.chats.insert(0, chat),
        }
        self.refresh_ui_state();
        self.reselect(previous_index.unwrap_or(0));
    }

    pub fn rename(&mut self, chat_id: &str, title: &str) -> bool {
        match self.chats.iter_mut().find(|chat| chat.id == chat_id) {
            Some(chat) => {
                chat.title = title.to_owned();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, chat_id: &str) -> Option<ChatSummary> {
        let previous_index = self.selected_index();
        let position = self.chats.iter().position(|chat| chat.id == chat_id)?;
        let removed = self.chats.remove(position);
        self.refresh_ui_state();
        self.reselect(previous_index.unwrap_or(0));
        Some(removed)
    }

    /// Flips the pinned flag right away. Returns the record needed to undo it.
    pub fn toggle_pin(&mut self, chat_id: &str) -> Option<PendingToggle> {
        self.toggle(chat_id, ToggleField::Pinned)
    }

    /// Flips the archived flag right away. Returns the record needed to undo it.
    pub fn toggle_archive(&mut self, chat_id: &str) -> Option<PendingToggle> {
        self.toggle(chat_id, ToggleField::Archived)
    }

    /// Restores the value captured by a failed toggle.
    pub fn revert(&mut self, pending: &PendingToggle) {
        let previous_index = self.selected_index();
        if let Some(chat) = self.chats.iter_mut().find(|chat| chat.id == pending.chat_id) {
            *field_mut(chat, pending.field) = pending.previous;
        }
        self.refresh_ui_state();
        self.reselect(previous_index.unwrap_or(0));
    }

    fn toggle(&mut self, chat_id: &str, field: ToggleField) -> Option<PendingToggle> {
        let previous_index = self.selected_index();
        let chat = self.chats.iter_mut().find(|chat| chat.id == chat_id)?;
        let flag = field_mut(chat, field);
        let previous = *flag;
        *flag = !previous;

        self.refresh_ui_state();
        self.reselect(previous_index.unwrap_or(0));
        Some(PendingToggle {
            chat_id: chat_id.to_owned(),
            field,
            previous,
        })
    }

    fn refresh_ui_state(&mut self) {
        self.ui_state = if self.visible_chats().is_empty() {
            ChatListUiState::Empty
        } else {
            ChatListUiState::Ready
        };
    }

    /// Keeps the selected chat when it is still visible, otherwise the row at `fallback_index`.
    fn reselect(&mut self, fallback_index: usize) {
        let visible = self.visible_chats();
        if visible.is_empty() {
            self.selected_chat_id = None;
            return;
        }

        let keep = self
            .selected_chat_id
            .as_deref()
            .is_some_and(|selected| visible.iter().any(|chat| chat.id == selected));
        if keep {
            return;
        }

        let index = fallback_index.min(visible.len() - 1);
        self.selected_chat_id = Some(visible[index].id.clone());
    }
}

fn field_mut(chat: &mut ChatSummary, field: ToggleField) -> &mut bool {
    match field {
        ToggleField::Pinned => &mut chat.pinned,
        ToggleField::Archived => &mut chat.archived,
    }
}
