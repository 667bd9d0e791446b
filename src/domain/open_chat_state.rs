use super::{
    history::{BranchDirection, ChatHistory, HistoryError},
    message::Message,
    reconcile::{self, ReconcileOutcome},
    stream::ChannelEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenChatUiState {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Scroll margin - number of items to keep visible above/below cursor before scrolling.
const SCROLL_MARGIN: usize = 5;

pub const NEW_CHAT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChatState {
    /// `None` while composing a chat the server does not know yet.
    chat_id: Option<String>,
    chat_title: String,
    history: ChatHistory,
    ui_state: OpenChatUiState,
    selected_index: Option<usize>,
    scroll_offset: usize,
}

impl Default for OpenChatState {
    fn default() -> Self {
        Self {
            chat_id: None,
            chat_title: String::new(),
            history: ChatHistory::default(),
            ui_state: OpenChatUiState::Empty,
            selected_index: None,
            scroll_offset: 0,
        }
    }
}

impl OpenChatState {
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn chat_title(&self) -> &str {
        &self.chat_title
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// The displayed conversation along the current branch.
    pub fn thread(&self) -> Vec<&Message> {
        self.history.thread()
    }

    pub fn ui_state(&self) -> OpenChatUiState {
        self.ui_state.clone()
    }

    /// Returns the selected message index for scroll positioning.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_message(&self) -> Option<&Message> {
        self.selected_index
            .and_then(|index| self.thread().get(index).copied())
    }

    /// Returns the current scroll offset for the messages list.
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_open(&self) -> bool {
        self.ui_state != OpenChatUiState::Empty
    }

    pub fn is_showing(&self, chat_id: &str) -> bool {
        self.chat_id.as_deref() == Some(chat_id)
    }

    /// Opens an empty conversation that becomes a chat on the first send.
    pub fn start_draft(&mut self) {
        self.chat_id = None;
        self.chat_title = NEW_CHAT_TITLE.to_owned();
        self.history = ChatHistory::default();
        self.ui_state = OpenChatUiState::Ready;
        self.selected_index = None;
        self.scroll_offset = 0;
    }

    pub fn set_loading(&mut self, chat_id: String, chat_title: String) {
        self.chat_id = Some(chat_id);
        self.chat_title = chat_title;
        self.history = ChatHistory::default();
        self.ui_state = OpenChatUiState::Loading;
        self.selected_index = None;
        self.scroll_offset = 0;
    }

    pub fn set_ready(&mut self, history: ChatHistory) {
        self.history = history;
        self.ui_state = OpenChatUiState::Ready;
        self.select_last();
    }

    pub fn set_error(&mut self) {
        self.ui_state = OpenChatUiState::Error;
    }

    /// Records the id the server assigned to a draft chat.
    pub fn assign_chat(&mut self, chat_id: String, chat_title: String) {
        self.chat_id = Some(chat_id);
        self.chat_title = chat_title;
    }

    pub fn set_title(&mut self, chat_title: &str) {
        self.chat_title = chat_title.to_owned();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Appends a sent message and its pending reply and selects the reply.
    pub fn append_exchange(
        &mut self,
        user_message: Message,
        placeholder: Message,
    ) -> Result<(), HistoryError> {
        self.history.append(user_message)?;
        self.history.append(placeholder)?;
        self.select_last();
        Ok(())
    }

    /// Marks a message failed, e.g. when its completion request was rejected.
    pub fn fail_message(&mut self, message_id: &str, error: &str) {
        if let Some(message) = self.history.get_mut(message_id) {
            message.fail(error);
        }
    }

    /// Applies a streamed update when it belongs to this chat.
    pub fn apply_event(&mut self, event: &ChannelEvent) -> Option<ReconcileOutcome> {
        if !self.is_showing(&event.chat_id) {
            return None;
        }

        let following = self.is_at_bottom();
        let outcome = reconcile::apply(&mut self.history, event);
        if let ReconcileOutcome::TitleChanged { title, .. } = &outcome {
            self.chat_title = title.clone();
        }
        if following {
            self.select_last();
        }
        Some(outcome)
    }

    /// Switches the selected message to its neighbouring branch.
    pub fn switch_branch(&mut self, direction: BranchDirection) -> bool {
        let Some(index) = self.selected_index else {
            return false;
        };
        let Some(id) = self.selected_message().map(|message| message.id.clone()) else {
            return false;
        };

        if self.history.switch_sibling(&id, direction).is_none() {
            return false;
        }

        let len = self.thread().len();
        self.selected_index = if len == 0 {
            None
        } else {
            Some(index.min(len - 1))
        };
        true
    }

    /// Selects the next message (moves down in the list).
    pub fn select_next(&mut self) {
        let len = self.thread().len();
        if len == 0 {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(0),
            Some(idx) if idx + 1 < len => Some(idx + 1),
            Some(idx) => Some(idx),
        };
    }

    /// Selects the previous message (moves up in the list).
    pub fn select_previous(&mut self) {
        let len = self.thread().len();
        if len == 0 {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(len - 1),
            Some(0) => Some(0),
            Some(idx) => Some(idx - 1),
        };
    }

    /// Updates the scroll offset based on the current selection and viewport height.
    /// This ensures the cursor stays visible with SCROLL_MARGIN items above/below.
    ///
    /// `element_index` is the visual index in the list.
    /// `viewport_height` is the number of visible rows in the list area.
    pub fn update_scroll_offset(&mut self, element_index: usize, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }

        let effective_margin = SCROLL_MARGIN.min(viewport_height / 2);

        if element_index < self.scroll_offset + effective_margin {
            self.scroll_offset = element_index.saturating_sub(effective_margin);
        }

        let visible_bottom = self.scroll_offset + viewport_height;
        if element_index + effective_margin >= visible_bottom {
            self.scroll_offset =
                (element_index + effective_margin + 1).saturating_sub(viewport_height);
        }
    }

    fn is_at_bottom(&self) -> bool {
        let len = self.thread().len();
        match self.selected_index {
            None => true,
            Some(index) => index + 1 >= len,
        }
    }

    fn select_last(&mut self) {
        let len = self.thread().len();
        self.selected_index = len.checked_sub(1);
    }
}
