use super::{
    attestation::AttestationPanelState,
    chat_list_state::ChatListState,
    events::ConnectivityStatus,
    message_input_state::MessageInputState,
    model::ModelCatalog,
    open_chat_state::OpenChatState,
    toast::{ToastLevel, ToastQueue},
    user::User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePane {
    #[default]
    ChatList,
    Messages,
    MessageInput,
}

/// Why the shell loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    UserQuit,
    SignInRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    exit_reason: Option<ExitReason>,
    connectivity_status: ConnectivityStatus,
    active_pane: ActivePane,
    chat_list: ChatListState,
    open_chat: OpenChatState,
    message_input: MessageInputState,
    models: ModelCatalog,
    toasts: ToastQueue,
    attestation: AttestationPanelState,
    user: Option<User>,
    server_name: String,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            running: true,
            exit_reason: None,
            connectivity_status: ConnectivityStatus::Connecting,
            active_pane: ActivePane::default(),
            chat_list: ChatListState::default(),
            open_chat: OpenChatState::default(),
            message_input: MessageInputState::default(),
            models: ModelCatalog::default(),
            toasts: ToastQueue::default(),
            attestation: AttestationPanelState::default(),
            user: None,
            server_name: String::new(),
        }
    }
}

impl ShellState {
    pub fn new(show_archived: bool, toast_ttl_ms: u64) -> Self {
        Self {
            chat_list: ChatListState::new(show_archived),
            toasts: ToastQueue::new(toast_ttl_ms),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.stop_with(ExitReason::UserQuit);
    }

    pub fn stop_with(&mut self, reason: ExitReason) {
        self.running = false;
        self.exit_reason = Some(reason);
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    pub fn connectivity_status(&self) -> ConnectivityStatus {
        self.connectivity_status
    }

    pub fn set_connectivity_status(&mut self, status: ConnectivityStatus) {
        self.connectivity_status = status;
    }

    pub fn active_pane(&self) -> ActivePane {
        self.active_pane
    }

    pub fn set_active_pane(&mut self, pane: ActivePane) {
        self.active_pane = pane;
    }

    pub fn chat_list(&self) -> &ChatListState {
        &self.chat_list
    }

    pub fn chat_list_mut(&mut self) -> &mut ChatListState {
        &mut self.chat_list
    }

    pub fn open_chat(&self) -> &OpenChatState {
        &self.open_chat
    }

    pub fn open_chat_mut(&mut self) -> &mut OpenChatState {
        &mut self.open_chat
    }

    /// Both panes a chat deletion touches.
    pub fn chat_list_and_open_chat_mut(&mut self) -> (&mut ChatListState, &mut OpenChatState) {
        (&mut self.chat_list, &mut self.open_chat)
    }

    pub fn message_input(&self) -> &MessageInputState {
        &self.message_input
    }

    pub fn message_input_mut(&mut self) -> &mut MessageInputState {
        &mut self.message_input
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelCatalog {
        &mut self.models
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn push_toast(&mut self, level: ToastLevel, text: impl Into<String>, now_unix_ms: u128) {
        self.toasts.push(level, text, now_unix_ms);
    }

    pub fn expire_toasts(&mut self, now_unix_ms: u128) -> bool {
        self.toasts.expire(now_unix_ms)
    }

    pub fn attestation(&self) -> &AttestationPanelState {
        &self.attestation
    }

    pub fn set_attestation(&mut self, panel: AttestationPanelState) {
        self.attestation = panel;
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn set_server_name(&mut self, name: impl Into<String>) {
        self.server_name = name.into();
    }
}
