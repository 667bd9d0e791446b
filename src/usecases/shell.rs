use anyhow::Result;

use crate::{
    domain::{
        attestation::AttestationPanelState,
        events::{AppEvent, ConnectivityStatus, KeyInput},
        history::BranchDirection,
        reconcile::ReconcileOutcome,
        shell_state::{ActivePane, ExitReason, ShellState},
        status::{now_unix_ms, now_unix_s},
        stream::{ChannelEvent, StreamUpdate},
        toast::ToastLevel,
    },
    infra::contracts::{ClipboardWriter, ExternalOpener, PreferencesStore, TokenStore},
};

use super::{
    chat_actions::{self, deliver_share_link, mark_shared, save_history},
    contracts::{ChatSource, SessionSource, ShellOrchestrator, UseCaseError},
    list_chats::{list_chats, ListChatsQuery},
    list_models::{cycle_model, refresh_catalog, ModelSource},
    load_chat,
    send_message::{
        send_message, CompletionSender, IdGenerator, SendMessageCommand, SendMessageError,
    },
    verify_message::{verify_message, AttestationSource},
};

const SHELL_ACTION_FAILED: &str = "SHELL_ACTION_FAILED";
const SHELL_SIGN_IN_REQUIRED: &str = "SHELL_SIGN_IN_REQUIRED";
const SHELL_TOKEN_CLEAR_FAILED: &str = "SHELL_TOKEN_CLEAR_FAILED";
const SHELL_SERVER_INFO_UNAVAILABLE: &str = "SHELL_SERVER_INFO_UNAVAILABLE";
const SHELL_STRAY_EVENT: &str = "SHELL_STRAY_EVENT";
const SHELL_UNKNOWN_EVENT: &str = "SHELL_UNKNOWN_EVENT";

const ONLY_REPLIES_VERIFIABLE: &str = "Only assistant responses can be verified";

/// Every remote capability the interactive shell needs.
pub trait ShellBackend:
    SessionSource + ChatSource + ModelSource + CompletionSender + AttestationSource
{
}

impl<T> ShellBackend for T where
    T: SessionSource + ChatSource + ModelSource + CompletionSender + AttestationSource
{
}

/// Local side effects used by the shell.
pub struct ShellPorts<'a> {
    pub token_store: &'a dyn TokenStore,
    pub preferences: &'a dyn PreferencesStore,
    pub clipboard: &'a dyn ClipboardWriter,
    pub opener: &'a dyn ExternalOpener,
    pub ids: &'a dyn IdGenerator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub share_base_url: String,
    pub configured_model: Option<String>,
    pub show_archived: bool,
    pub toast_ttl_ms: u64,
}

pub struct DefaultShellOrchestrator<'a, B> {
    state: ShellState,
    backend: &'a B,
    ports: ShellPorts<'a>,
    settings: ShellSettings,
    pending_delete: Option<String>,
}

impl<'a, B> DefaultShellOrchestrator<'a, B>
where
    B: ShellBackend,
{
    pub fn new(backend: &'a B, ports: ShellPorts<'a>, settings: ShellSettings) -> Self {
        Self {
            state: ShellState::new(settings.show_archived, settings.toast_ttl_ms),
            backend,
            ports,
            settings,
            pending_delete: None,
        }
    }

    /// Loads the account, the model catalog and the sidebar.
    pub fn initialize(&mut self) {
        match self.backend.session_user() {
            Ok(user) => self.state.set_user(user),
            Err(error) => {
                self.report("Loading account", error.into());
                if !self.state.is_running() {
                    return;
                }
            }
        }

        match self.backend.server_info() {
            Ok(info) => self.state.set_server_name(info.name),
            Err(error) => {
                tracing::warn!(
                    code = SHELL_SERVER_INFO_UNAVAILABLE,
                    error = ?error,
                    "server info unavailable"
                );
            }
        }

        self.refresh_models();
        if self.state.is_running() {
            self.reload_chats();
        }
    }

    fn refresh_models(&mut self) {
        let settings_default = self
            .backend
            .user_settings()
            .ok()
            .and_then(|settings| settings.default_model().map(str::to_owned));

        if let Err(error) = refresh_catalog(
            self.backend,
            self.state.models_mut(),
            self.settings.configured_model.as_deref(),
            settings_default.as_deref(),
        ) {
            self.report("Loading models", error);
        }
    }

    fn reload_chats(&mut self) {
        self.state.chat_list_mut().set_loading();
        let query = ListChatsQuery {
            include_archived: self.state.chat_list().show_archived(),
            ..ListChatsQuery::default()
        };

        match list_chats(self.backend, query) {
            Ok(chats) => self.state.chat_list_mut().set_ready(chats),
            Err(error) => {
                self.state.chat_list_mut().set_error();
                self.report("Loading chats", error);
            }
        }
    }

    fn toast(&mut self, level: ToastLevel, text: impl Into<String>) {
        self.state.push_toast(level, text, now_unix_ms());
    }

    /// Logs a failed action and shows it. Unauthorized ends the shell so the app
    /// can sign in again.
    fn report(&mut self, action: &str, error: UseCaseError) {
        if error == UseCaseError::Unauthorized {
            self.require_sign_in();
            return;
        }

        tracing::warn!(
            code = SHELL_ACTION_FAILED,
            action,
            error_code = error.code(),
            error = %error,
            "shell action failed"
        );
        self.toast(ToastLevel::Error, format!("{action} failed: {error}"));
    }

    fn require_sign_in(&mut self) {
        tracing::info!(code = SHELL_SIGN_IN_REQUIRED, "session rejected by server");
        if let Err(error) = self.ports.token_store.clear() {
            tracing::warn!(
                code = SHELL_TOKEN_CLEAR_FAILED,
                error = %error,
                "failed to clear rejected token"
            );
        }
        self.state.stop_with(ExitReason::SignInRequired);
    }

    fn handle_key(&mut self, key: KeyInput) {
        if key.ctrl && key.key == "c" {
            self.state.stop();
            return;
        }

        if self.state.active_pane() == ActivePane::MessageInput {
            self.handle_input_key(&key);
            return;
        }

        if key.key != "d" {
            self.pending_delete = None;
        }

        match key.key.as_str() {
            "q" => self.state.stop(),
            "tab" => self.cycle_pane(),
            "esc" => {
                if self.state.attestation().is_visible() {
                    self.state.set_attestation(AttestationPanelState::Hidden);
                } else {
                    self.state.set_active_pane(ActivePane::ChatList);
                }
            }
            "n" => {
                self.state.open_chat_mut().start_draft();
                self.state.set_attestation(AttestationPanelState::Hidden);
                self.state.set_active_pane(ActivePane::MessageInput);
            }
            "i" => self.state.set_active_pane(ActivePane::MessageInput),
            "m" => self.cycle_model(),
            "r" => {
                self.refresh_models();
                if self.state.is_running() {
                    self.reload_chats();
                }
            }
            "A" => self.toggle_show_archived(),
            _ => match self.state.active_pane() {
                ActivePane::ChatList => self.handle_chat_list_key(&key),
                ActivePane::Messages => self.handle_messages_key(&key),
                ActivePane::MessageInput => {}
            },
        }
    }

    fn cycle_pane(&mut self) {
        let next = match self.state.active_pane() {
            ActivePane::ChatList => ActivePane::Messages,
            ActivePane::Messages => ActivePane::MessageInput,
            ActivePane::MessageInput => ActivePane::ChatList,
        };
        self.state.set_active_pane(next);
    }

    fn cycle_model(&mut self) {
        match cycle_model(self.state.models_mut(), self.ports.preferences) {
            Some(model) => self.toast(ToastLevel::Info, format!("Model: {model}")),
            None => self.toast(ToastLevel::Error, "No models available"),
        }
    }

    fn toggle_show_archived(&mut self) {
        let show = !self.state.chat_list().show_archived();
        self.state.chat_list_mut().set_show_archived(show);
        if show {
            self.reload_chats();
        }
    }

    fn handle_chat_list_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "j" | "down" => self.state.chat_list_mut().select_next(),
            "k" | "up" => self.state.chat_list_mut().select_previous(),
            "enter" => self.open_selected_chat(),
            "p" => self.toggle_selected(ToggleKind::Pin),
            "a" => self.toggle_selected(ToggleKind::Archive),
            "d" => self.delete_selected(),
            "s" => self.share_selected(),
            "S" => self.revoke_selected_share(),
            _ => {}
        }
    }

    fn selected_chat(&self) -> Option<(String, String)> {
        self.state
            .chat_list()
            .selected_chat()
            .map(|chat| (chat.id.clone(), chat.title.clone()))
    }

    fn open_selected_chat(&mut self) {
        let Some((chat_id, title)) = self.selected_chat() else {
            return;
        };

        self.state.set_attestation(AttestationPanelState::Hidden);
        match load_chat::open_chat(self.backend, self.state.open_chat_mut(), &chat_id, &title) {
            Ok(_) => self.state.set_active_pane(ActivePane::Messages),
            Err(error) => self.report("Opening chat", error),
        }
    }

    fn toggle_selected(&mut self, kind: ToggleKind) {
        let Some((chat_id, _)) = self.selected_chat() else {
            return;
        };

        let result = match kind {
            ToggleKind::Pin => {
                chat_actions::toggle_pin(self.backend, self.state.chat_list_mut(), &chat_id)
            }
            ToggleKind::Archive => {
                chat_actions::toggle_archive(self.backend, self.state.chat_list_mut(), &chat_id)
            }
        };

        match (kind, result) {
            (ToggleKind::Pin, Ok(row)) => {
                let text = if row.pinned { "Pinned" } else { "Unpinned" };
                self.toast(ToastLevel::Success, format!("{text} \"{}\"", row.title));
            }
            (ToggleKind::Archive, Ok(row)) => {
                let text = if row.archived { "Archived" } else { "Restored" };
                self.toast(ToastLevel::Success, format!("{text} \"{}\"", row.title));
            }
            (ToggleKind::Pin, Err(error)) => self.report("Pin", error),
            (ToggleKind::Archive, Err(error)) => self.report("Archive", error),
        }
    }

    fn delete_selected(&mut self) {
        let Some((chat_id, title)) = self.selected_chat() else {
            return;
        };

        if self.pending_delete.as_deref() != Some(chat_id.as_str()) {
            self.pending_delete = Some(chat_id);
            self.toast(
                ToastLevel::Info,
                format!("Press d again to delete \"{title}\""),
            );
            return;
        }

        self.pending_delete = None;
        let (chat_list, open_chat) = self.state.chat_list_and_open_chat_mut();
        match chat_actions::delete_chat(self.backend, chat_list, open_chat, &chat_id) {
            Ok(()) => self.toast(ToastLevel::Success, format!("Deleted \"{title}\"")),
            Err(error) => self.report("Delete", error),
        }
    }

    fn share_selected(&mut self) {
        let Some((chat_id, _)) = self.selected_chat() else {
            return;
        };

        match chat_actions::share_chat(self.backend, &chat_id, &self.settings.share_base_url) {
            Ok(link) => {
                mark_shared(
                    self.state.chat_list_mut(),
                    &chat_id,
                    Some(link.share_id.clone()),
                );
                let delivery =
                    deliver_share_link(&link, self.ports.clipboard, self.ports.opener, false);
                let text = if delivery.copied {
                    format!("Share link copied: {}", link.url)
                } else {
                    format!("Share link: {}", link.url)
                };
                self.toast(ToastLevel::Success, text);
            }
            Err(error) => self.report("Share", error),
        }
    }

    fn revoke_selected_share(&mut self) {
        let Some((chat_id, _)) = self.selected_chat() else {
            return;
        };

        match chat_actions::revoke_share(self.backend, &chat_id) {
            Ok(()) => {
                mark_shared(self.state.chat_list_mut(), &chat_id, None);
                self.toast(ToastLevel::Success, "Share link revoked");
            }
            Err(error) => self.report("Revoke share", error),
        }
    }

    fn handle_messages_key(&mut self, key: &KeyInput) {
        match key.key.as_str() {
            "j" | "down" => self.state.open_chat_mut().select_next(),
            "k" | "up" => self.state.open_chat_mut().select_previous(),
            "[" => self.switch_branch(BranchDirection::Previous),
            "]" => self.switch_branch(BranchDirection::Next),
            "v" => self.verify_selected(),
            "y" => self.copy_selected(),
            "enter" => self.state.set_active_pane(ActivePane::MessageInput),
            _ => {}
        }
    }

    fn switch_branch(&mut self, direction: BranchDirection) {
        if !self.state.open_chat_mut().switch_branch(direction) {
            return;
        }

        let models = self.open_chat_models();
        if let Err(error) = save_history(self.backend, self.state.open_chat(), &models) {
            self.report("Saving branch", error);
        }
    }

    fn verify_selected(&mut self) {
        let Some(message) = self.state.open_chat().selected_message().cloned() else {
            return;
        };

        self.state.set_attestation(AttestationPanelState::Loading {
            message_id: message.id.clone(),
        });

        match verify_message(self.backend, &message) {
            Ok(report) => self.state.set_attestation(AttestationPanelState::Ready(report)),
            Err(UseCaseError::Unauthorized) => self.require_sign_in(),
            Err(UseCaseError::NotFound) => self.state.set_attestation(
                AttestationPanelState::Error(ONLY_REPLIES_VERIFIABLE.to_owned()),
            ),
            Err(error) => self
                .state
                .set_attestation(AttestationPanelState::Error(error.to_string())),
        }
    }

    fn copy_selected(&mut self) {
        let Some(content) = self
            .state
            .open_chat()
            .selected_message()
            .map(|message| message.display_content())
        else {
            return;
        };

        match self.ports.clipboard.copy_text(&content) {
            Ok(()) => self.toast(ToastLevel::Success, "Message copied"),
            Err(error) => self.toast(ToastLevel::Error, format!("Copy failed: {error}")),
        }
    }

    fn handle_input_key(&mut self, key: &KeyInput) {
        if key.ctrl {
            match key.key.as_str() {
                "n" => {
                    if !self.state.message_input_mut().insert_newline() {
                        self.toast(ToastLevel::Error, "Message is too long");
                    }
                }
                "w" => self.state.message_input_mut().delete_word_before(),
                "u" => self.state.message_input_mut().clear(),
                _ => {}
            }
            return;
        }

        match key.key.as_str() {
            "esc" => {
                let pane = if self.state.open_chat().is_open() {
                    ActivePane::Messages
                } else {
                    ActivePane::ChatList
                };
                self.state.set_active_pane(pane);
                return;
            }
            "tab" => return self.cycle_pane(),
            "enter" => return self.send(),
            _ => {}
        }

        let input = self.state.message_input_mut();
        match key.key.as_str() {
            "backspace" => input.delete_char_before(),
            "delete" => input.delete_char_at(),
            "left" => input.move_cursor_left(),
            "right" => input.move_cursor_right(),
            "up" => input.move_cursor_up(),
            "down" => input.move_cursor_down(),
            "home" => input.move_cursor_home(),
            "end" => input.move_cursor_end(),
            other => {
                let mut chars = other.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if !input.insert_char(ch) {
                        self.toast(ToastLevel::Error, "Message is too long");
                    }
                }
            }
        }
    }

    fn send(&mut self) {
        if self.state.message_input().text().trim().is_empty() {
            return;
        }
        if !self.state.open_chat().is_open() {
            self.state.open_chat_mut().start_draft();
        }

        let command = SendMessageCommand {
            text: self.state.message_input().text().to_owned(),
            model: self.state.models().selected().map(|model| model.id.clone()),
            now_unix_s: now_unix_s(),
        };

        match send_message(
            self.backend,
            self.ports.ids,
            self.state.open_chat_mut(),
            command,
        ) {
            Ok(sent) => {
                self.state.message_input_mut().clear();
                if let Some(created) = sent.created_chat {
                    let chat_id = created.id.clone();
                    self.state.chat_list_mut().upsert(created);
                    self.state.chat_list_mut().select_chat(&chat_id);
                }
            }
            Err(SendMessageError::EmptyMessage) => {}
            Err(SendMessageError::NoModelSelected) => {
                self.toast(ToastLevel::Error, "No model selected. Press m in the chat list");
            }
            Err(SendMessageError::History(error)) => {
                self.toast(ToastLevel::Error, format!("Send failed: {error}"));
            }
            Err(SendMessageError::Backend(error)) => {
                self.state.message_input_mut().clear();
                self.report("Send", error);
            }
        }
    }

    fn handle_channel_event(&mut self, event: ChannelEvent) {
        match self.state.open_chat_mut().apply_event(&event) {
            Some(ReconcileOutcome::Applied { finished }) => {
                if finished {
                    self.finish_response(&event.message_id);
                }
            }
            Some(ReconcileOutcome::TitleChanged { title, finished }) => {
                self.state.chat_list_mut().rename(&event.chat_id, &title);
                if finished {
                    self.finish_response(&event.message_id);
                }
            }
            Some(ReconcileOutcome::MessageNotFound) => {
                tracing::debug!(
                    code = SHELL_STRAY_EVENT,
                    chat_id = %event.chat_id,
                    message_id = %event.message_id,
                    "event for unknown message"
                );
            }
            Some(ReconcileOutcome::Ignored { kind }) => {
                tracing::debug!(
                    code = SHELL_UNKNOWN_EVENT,
                    chat_id = %event.chat_id,
                    kind = %kind,
                    "ignoring unknown real-time event"
                );
            }
            None => self.handle_background_event(&event),
        }
    }

    fn finish_response(&mut self, message_id: &str) {
        let failure = self
            .state
            .open_chat()
            .history()
            .get(message_id)
            .and_then(|message| message.error.clone());
        if let Some(error) = failure {
            self.toast(ToastLevel::Error, format!("Response failed: {error}"));
        }

        let models = self.open_chat_models();
        if let Err(error) = save_history(self.backend, self.state.open_chat(), &models) {
            self.report("Saving chat", error);
        }
    }

    fn open_chat_models(&self) -> Vec<String> {
        self.state
            .open_chat()
            .thread()
            .iter()
            .rev()
            .find_map(|message| message.model.clone())
            .or_else(|| self.state.models().selected().map(|model| model.id.clone()))
            .into_iter()
            .collect()
    }

    fn handle_background_event(&mut self, event: &ChannelEvent) {
        let (title, finished, failed) = match &event.update {
            StreamUpdate::Title(title) => (Some(title.clone()), false, false),
            StreamUpdate::Completion(update) => (
                update.title.clone(),
                update.done || update.error.is_some(),
                update.error.is_some(),
            ),
            StreamUpdate::Error { .. } => (None, true, true),
            StreamUpdate::Unknown { kind } => {
                tracing::debug!(
                    code = SHELL_UNKNOWN_EVENT,
                    chat_id = %event.chat_id,
                    kind = %kind,
                    "ignoring unknown real-time event"
                );
                return;
            }
            _ => (None, false, false),
        };

        if let Some(title) = title {
            self.state.chat_list_mut().rename(&event.chat_id, &title);
        }
        if !finished {
            return;
        }

        let chat_title = self
            .state
            .chat_list()
            .find(&event.chat_id)
            .map(|chat| chat.title.clone())
            .unwrap_or_else(|| event.chat_id.clone());
        if failed {
            self.toast(ToastLevel::Error, format!("Response failed in \"{chat_title}\""));
        } else {
            self.toast(ToastLevel::Info, format!("Response ready in \"{chat_title}\""));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ToggleKind {
    Pin,
    Archive,
}

impl<'a, B> ShellOrchestrator for DefaultShellOrchestrator<'a, B>
where
    B: ShellBackend,
{
    fn state(&self) -> &ShellState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {
                self.state.expire_toasts(now_unix_ms());
            }
            AppEvent::QuitRequested => self.state.stop(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::ConnectivityChanged(status) => {
                let changed = self.state.connectivity_status() != status;
                self.state.set_connectivity_status(status);
                if changed && status == ConnectivityStatus::Error {
                    self.toast(ToastLevel::Error, "Real-time connection failed");
                }
            }
            AppEvent::Channel(event) => self.handle_channel_event(event),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            attestation::{AttestationReport, CheckOutcome, MessageSignature},
            chat::{Chat, ChatSummary},
            history::ChatHistory,
            message::{Message, Role},
            model::Model,
            stream::CompletionUpdate,
        },
        infra::stubs::{
            MemoryPreferencesStore, MemoryTokenStore, RecordingClipboard, RecordingOpener,
        },
        usecases::{
            contracts::SourceError,
            stubs::{SequentialIds, StubBackend},
        },
    };

    struct Fixture {
        backend: StubBackend,
        tokens: MemoryTokenStore,
        preferences: MemoryPreferencesStore,
        clipboard: RecordingClipboard,
        opener: RecordingOpener,
        ids: SequentialIds,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = StubBackend::default();
            backend.set_models(vec![model("llama"), model("qwen")]);
            backend.set_recent(vec![chat("c1", "First", 20), chat("c2", "Second", 10)]);
            Self {
                backend,
                tokens: MemoryTokenStore::with_token("tok"),
                preferences: MemoryPreferencesStore::default(),
                clipboard: RecordingClipboard::default(),
                opener: RecordingOpener::default(),
                ids: SequentialIds::default(),
            }
        }

        fn shell(&self) -> DefaultShellOrchestrator<'_, StubBackend> {
            let ports = ShellPorts {
                token_store: &self.tokens,
                preferences: &self.preferences,
                clipboard: &self.clipboard,
                opener: &self.opener,
                ids: &self.ids,
            };
            let settings = ShellSettings {
                share_base_url: "https://chat.example.com/".to_owned(),
                configured_model: None,
                show_archived: false,
                toast_ttl_ms: 4_000,
            };
            let mut shell = DefaultShellOrchestrator::new(&self.backend, ports, settings);
            shell.initialize();
            shell
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

    fn chat(id: &str, title: &str, updated_at_s: i64) -> ChatSummary {
        ChatSummary {
            id: id.to_owned(),
            title: title.to_owned(),
            updated_at_s,
            ..ChatSummary::default()
        }
    }

    fn press(shell: &mut DefaultShellOrchestrator<'_, StubBackend>, key: &str) {
        shell
            .handle_event(AppEvent::InputKey(KeyInput::new(key, false)))
            .expect("key should be handled");
    }

    fn type_text(shell: &mut DefaultShellOrchestrator<'_, StubBackend>, text: &str) {
        for ch in text.chars() {
            press(shell, &ch.to_string());
        }
    }

    fn last_toast(shell: &DefaultShellOrchestrator<'_, StubBackend>) -> Option<String> {
        shell
            .state()
            .toasts()
            .visible()
            .last()
            .map(|toast| toast.text.clone())
    }

    fn stored_chat(id: &str) -> Chat {
        let mut history = ChatHistory::default();
        history
            .append(Message::user("u1".to_owned(), None, "hello", 1))
            .expect("append user");
        let mut reply = Message::assistant_placeholder(
            "a1".to_owned(),
            Some("u1".to_owned()),
            "llama".to_owned(),
            2,
        );
        reply.content = "hi there".to_owned();
        reply.done = true;
        history.append(reply).expect("append reply");

        Chat {
            summary: chat(id, "First", 20),
            history,
            models: vec!["llama".to_owned()],
        }
    }

    fn event(chat_id: &str, message_id: &str, update: StreamUpdate) -> AppEvent {
        AppEvent::Channel(ChannelEvent {
            chat_id: chat_id.to_owned(),
            message_id: message_id.to_owned(),
            update,
        })
    }

    #[test]
    fn initialize_loads_user_models_and_chats() {
        let fixture = Fixture::new();
        let shell = fixture.shell();

        assert_eq!(shell.state().user().map(|user| user.name.as_str()), Some("Ada"));
        assert_eq!(shell.state().server_name(), "Private AI");
        assert_eq!(
            shell.state().models().selected().map(|m| m.id.as_str()),
            Some("llama")
        );
        assert_eq!(shell.state().chat_list().visible_chats().len(), 2);
        assert!(shell.state().is_running());
    }

    #[test]
    fn unauthorized_session_clears_token_and_requests_sign_in() {
        let fixture = Fixture::new();
        fixture.backend.fail("session_user", SourceError::Unauthorized);

        let shell = fixture.shell();

        assert_eq!(shell.state().exit_reason(), Some(ExitReason::SignInRequired));
        assert_eq!(fixture.tokens.load().expect("load"), None);
        assert!(!fixture.backend.was_called("list_chats:recent:1"));
    }

    #[test]
    fn quit_keys_stop_the_shell() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "q");

        assert_eq!(shell.state().exit_reason(), Some(ExitReason::UserQuit));
    }

    #[test]
    fn enter_opens_selected_chat_in_message_pane() {
        let fixture = Fixture::new();
        fixture.backend.set_chat(stored_chat("c1"));
        let mut shell = fixture.shell();

        press(&mut shell, "enter");

        assert!(shell.state().open_chat().is_showing("c1"));
        assert_eq!(shell.state().open_chat().thread().len(), 2);
        assert_eq!(shell.state().active_pane(), ActivePane::Messages);
    }

    #[test]
    fn failed_pin_is_reverted_and_toasted() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();
        fixture
            .backend
            .fail("toggle_pin", SourceError::Unavailable("offline".to_owned()));

        press(&mut shell, "p");

        let row = shell.state().chat_list().find("c1").expect("row");
        assert!(!row.pinned);
        assert_eq!(last_toast(&shell).as_deref(), Some("Pin failed: offline"));
    }

    #[test]
    fn delete_needs_confirmation() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "d");
        assert!(!fixture.backend.was_called("delete_chat:c1"));
        assert!(shell.state().chat_list().find("c1").is_some());

        press(&mut shell, "d");
        assert!(fixture.backend.was_called("delete_chat:c1"));
        assert!(shell.state().chat_list().find("c1").is_none());
    }

    #[test]
    fn moving_selection_cancels_pending_delete() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "d");
        press(&mut shell, "j");
        press(&mut shell, "d");

        assert!(!fixture.backend.was_called("delete_chat:c1"));
        assert!(!fixture.backend.was_called("delete_chat:c2"));
    }

    #[test]
    fn share_copies_link_and_marks_row() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "s");

        assert_eq!(
            fixture.clipboard.copied(),
            vec!["https://chat.example.com/s/share-c1".to_owned()]
        );
        assert!(shell.state().chat_list().find("c1").expect("row").is_shared());
        assert!(fixture.opener.opened().is_empty());
    }

    #[test]
    fn model_cycle_persists_choice() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "m");

        assert_eq!(
            shell.state().models().selected().map(|m| m.id.as_str()),
            Some("qwen")
        );
        assert_eq!(fixture.preferences.default_model().as_deref(), Some("qwen"));
    }

    #[test]
    fn typing_q_in_input_pane_does_not_quit() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "i");
        type_text(&mut shell, "quit");

        assert!(shell.state().is_running());
        assert_eq!(shell.state().message_input().text(), "quit");
    }

    #[test]
    fn ctrl_keys_edit_the_composer() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "i");
        type_text(&mut shell, "one two");
        shell
            .handle_event(AppEvent::InputKey(KeyInput::new("w", true)))
            .expect("ctrl+w");
        assert_eq!(shell.state().message_input().text(), "one ");

        shell
            .handle_event(AppEvent::InputKey(KeyInput::new("n", true)))
            .expect("ctrl+n");
        type_text(&mut shell, "x");
        assert_eq!(shell.state().message_input().text(), "one \nx");
    }

    #[test]
    fn sending_from_draft_creates_chat_and_starts_completion() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        press(&mut shell, "n");
        type_text(&mut shell, "hello");
        press(&mut shell, "enter");

        assert!(shell.state().message_input().is_empty());
        assert!(fixture.backend.was_called("create_chat:hello"));
        assert!(fixture.backend.was_called("start_completion:chat-1"));
        assert_eq!(
            shell.state().chat_list().selected_chat().map(|c| c.id.as_str()),
            Some("chat-1")
        );
        assert_eq!(shell.state().open_chat().thread().len(), 2);
    }

    #[test]
    fn streamed_events_fill_reply_and_save_history_when_done() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();
        press(&mut shell, "n");
        type_text(&mut shell, "hi");
        press(&mut shell, "enter");
        let reply_id = shell
            .state()
            .open_chat()
            .history()
            .current_id()
            .expect("placeholder")
            .to_owned();

        for delta in ["Hel", "lo"] {
            shell
                .handle_event(event(
                    "chat-1",
                    &reply_id,
                    StreamUpdate::Delta {
                        content: delta.to_owned(),
                    },
                ))
                .expect("delta");
        }
        shell
            .handle_event(event(
                "chat-1",
                &reply_id,
                StreamUpdate::Completion(CompletionUpdate {
                    done: true,
                    title: Some("Greeting".to_owned()),
                    ..CompletionUpdate::default()
                }),
            ))
            .expect("completion");

        let reply = shell
            .state()
            .open_chat()
            .history()
            .get(&reply_id)
            .expect("reply")
            .clone();
        assert_eq!(reply.content, "Hello");
        assert!(reply.done);
        assert_eq!(
            shell.state().chat_list().find("chat-1").map(|c| c.title.as_str()),
            Some("Greeting")
        );
        assert_eq!(fixture.backend.updates().len(), 1);
    }

    #[test]
    fn finished_response_in_other_chat_raises_toast() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        shell
            .handle_event(event(
                "c2",
                "m9",
                StreamUpdate::Completion(CompletionUpdate {
                    done: true,
                    ..CompletionUpdate::default()
                }),
            ))
            .expect("completion");

        assert_eq!(
            last_toast(&shell).as_deref(),
            Some("Response ready in \"Second\"")
        );
        assert!(fixture.backend.updates().is_empty());
    }

    #[test]
    fn title_event_for_other_chat_renames_row() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        shell
            .handle_event(event("c2", "m9", StreamUpdate::Title("Renamed".to_owned())))
            .expect("title");

        assert_eq!(
            shell.state().chat_list().find("c2").map(|c| c.title.as_str()),
            Some("Renamed")
        );
    }

    #[test]
    fn missing_signature_is_reported_as_failed_check() {
        let fixture = Fixture::new();
        fixture.backend.set_chat(stored_chat("c1"));
        let mut shell = fixture.shell();
        press(&mut shell, "enter");

        press(&mut shell, "v");

        match shell.state().attestation() {
            AttestationPanelState::Ready(report) => {
                assert_eq!(report.message_id, "a1");
                assert!(matches!(report.signature_check, CheckOutcome::Failed(_)));
                assert!(!report.is_trusted());
            }
            other => panic!("unexpected panel state: {other:?}"),
        }

        press(&mut shell, "esc");
        assert!(!shell.state().attestation().is_visible());
        assert_eq!(shell.state().active_pane(), ActivePane::Messages);
    }

    #[test]
    fn verify_on_own_prompt_explains_only_replies_are_signed() {
        let fixture = Fixture::new();
        fixture.backend.set_chat(stored_chat("c1"));
        let mut shell = fixture.shell();
        press(&mut shell, "enter");
        press(&mut shell, "k");

        press(&mut shell, "v");

        assert_eq!(
            shell.state().attestation(),
            &AttestationPanelState::Error("Only assistant responses can be verified".to_owned())
        );
    }

    #[test]
    fn unknown_event_types_leave_state_untouched() {
        let fixture = Fixture::new();
        fixture.backend.set_chat(stored_chat("c1"));
        let mut shell = fixture.shell();
        press(&mut shell, "enter");
        let before = shell.state().open_chat().history().clone();
        let toasts_before = shell.state().toasts().len();

        shell
            .handle_event(event(
                "c1",
                "a1",
                StreamUpdate::Unknown {
                    kind: "chat:tags".to_owned(),
                },
            ))
            .expect("unknown event on open chat");
        shell
            .handle_event(event(
                "c2",
                "m9",
                StreamUpdate::Unknown {
                    kind: "chat:tags".to_owned(),
                },
            ))
            .expect("unknown event on other chat");

        assert_eq!(shell.state().open_chat().history(), &before);
        assert_eq!(shell.state().toasts().len(), toasts_before);
    }

    #[test]
    fn verify_shows_report_for_selected_reply() {
        let fixture = Fixture::new();
        fixture.backend.set_chat(stored_chat("c1"));
        fixture.backend.set_attestation(
            Some(MessageSignature {
                text: "aa:bb".to_owned(),
                signature: "0x00".to_owned(),
                signing_address: "0x0000000000000000000000000000000000000001".to_owned(),
                signing_algo: "ecdsa".to_owned(),
            }),
            Some(AttestationReport {
                model: Some("llama".to_owned()),
                signing_address: "0x0000000000000000000000000000000000000001".to_owned(),
                signing_algo: "ecdsa".to_owned(),
                intel_quote: None,
                nvidia_payload: None,
                raw: "{}".to_owned(),
            }),
        );
        let mut shell = fixture.shell();
        press(&mut shell, "enter");

        press(&mut shell, "v");

        match shell.state().attestation() {
            AttestationPanelState::Ready(report) => {
                assert_eq!(report.message_id, "a1");
                assert!(!report.signature_check.is_passed());
            }
            other => panic!("unexpected panel state: {other:?}"),
        }
    }

    #[test]
    fn connectivity_error_is_toasted_once() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();

        for _ in 0..2 {
            shell
                .handle_event(AppEvent::ConnectivityChanged(ConnectivityStatus::Error))
                .expect("status");
        }

        assert_eq!(shell.state().toasts().len(), 1);
        assert_eq!(shell.state().connectivity_status(), ConnectivityStatus::Error);
    }

    #[test]
    fn unauthorized_action_stops_with_sign_in_required() {
        let fixture = Fixture::new();
        let mut shell = fixture.shell();
        fixture.backend.fail("toggle_archive", SourceError::Unauthorized);

        press(&mut shell, "a");

        assert_eq!(shell.state().exit_reason(), Some(ExitReason::SignInRequired));
        assert_eq!(fixture.tokens.load().expect("load"), None);
    }

    #[test]
    fn copy_selected_message() {
        let fixture = Fixture::new();
        fixture.backend.set_chat(stored_chat("c1"));
        let mut shell = fixture.shell();
        press(&mut shell, "enter");

        press(&mut shell, "y");

        assert_eq!(fixture.clipboard.copied(), vec!["hi there".to_owned()]);
        assert_eq!(
            shell
                .state()
                .open_chat()
                .selected_message()
                .map(|message| message.role),
            Some(Role::Assistant)
        );
    }
}
