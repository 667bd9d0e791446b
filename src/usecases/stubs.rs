use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use crate::domain::{
    attestation::{AttestationReport, MessageSignature},
    chat::{Chat, ChatSummary},
    history::ChatHistory,
    model::Model,
    server::{ServerInfo, UserSettings},
    user::{User, UserRole},
};

use super::{
    contracts::{ChatListing, ChatSource, SessionSource, SourceError},
    list_models::ModelSource,
    send_message::{CompletionRequest, CompletionSender, IdGenerator},
    verify_message::AttestationSource,
};

/// In-memory backend for use case and shell tests.
///
/// `fail(op, error)` makes every later call of `op` return `error`. Calls are
/// recorded as `op` or `op:argument` and can be checked with `was_called`.
#[derive(Debug, Default)]
pub struct StubBackend {
    user: RefCell<Option<User>>,
    recent: RefCell<Vec<ChatSummary>>,
    pinned: RefCell<Vec<ChatSummary>>,
    archived: RefCell<Vec<ChatSummary>>,
    chats: RefCell<HashMap<String, Chat>>,
    models: RefCell<Vec<Model>>,
    signature: RefCell<Option<MessageSignature>>,
    report: RefCell<Option<AttestationReport>>,
    tags: RefCell<HashMap<String, Vec<String>>>,
    failures: RefCell<HashMap<&'static str, SourceError>>,
    calls: RefCell<Vec<String>>,
    completions: RefCell<Vec<CompletionRequest>>,
    updates: RefCell<Vec<(String, ChatHistory)>>,
    created: Cell<usize>,
}

impl StubBackend {
    pub fn set_user(&self, user: User) {
        *self.user.borrow_mut() = Some(user);
    }

    pub fn set_recent(&self, chats: Vec<ChatSummary>) {
        *self.recent.borrow_mut() = chats;
    }

    pub fn set_pinned(&self, chats: Vec<ChatSummary>) {
        *self.pinned.borrow_mut() = chats;
    }

    pub fn set_archived(&self, chats: Vec<ChatSummary>) {
        *self.archived.borrow_mut() = chats;
    }

    pub fn set_chat(&self, chat: Chat) {
        self.chats
            .borrow_mut()
            .insert(chat.summary.id.clone(), chat);
    }

    pub fn set_models(&self, models: Vec<Model>) {
        *self.models.borrow_mut() = models;
    }

    pub fn set_attestation(
        &self,
        signature: Option<MessageSignature>,
        report: Option<AttestationReport>,
    ) {
        *self.signature.borrow_mut() = signature;
        *self.report.borrow_mut() = report;
    }

    pub fn set_tags(&self, chat_id: &str, tags: &[&str]) {
        self.tags.borrow_mut().insert(
            chat_id.to_owned(),
            tags.iter().map(|tag| (*tag).to_owned()).collect(),
        );
    }

    pub fn fail(&self, op: &'static str, error: SourceError) {
        self.failures.borrow_mut().insert(op, error);
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.calls.borrow().iter().any(|recorded| recorded == call)
    }

    pub fn completions(&self) -> Vec<CompletionRequest> {
        self.completions.borrow().clone()
    }

    pub fn updates(&self) -> Vec<(String, ChatHistory)> {
        self.updates.borrow().clone()
    }

    fn enter(&self, op: &'static str, call: String) -> Result<(), SourceError> {
        self.calls.borrow_mut().push(call);
        match self.failures.borrow().get(op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn find_summary(&self, chat_id: &str) -> Option<ChatSummary> {
        [&self.recent, &self.pinned, &self.archived]
            .into_iter()
            .find_map(|list| list.borrow().iter().find(|chat| chat.id == chat_id).cloned())
            .or_else(|| {
                self.chats
                    .borrow()
                    .get(chat_id)
                    .map(|chat| chat.summary.clone())
            })
    }

    fn flip(
        &self,
        chat_id: &str,
        apply: impl Fn(&mut ChatSummary),
    ) -> Result<ChatSummary, SourceError> {
        let mut summary = self.find_summary(chat_id).ok_or(SourceError::NotFound)?;
        apply(&mut summary);
        for list in [&self.recent, &self.pinned, &self.archived] {
            for chat in list.borrow_mut().iter_mut().filter(|chat| chat.id == chat_id) {
                apply(chat);
            }
        }
        Ok(summary)
    }
}

impl SessionSource for StubBackend {
    fn session_user(&self) -> Result<User, SourceError> {
        self.enter("session_user", "session_user".to_owned())?;
        Ok(self.user.borrow().clone().unwrap_or_else(|| User {
            id: "u1".to_owned(),
            email: "ada@example.com".to_owned(),
            name: "Ada".to_owned(),
            role: UserRole::User,
        }))
    }

    fn sign_out(&self) -> Result<(), SourceError> {
        self.enter("sign_out", "sign_out".to_owned())
    }

    fn server_info(&self) -> Result<ServerInfo, SourceError> {
        self.enter("server_info", "server_info".to_owned())?;
        Ok(ServerInfo {
            name: "Private AI".to_owned(),
            version: "0.6.0".to_owned(),
            features: Default::default(),
        })
    }

    fn user_settings(&self) -> Result<UserSettings, SourceError> {
        self.enter("user_settings", "user_settings".to_owned())?;
        Ok(UserSettings::default())
    }
}

impl ChatSource for StubBackend {
    fn list_chats(&self, listing: ChatListing) -> Result<Vec<ChatSummary>, SourceError> {
        let (call, list) = match listing {
            ChatListing::Recent { page } => (format!("list_chats:recent:{page}"), &self.recent),
            ChatListing::Pinned => ("list_chats:pinned".to_owned(), &self.pinned),
            ChatListing::Archived => ("list_chats:archived".to_owned(), &self.archived),
        };
        self.enter("list_chats", call)?;
        Ok(list.borrow().clone())
    }

    fn get_chat(&self, chat_id: &str) -> Result<Chat, SourceError> {
        self.enter("get_chat", format!("get_chat:{chat_id}"))?;
        self.chats
            .borrow()
            .get(chat_id)
            .cloned()
            .ok_or(SourceError::NotFound)
    }

    fn create_chat(
        &self,
        title: &str,
        models: &[String],
        history: &ChatHistory,
    ) -> Result<ChatSummary, SourceError> {
        self.enter("create_chat", format!("create_chat:{title}"))?;
        let next = self.created.get() + 1;
        self.created.set(next);

        let summary = ChatSummary {
            id: format!("chat-{next}"),
            title: title.to_owned(),
            ..ChatSummary::default()
        };
        self.set_chat(Chat {
            summary: summary.clone(),
            history: history.clone(),
            models: models.to_vec(),
        });
        Ok(summary)
    }

    fn update_chat(
        &self,
        chat_id: &str,
        _title: &str,
        _models: &[String],
        history: &ChatHistory,
    ) -> Result<(), SourceError> {
        self.enter("update_chat", format!("update_chat:{chat_id}"))?;
        self.updates
            .borrow_mut()
            .push((chat_id.to_owned(), history.clone()));
        Ok(())
    }

    fn delete_chat(&self, chat_id: &str) -> Result<(), SourceError> {
        self.enter("delete_chat", format!("delete_chat:{chat_id}"))?;
        for list in [&self.recent, &self.pinned, &self.archived] {
            list.borrow_mut().retain(|chat| chat.id != chat_id);
        }
        self.chats.borrow_mut().remove(chat_id);
        Ok(())
    }

    fn toggle_pin(&self, chat_id: &str) -> Result<ChatSummary, SourceError> {
        self.enter("toggle_pin", format!("toggle_pin:{chat_id}"))?;
        self.flip(chat_id, |chat| chat.pinned = !chat.pinned)
    }

    fn toggle_archive(&self, chat_id: &str) -> Result<ChatSummary, SourceError> {
        self.enter("toggle_archive", format!("toggle_archive:{chat_id}"))?;
        self.flip(chat_id, |chat| chat.archived = !chat.archived)
    }

    fn share_chat(&self, chat_id: &str) -> Result<String, SourceError> {
        self.enter("share_chat", format!("share_chat:{chat_id}"))?;
        Ok(format!("share-{chat_id}"))
    }

    fn unshare_chat(&self, chat_id: &str) -> Result<(), SourceError> {
        self.enter("unshare_chat", format!("unshare_chat:{chat_id}"))
    }

    fn list_tags(&self, chat_id: &str) -> Result<Vec<String>, SourceError> {
        self.enter("list_tags", format!("list_tags:{chat_id}"))?;
        Ok(self.tags.borrow().get(chat_id).cloned().unwrap_or_default())
    }

    fn add_tag(&self, chat_id: &str, name: &str) -> Result<Vec<String>, SourceError> {
        self.enter("add_tag", format!("add_tag:{chat_id}:{name}"))?;
        let mut tags = self.tags.borrow_mut();
        let entry = tags.entry(chat_id.to_owned()).or_default();
        if !entry.iter().any(|tag| tag == name) {
            entry.push(name.to_owned());
        }
        Ok(entry.clone())
    }

    fn remove_tag(&self, chat_id: &str, name: &str) -> Result<Vec<String>, SourceError> {
        self.enter("remove_tag", format!("remove_tag:{chat_id}:{name}"))?;
        let mut tags = self.tags.borrow_mut();
        let entry = tags.entry(chat_id.to_owned()).or_default();
        entry.retain(|tag| tag != name);
        Ok(entry.clone())
    }
}

impl ModelSource for StubBackend {
    fn list_models(&self) -> Result<Vec<Model>, SourceError> {
        self.enter("list_models", "list_models".to_owned())?;
        Ok(self.models.borrow().clone())
    }
}

impl CompletionSender for StubBackend {
    fn start_completion(&self, request: &CompletionRequest) -> Result<(), SourceError> {
        self.enter(
            "start_completion",
            format!("start_completion:{}", request.chat_id),
        )?;
        self.completions.borrow_mut().push(request.clone());
        Ok(())
    }
}

impl AttestationSource for StubBackend {
    fn message_signature(
        &self,
        message_id: &str,
        _model: &str,
    ) -> Result<MessageSignature, SourceError> {
        self.enter("message_signature", format!("message_signature:{message_id}"))?;
        self.signature.borrow().clone().ok_or(SourceError::NotFound)
    }

    fn attestation_report(&self, model: &str) -> Result<AttestationReport, SourceError> {
        self.enter("attestation_report", format!("attestation_report:{model}"))?;
        self.report.borrow().clone().ok_or(SourceError::NotFound)
    }
}

/// Hands out `id-1`, `id-2`, ... in order.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: Cell<usize>,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let next = self.next.get() + 1;
        self.next.set(next);
        format!("id-{next}")
    }
}
