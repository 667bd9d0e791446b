//! Sending a prompt: the exchange is appended locally, then the completion is
//! requested and its content arrives over the real-time channel.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    chat::{title_from_first_message, ChatSummary},
    history::HistoryError,
    message::{Message, Role},
    open_chat_state::OpenChatState,
};

use super::contracts::{ChatSource, SourceError, UseCaseError};

const COMPLETION_REJECTED: &str = "SEND_COMPLETION_REJECTED";

/// Body of a completion request. `message_id` is the assistant placeholder the
/// streamed response is written into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub chat_id: String,
    pub message_id: String,
    pub model: String,
    pub messages: Vec<(Role, String)>,
}

pub trait CompletionSender {
    fn start_completion(&self, request: &CompletionRequest) -> Result<(), SourceError>;
}

pub trait IdGenerator {
    fn next_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub text: String,
    pub model: Option<String>,
    pub now_unix_s: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no model selected")]
    NoModelSelected,
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Backend(#[from] UseCaseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Set when the send created the chat on the server.
    pub created_chat: Option<ChatSummary>,
    pub user_message_id: String,
    pub assistant_message_id: String,
}

pub fn send_message<B>(
    backend: &B,
    ids: &dyn IdGenerator,
    open_chat: &mut OpenChatState,
    command: SendMessageCommand,
) -> Result<SentMessage, SendMessageError>
where
    B: ChatSource + CompletionSender + ?Sized,
{
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }
    let Some(model) = command.model else {
        return Err(SendMessageError::NoModelSelected);
    };

    let parent_id = open_chat.history().current_id().map(str::to_owned);
    let user_message_id = ids.next_id();
    let assistant_message_id = ids.next_id();

    open_chat.append_exchange(
        Message::user(
            user_message_id.clone(),
            parent_id,
            text,
            command.now_unix_s,
        ),
        Message::assistant_placeholder(
            assistant_message_id.clone(),
            Some(user_message_id.clone()),
            model.clone(),
            command.now_unix_s,
        ),
    )?;

    let mut created_chat = None;
    let chat_id = match open_chat.chat_id() {
        Some(chat_id) => chat_id.to_owned(),
        None => {
            let title = title_from_first_message(text);
            let created = backend
                .create_chat(&title, std::slice::from_ref(&model), open_chat.history())
                .map_err(|error| fail_placeholder(open_chat, &assistant_message_id, error))?;

            open_chat.assign_chat(created.id.clone(), created.title.clone());
            let chat_id = created.id.clone();
            created_chat = Some(created);
            chat_id
        }
    };

    let request = CompletionRequest {
        chat_id,
        message_id: assistant_message_id.clone(),
        model,
        messages: open_chat
            .thread()
            .into_iter()
            .filter(|message| message.id != assistant_message_id)
            .filter(|message| message.error.is_none() && !message.content.is_empty())
            .map(|message| (message.role, message.content.clone()))
            .collect(),
    };

    backend
        .start_completion(&request)
        .map_err(|error| fail_placeholder(open_chat, &assistant_message_id, error))?;

    Ok(SentMessage {
        created_chat,
        user_message_id,
        assistant_message_id,
    })
}

fn fail_placeholder(
    open_chat: &mut OpenChatState,
    placeholder_id: &str,
    error: SourceError,
) -> SendMessageError {
    let error = UseCaseError::from(error);
    tracing::warn!(
        code = COMPLETION_REJECTED,
        error_code = error.code(),
        "completion request failed"
    );
    open_chat.fail_message(placeholder_id, &error.to_string());
    SendMessageError::Backend(error)
}
