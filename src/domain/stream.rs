//! Incremental updates delivered by the real-time channel while a response streams.

use super::message::{FileAttachment, Source, StatusUpdate, Usage};

/// Payload of a `chat:completion` event. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionUpdate {
    /// Incremental text (`choices[0].delta.content`).
    pub delta: Option<String>,
    /// Full replacement text.
    pub content: Option<String>,
    pub done: bool,
    pub error: Option<String>,
    pub sources: Vec<Source>,
    pub usage: Option<Usage>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Status(StatusUpdate),
    Delta { content: String },
    Replace { content: String },
    Completion(CompletionUpdate),
    Files(Vec<FileAttachment>),
    Title(String),
    Error { message: Option<String> },
    Unknown { kind: String },
}

impl StreamUpdate {
    /// Wire name used for logging.
    pub fn kind(&self) -> &str {
        match self {
            Self::Status(_) => "status",
            Self::Delta { .. } => "chat:message:delta",
            Self::Replace { .. } => "chat:message",
            Self::Completion(_) => "chat:completion",
            Self::Files(_) => "chat:message:files",
            Self::Title(_) => "chat:title",
            Self::Error { .. } => "error",
            Self::Unknown { kind } => kind,
        }
    }
}

/// One event addressed to a message of a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub chat_id: String,
    pub message_id: String,
    pub update: StreamUpdate,
}
