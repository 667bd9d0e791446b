use anyhow::Result;
use thiserror::Error;

use crate::domain::{
    chat::{Chat, ChatSummary},
    events::AppEvent,
    history::ChatHistory,
    server::{ServerInfo, UserSettings},
    shell_state::ShellState,
    user::User,
};

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn state(&self) -> &ShellState;
    fn state_mut(&mut self) -> &mut ShellState;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Failure reported by a backend port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Unauthorized,
    NotFound,
    Unavailable(String),
    InvalidData(String),
}

/// Error returned by use cases that talk to the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseCaseError {
    #[error("sign-in required")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    TemporarilyUnavailable(String),
    #[error("unexpected response from server")]
    DataContractViolation,
}

impl UseCaseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::TemporarilyUnavailable(_) => "TEMPORARILY_UNAVAILABLE",
            Self::DataContractViolation => "DATA_CONTRACT_VIOLATION",
        }
    }
}

impl From<SourceError> for UseCaseError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Unauthorized => Self::Unauthorized,
            SourceError::NotFound => Self::NotFound,
            SourceError::Unavailable(detail) => Self::TemporarilyUnavailable(detail),
            SourceError::InvalidData(_) => Self::DataContractViolation,
        }
    }
}

/// Account and server endpoints.
pub trait SessionSource {
    fn session_user(&self) -> Result<User, SourceError>;
    fn sign_out(&self) -> Result<(), SourceError>;
    fn server_info(&self) -> Result<ServerInfo, SourceError>;
    fn user_settings(&self) -> Result<UserSettings, SourceError>;
}

/// Which chat listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatListing {
    Recent { page: u32 },
    Pinned,
    Archived,
}

pub trait ChatSource {
    fn list_chats(&self, listing: ChatListing) -> Result<Vec<ChatSummary>, SourceError>;
    fn get_chat(&self, chat_id: &str) -> Result<Chat, SourceError>;
    fn create_chat(
        &self,
        title: &str,
        models: &[String],
        history: &ChatHistory,
    ) -> Result<ChatSummary, SourceError>;
    fn update_chat(
        &self,
        chat_id: &str,
        title: &str,
        models: &[String],
        history: &ChatHistory,
    ) -> Result<(), SourceError>;
    fn delete_chat(&self, chat_id: &str) -> Result<(), SourceError>;
    fn toggle_pin(&self, chat_id: &str) -> Result<ChatSummary, SourceError>;
    fn toggle_archive(&self, chat_id: &str) -> Result<ChatSummary, SourceError>;
    /// Returns the share id.
    fn share_chat(&self, chat_id: &str) -> Result<String, SourceError>;
    fn unshare_chat(&self, chat_id: &str) -> Result<(), SourceError>;
    fn list_tags(&self, chat_id: &str) -> Result<Vec<String>, SourceError>;
    fn add_tag(&self, chat_id: &str, name: &str) -> Result<Vec<String>, SourceError>;
    fn remove_tag(&self, chat_id: &str, name: &str) -> Result<Vec<String>, SourceError>;
}
