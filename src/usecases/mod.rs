//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod chat_actions;
pub mod context;
pub mod contracts;
pub mod guided_auth;
pub mod list_chats;
pub mod list_models;
pub mod load_chat;
pub mod logout;
pub mod send_message;
pub mod shell;
pub mod startup;
#[cfg(test)]
pub mod stubs;
pub mod verify_message;
