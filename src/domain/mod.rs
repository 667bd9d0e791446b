//! Domain layer: core entities and business rules.

pub mod attestation;
pub mod chat;
pub mod chat_list_state;
pub mod events;
pub mod history;
pub mod message;
pub mod message_input_state;
pub mod model;
pub mod open_chat_state;
pub mod reconcile;
pub mod server;
pub mod shell_state;
pub mod status;
pub mod stream;
pub mod toast;
pub mod user;
