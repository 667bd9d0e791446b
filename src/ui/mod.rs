//! UI layer: terminal rendering and key input for the interactive shell.

mod attestation_panel;
mod event_source;
mod markdown;
mod message_input;
mod message_rendering;
pub mod shell;
mod styles;
mod terminal;
mod view;

pub use attestation_panel::report_lines;
pub use event_source::{CrosstermEventSource, ShellEventSource};
