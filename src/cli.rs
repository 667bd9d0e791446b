use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "vchat",
    about = "Terminal client for confidential AI chat (CLI + TUI)"
)]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start TUI shell
    Run,
    /// Sign in and save the session
    Login,
    /// Sign out and forget the saved session
    Logout,
    /// List chats, newest first
    Chats {
        /// Include archived chats
        #[arg(long)]
        archived: bool,
        /// Only pinned chats
        #[arg(long)]
        pinned: bool,
    },
    /// List available models
    Models,
    /// Pin or unpin a chat
    Pin { chat_id: String },
    /// Archive or restore a chat
    Archive { chat_id: String },
    /// Delete a chat
    Delete { chat_id: String },
    /// Create a public share link for a chat
    Share {
        chat_id: String,
        /// Remove the public link instead
        #[arg(long)]
        revoke: bool,
        /// Open the link in the browser
        #[arg(long, conflicts_with = "revoke")]
        open: bool,
    },
    /// Show or change a chat's tags
    Tag {
        chat_id: String,
        #[arg(value_enum, default_value_t = TagAction::List)]
        action: TagAction,
        name: Option<String>,
    },
    /// Check a response's signature and enclave attestation
    Verify { chat_id: String, message_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TagAction {
    List,
    Add,
    Remove,
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
