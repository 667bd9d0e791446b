use std::{path::Path, sync::mpsc, time::Duration};

use anyhow::{bail, Result};
use chrono::{Local, TimeZone};

use crate::{
    cli::{Cli, Command, TagAction},
    domain::{
        chat::ChatSummary,
        chat_list_state::ChatListState,
        open_chat_state::OpenChatState,
        shell_state::ExitReason,
        status::now_unix_s,
    },
    infra::{
        contracts::{SystemClipboard, SystemOpener, TokenStore},
        storage_layout::StorageLayout,
        token_store::FileTokenStore,
    },
    ui::{self, CrosstermEventSource, ShellEventSource},
    usecases::{
        bootstrap::{self, Surface},
        chat_actions::{self, deliver_share_link, TagCommand},
        context::AppContext,
        contracts::{ChatListing, ChatSource, ShellOrchestrator, UseCaseError},
        guided_auth::{run_guided_auth, GuidedAuthOutcome, RetryPolicy, StdTerminal},
        list_chats::{list_chats, list_chats_only, ListChatsQuery},
        list_models::list_models,
        logout::logout,
        send_message::UuidIds,
        shell::{DefaultShellOrchestrator, ShellPorts, ShellSettings},
        startup::{
            acquire_session_lock, plan_startup, GuidedAuthReason, StartupFlowState,
        },
        verify_message::verify_stored_message,
    },
};

const AUTH_TUI_BOOTSTRAP_FAILED: &str = "AUTH_TUI_BOOTSTRAP_FAILED";
const STARTUP_GUIDED_AUTH: &str = "STARTUP_GUIDED_AUTH";
const LOGOUT_BOOTSTRAP_FALLBACK: &str = "LOGOUT_BOOTSTRAP_FALLBACK";

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command_or_default() {
        Command::Run => run_tui(config_path),
        Command::Login => login(config_path),
        Command::Logout => logout_command(config_path),
        command => run_cli_command(config_path, command),
    }
}

fn run_tui(config_path: Option<&Path>) -> Result<()> {
    let mut context = bootstrap::bootstrap(config_path, Surface::Tui)?;
    let plan = plan_startup(
        context.layout.clone(),
        &context.token_store,
        &context.api,
        Duration::from_millis(context.config.startup.session_probe_timeout_ms),
        now_unix_s(),
    )?;
    let _lock = plan.lock_guard;
    let mut state = plan.state;
    let mut authenticated_now = false;

    loop {
        if let StartupFlowState::GuidedAuth { reason } = state {
            tracing::info!(
                code = STARTUP_GUIDED_AUTH,
                reason = ?reason,
                message = reason.as_message(),
                "starting guided CLI authorization"
            );
            println!("{}", reason.as_message());

            let outcome = run_guided_auth(
                &mut StdTerminal,
                &mut context.api,
                &context.token_store,
                &RetryPolicy::default(),
            )?;
            if outcome == GuidedAuthOutcome::ExitWithGuidance {
                return Ok(());
            }
            authenticated_now = true;
        }

        let reason = match launch_shell(&context) {
            Ok(reason) => reason,
            Err(error) if authenticated_now => {
                report_post_auth_tui_bootstrap_failure(&error);
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        match reason {
            ExitReason::UserQuit => return Ok(()),
            ExitReason::SignInRequired => {
                context.api.reset_status();
                state = StartupFlowState::GuidedAuth {
                    reason: GuidedAuthReason::SessionRejected,
                };
            }
        }
    }
}

fn launch_shell(context: &AppContext) -> Result<ExitReason> {
    let clipboard = SystemClipboard;
    let opener = SystemOpener;
    let ids = UuidIds;
    let ports = ShellPorts {
        token_store: &context.token_store,
        preferences: &context.preferences,
        clipboard: &clipboard,
        opener: &opener,
        ids: &ids,
    };
    let settings = ShellSettings {
        share_base_url: context.config.server.base_url.clone(),
        configured_model: context.config.preferences.default_model.clone(),
        show_archived: context.config.ui.show_archived,
        toast_ttl_ms: context.config.ui.toast_ttl_ms,
    };

    let mut orchestrator = DefaultShellOrchestrator::new(&context.api, ports, settings);
    orchestrator.initialize();
    if let Some(reason) = orchestrator.state().exit_reason() {
        return Ok(reason);
    }

    let (event_tx, event_rx) = mpsc::channel();
    let channel = context.api.start_channel(&context.config.realtime, event_tx);
    let mut events = ShellEventSource::new(CrosstermEventSource, event_rx, channel);

    ui::shell::start(&mut events, &mut orchestrator)
}

fn login(config_path: Option<&Path>) -> Result<()> {
    let mut context = bootstrap::bootstrap(config_path, Surface::Cli)?;
    let _lock = acquire_session_lock(context.layout.session_lock_file())?;

    let outcome = run_guided_auth(
        &mut StdTerminal,
        &mut context.api,
        &context.token_store,
        &RetryPolicy::default(),
    )?;
    if let GuidedAuthOutcome::Authenticated(user) = outcome {
        tracing::info!(user_id = %user.id, "signed in from CLI");
    }
    Ok(())
}

fn logout_command(config_path: Option<&Path>) -> Result<()> {
    match bootstrap::bootstrap(config_path, Surface::Cli) {
        Ok(context) => {
            let outcome = logout(&context.api, &context.token_store)?;
            context.api.reset_status();
            tracing::info!(
                token_removed = outcome.token_removed,
                server_signed_out = outcome.server_signed_out,
                "logout completed"
            );
            if !outcome.server_signed_out && outcome.token_removed {
                println!("Server could not be reached; the local session was removed anyway.");
            }
        }
        Err(error) => {
            tracing::warn!(
                code = LOGOUT_BOOTSTRAP_FALLBACK,
                error = %error,
                "logout fallback: bootstrap failed, removing local session only"
            );
            let layout = StorageLayout::resolve()?;
            FileTokenStore::new(layout.token_file()).clear()?;
        }
    }

    println!("Signed out. Run `vchat login` to sign in again.");
    Ok(())
}

fn run_cli_command(config_path: Option<&Path>, command: Command) -> Result<()> {
    let context = bootstrap::bootstrap(config_path, Surface::Cli)?;
    if context.token_store.load()?.is_none() {
        bail!("Not signed in. Run `vchat login` first.");
    }

    match execute(&context, command) {
        Err(UseCaseError::Unauthorized) => {
            context.token_store.clear()?;
            bail!("The saved session was rejected. Run `vchat login` to sign in again.");
        }
        Err(UseCaseError::TemporarilyUnavailable(detail)) => {
            let code = context
                .api
                .status_snapshot()
                .last_error
                .map_or_else(|| "TEMPORARILY_UNAVAILABLE".to_owned(), |error| error.code);
            bail!("{code}: {detail} ({})", context.api.base_url());
        }
        result => Ok(result?),
    }
}

fn execute(context: &AppContext, command: Command) -> Result<(), UseCaseError> {
    let api = &context.api;

    match command {
        Command::Chats { archived, pinned } => {
            let chats = if pinned {
                list_chats_only(api, ChatListing::Pinned)?
            } else {
                list_chats(
                    api,
                    ListChatsQuery {
                        include_archived: archived,
                        ..ListChatsQuery::default()
                    },
                )?
            };
            if chats.is_empty() {
                println!("No chats.");
            }
            for chat in &chats {
                println!("{}", chat_row(chat));
            }
        }
        Command::Models => {
            let preferred = context.config.preferences.default_model.as_deref();
            for model in list_models(api)? {
                let marker = if Some(model.id.as_str()) == preferred { "*" } else { " " };
                let confidential = if model.confidential { "  [confidential]" } else { "" };
                println!("{marker} {}  {}{confidential}", model.id, model.name);
            }
        }
        Command::Pin { chat_id } => {
            let chat = api.toggle_pin(&chat_id)?;
            println!("{} \"{}\"", if chat.pinned { "Pinned" } else { "Unpinned" }, chat.title);
        }
        Command::Archive { chat_id } => {
            let chat = api.toggle_archive(&chat_id)?;
            println!("{} \"{}\"", if chat.archived { "Archived" } else { "Restored" }, chat.title);
        }
        Command::Delete { chat_id } => {
            chat_actions::delete_chat(
                api,
                &mut ChatListState::default(),
                &mut OpenChatState::default(),
                &chat_id,
            )?;
            println!("Deleted {chat_id}");
        }
        Command::Share {
            chat_id,
            revoke,
            open,
        } => {
            if revoke {
                chat_actions::revoke_share(api, &chat_id)?;
                println!("Share link removed.");
            } else {
                let link = chat_actions::share_chat(api, &chat_id, &context.config.server.base_url)?;
                let delivery = deliver_share_link(&link, &SystemClipboard, &SystemOpener, open);
                let copied = if delivery.copied { " (copied)" } else { "" };
                println!("{}{copied}", link.url);
            }
        }
        Command::Tag {
            chat_id,
            action,
            name,
        } => {
            let name = name.unwrap_or_default();
            let command = match action {
                TagAction::List => TagCommand::List,
                TagAction::Add => TagCommand::Add(name),
                TagAction::Remove => TagCommand::Remove(name),
            };
            let tags = chat_actions::manage_tags(api, &chat_id, command)?;
            if tags.is_empty() {
                println!("No tags.");
            } else {
                println!("{}", tags.join(", "));
            }
        }
        Command::Verify {
            chat_id,
            message_id,
        } => {
            let report = verify_stored_message(api, &chat_id, &message_id)?;
            for line in ui::report_lines(&report) {
                println!("{line}");
            }
        }
        Command::Run | Command::Login | Command::Logout => {}
    }

    Ok(())
}

fn chat_row(chat: &ChatSummary) -> String {
    let updated = match Local.timestamp_opt(chat.updated_at_s, 0) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format("%Y-%m-%d %H:%M").to_string()
        }
        chrono::LocalResult::None => "-".to_owned(),
    };

    let mut flags = String::new();
    if chat.pinned {
        flags.push('P');
    }
    if chat.archived {
        flags.push('A');
    }
    if chat.is_shared() {
        flags.push('S');
    }

    let tags = chat
        .tags
        .iter()
        .map(|tag| format!(" #{tag}"))
        .collect::<String>();

    format!("{}  {updated}  {flags:<3} {}{tags}", chat.id, chat.title)
}

fn report_post_auth_tui_bootstrap_failure(error: &anyhow::Error) {
    tracing::error!(
        code = AUTH_TUI_BOOTSTRAP_FAILED,
        error = ?error,
        "post-auth TUI bootstrap failed after successful session persist"
    );

    for line in post_auth_tui_fallback_lines(AUTH_TUI_BOOTSTRAP_FAILED) {
        eprintln!("{line}");
    }
}

fn post_auth_tui_fallback_lines(error_code: &str) -> [String; 3] {
    [
        "Authentication successful. Session is saved.".to_owned(),
        format!("{error_code}: TUI failed to start in this run."),
        "Please restart vchat to enter the TUI using the saved session.".to_owned(),
    ]
}
