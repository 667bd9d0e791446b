use anyhow::Result;
use ratatui::{backend::Backend, Terminal};

use crate::{
    domain::shell_state::ExitReason,
    usecases::contracts::{AppEventSource, ShellOrchestrator},
};

use super::{terminal::TerminalSession, view};

const TUI_SHELL_STARTED: &str = "TUI_SHELL_STARTED";
const TUI_SHELL_STOPPED: &str = "TUI_SHELL_STOPPED";

/// Runs the interactive shell on the real terminal until the user quits or
/// the session needs a new sign-in.
pub fn start(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<ExitReason> {
    tracing::info!(
        code = TUI_SHELL_STARTED,
        chats = orchestrator.state().chat_list().all_chats().len(),
        models = orchestrator.state().models().models().len(),
        "starting TUI shell"
    );

    let mut session = TerminalSession::new()?;
    let reason = run_loop(session.terminal_mut(), event_source, orchestrator)?;

    tracing::info!(code = TUI_SHELL_STOPPED, reason = ?reason, "TUI shell stopped");
    Ok(reason)
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<ExitReason> {
    while orchestrator.state().is_running() {
        terminal.draw(|frame| view::render(frame, orchestrator.state_mut()))?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(orchestrator
        .state()
        .exit_reason()
        .unwrap_or(ExitReason::UserQuit))
}
