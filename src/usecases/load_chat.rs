use crate::domain::{chat::Chat, open_chat_state::OpenChatState};

use super::contracts::{ChatSource, UseCaseError};

const CHAT_LOAD_FAILED: &str = "CHAT_LOAD_FAILED";

pub fn load_chat(source: &dyn ChatSource, chat_id: &str) -> Result<Chat, UseCaseError> {
    Ok(source.get_chat(chat_id)?)
}

/// Opens a chat in the message pane. On failure the pane shows the error state
/// and the error is returned for the caller to report.
pub fn open_chat(
    source: &dyn ChatSource,
    open_chat: &mut OpenChatState,
    chat_id: &str,
    title: &str,
) -> Result<Chat, UseCaseError> {
    open_chat.set_loading(chat_id.to_owned(), title.to_owned());

    match load_chat(source, chat_id) {
        Ok(chat) => {
            open_chat.set_title(&chat.summary.title);
            open_chat.set_ready(chat.history.clone());
            Ok(chat)
        }
        Err(error) => {
            tracing::warn!(
                code = CHAT_LOAD_FAILED,
                chat_id,
                error_code = error.code(),
                "failed to load chat"
            );
            open_chat.set_error();
            Err(error)
        }
    }
}
