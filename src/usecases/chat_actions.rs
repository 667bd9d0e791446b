//! Chat management shared by the TUI keys and the CLI subcommands.

use crate::{
    domain::{
        chat::ChatSummary,
        chat_list_state::{ChatListState, PendingToggle},
        open_chat_state::OpenChatState,
    },
    infra::contracts::{ClipboardWriter, ExternalOpener},
};

use super::contracts::{ChatSource, SourceError, UseCaseError};

const TOGGLE_REVERTED: &str = "CHAT_TOGGLE_REVERTED";
const SHARE_COPY_FAILED: &str = "SHARE_LINK_COPY_FAILED";
const SHARE_OPEN_FAILED: &str = "SHARE_LINK_OPEN_FAILED";
const HISTORY_SAVE_FAILED: &str = "CHAT_HISTORY_SAVE_FAILED";

/// Flips the pinned flag locally, then confirms it with the server.
/// The local flip is undone when the server rejects it.
pub fn toggle_pin(
    source: &dyn ChatSource,
    chat_list: &mut ChatListState,
    chat_id: &str,
) -> Result<ChatSummary, UseCaseError> {
    let pending = chat_list.toggle_pin(chat_id).ok_or(UseCaseError::NotFound)?;
    confirm_toggle(chat_list, pending, source.toggle_pin(chat_id))
}

pub fn toggle_archive(
    source: &dyn ChatSource,
    chat_list: &mut ChatListState,
    chat_id: &str,
) -> Result<ChatSummary, UseCaseError> {
    let pending = chat_list
        .toggle_archive(chat_id)
        .ok_or(UseCaseError::NotFound)?;
    confirm_toggle(chat_list, pending, source.toggle_archive(chat_id))
}

fn confirm_toggle(
    chat_list: &mut ChatListState,
    pending: PendingToggle,
    result: Result<ChatSummary, SourceError>,
) -> Result<ChatSummary, UseCaseError> {
    match result {
        Ok(confirmed) => {
            let mut row = chat_list
                .find(&confirmed.id)
                .cloned()
                .unwrap_or_else(|| confirmed.clone());
            row.pinned = confirmed.pinned;
            row.archived = confirmed.archived;
            chat_list.upsert(row.clone());
            Ok(row)
        }
        Err(error) => {
            let error = UseCaseError::from(error);
            tracing::warn!(
                code = TOGGLE_REVERTED,
                chat_id = %pending.chat_id,
                field = ?pending.field,
                error_code = error.code(),
                "chat flag change rejected, reverting"
            );
            chat_list.revert(&pending);
            Err(error)
        }
    }
}

/// Deletes a chat on the server, then drops its row and closes it when open.
pub fn delete_chat(
    source: &dyn ChatSource,
    chat_list: &mut ChatListState,
    open_chat: &mut OpenChatState,
    chat_id: &str,
) -> Result<(), UseCaseError> {
    source.delete_chat(chat_id)?;

    chat_list.remove(chat_id);
    if open_chat.is_showing(chat_id) {
        open_chat.clear();
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub share_id: String,
    pub url: String,
}

pub fn share_url(base_url: &str, share_id: &str) -> String {
    format!("{}/s/{share_id}", base_url.trim_end_matches('/'))
}

pub fn share_chat(
    source: &dyn ChatSource,
    chat_id: &str,
    base_url: &str,
) -> Result<ShareLink, UseCaseError> {
    let share_id = source.share_chat(chat_id)?;
    if share_id.trim().is_empty() {
        return Err(UseCaseError::DataContractViolation);
    }

    Ok(ShareLink {
        url: share_url(base_url, &share_id),
        share_id,
    })
}

pub fn revoke_share(source: &dyn ChatSource, chat_id: &str) -> Result<(), UseCaseError> {
    Ok(source.unshare_chat(chat_id)?)
}

/// Records the share state on the sidebar row.
pub fn mark_shared(chat_list: &mut ChatListState, chat_id: &str, share_id: Option<String>) {
    if let Some(mut row) = chat_list.find(chat_id).cloned() {
        row.share_id = share_id;
        chat_list.upsert(row);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShareDelivery {
    pub copied: bool,
    pub opened: bool,
}

/// Copies the link and optionally opens it. Failures are logged, not returned:
/// the share itself already succeeded.
pub fn deliver_share_link(
    link: &ShareLink,
    clipboard: &dyn ClipboardWriter,
    opener: &dyn ExternalOpener,
    open_in_browser: bool,
) -> ShareDelivery {
    let copied = match clipboard.copy_text(&link.url) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(code = SHARE_COPY_FAILED, error = %error, "failed to copy share link");
            false
        }
    };

    let opened = open_in_browser
        && match opener.open(&link.url) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(code = SHARE_OPEN_FAILED, error = %error, "failed to open share link");
                false
            }
        };

    ShareDelivery { copied, opened }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCommand {
    List,
    Add(String),
    Remove(String),
}

/// Runs a tag command and returns the chat's tags afterwards.
/// Blank tag names only list the current tags.
pub fn manage_tags(
    source: &dyn ChatSource,
    chat_id: &str,
    command: TagCommand,
) -> Result<Vec<String>, UseCaseError> {
    let tags = match command {
        TagCommand::Add(name) if !name.trim().is_empty() => {
            source.add_tag(chat_id, name.trim())?
        }
        TagCommand::Remove(name) if !name.trim().is_empty() => {
            source.remove_tag(chat_id, name.trim())?
        }
        _ => source.list_tags(chat_id)?,
    };

    Ok(tags)
}

/// Writes the open chat's history back to the server. Drafts are skipped.
pub fn save_history(
    source: &dyn ChatSource,
    open_chat: &OpenChatState,
    models: &[String],
) -> Result<(), UseCaseError> {
    let Some(chat_id) = open_chat.chat_id() else {
        return Ok(());
    };

    source
        .update_chat(chat_id, open_chat.chat_title(), models, open_chat.history())
        .map_err(|error| {
            let error = UseCaseError::from(error);
            tracing::warn!(
                code = HISTORY_SAVE_FAILED,
                chat_id,
                error_code = error.code(),
                "failed to save chat history"
            );
            error
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        infra::stubs::{RecordingClipboard, RecordingOpener},
        usecases::stubs::StubBackend,
    };

    fn chat(id: &str) -> ChatSummary {
        ChatSummary {
            id: id.to_owned(),
            title: id.to_uppercase(),
            ..ChatSummary::default()
        }
    }

    fn listed(backend: &StubBackend, ids: &[&str]) -> ChatListState {
        let chats: Vec<_> = ids.iter().map(|id| chat(id)).collect();
        backend.set_recent(chats.clone());
        let mut list = ChatListState::default();
        list.set_ready(chats);
        list
    }

    #[test]
    fn pin_is_kept_when_server_confirms() {
        let backend = StubBackend::default();
        let mut list = listed(&backend, &["a", "b"]);

        let row = toggle_pin(&backend, &mut list, "b").expect("pin");

        assert!(row.pinned);
        assert!(list.find("b").is_some_and(|chat| chat.pinned));
    }

    #[test]
    fn failed_pin_is_reverted() {
        let backend = StubBackend::default();
        backend.fail("toggle_pin", SourceError::Unavailable("down".to_owned()));
        let mut list = listed(&backend, &["a"]);

        let err = toggle_pin(&backend, &mut list, "a").expect_err("must fail");

        assert_eq!(err, UseCaseError::TemporarilyUnavailable("down".to_owned()));
        assert!(list.find("a").is_some_and(|chat| !chat.pinned));
    }

    #[test]
    fn failed_archive_is_reverted() {
        let backend = StubBackend::default();
        backend.fail("toggle_archive", SourceError::Unauthorized);
        let mut list = listed(&backend, &["a"]);

        let err = toggle_archive(&backend, &mut list, "a").expect_err("must fail");

        assert_eq!(err, UseCaseError::Unauthorized);
        assert!(list.find("a").is_some_and(|chat| !chat.archived));
    }

    #[test]
    fn toggling_unknown_row_does_not_call_server() {
        let backend = StubBackend::default();
        let mut list = ChatListState::default();

        assert_eq!(
            toggle_pin(&backend, &mut list, "ghost"),
            Err(UseCaseError::NotFound)
        );
        assert!(!backend.was_called("toggle_pin:ghost"));
    }

    #[test]
    fn delete_closes_the_open_chat() {
        let backend = StubBackend::default();
        let mut list = listed(&backend, &["a", "b"]);
        let mut open = OpenChatState::default();
        open.set_loading("a".to_owned(), "A".to_owned());

        delete_chat(&backend, &mut list, &mut open, "a").expect("delete");

        assert!(list.find("a").is_none());
        assert!(!open.is_open());
    }

    #[test]
    fn share_builds_link_from_base_url() {
        let backend = StubBackend::default();

        let link = share_chat(&backend, "c1", "https://chat.example.com/").expect("share");

        assert_eq!(link.share_id, "share-c1");
        assert_eq!(link.url, "https://chat.example.com/s/share-c1");
    }

    #[test]
    fn share_link_is_copied_and_opened_on_request() {
        let link = ShareLink {
            share_id: "s1".to_owned(),
            url: "https://chat.example.com/s/s1".to_owned(),
        };
        let clipboard = RecordingClipboard::default();
        let opener = RecordingOpener::default();

        let quiet = deliver_share_link(&link, &clipboard, &opener, false);
        let loud = deliver_share_link(&link, &clipboard, &opener, true);

        assert_eq!(quiet, ShareDelivery { copied: true, opened: false });
        assert_eq!(loud, ShareDelivery { copied: true, opened: true });
        assert_eq!(clipboard.copied().len(), 2);
        assert_eq!(opener.opened(), vec![link.url.clone()]);
    }

    #[test]
    fn mark_shared_updates_row() {
        let backend = StubBackend::default();
        let mut list = listed(&backend, &["a"]);

        mark_shared(&mut list, "a", Some("s1".to_owned()));
        assert!(list.find("a").is_some_and(ChatSummary::is_shared));

        mark_shared(&mut list, "a", None);
        assert!(list.find("a").is_some_and(|chat| !chat.is_shared()));
    }

    #[test]
    fn tags_are_added_removed_and_listed() {
        let backend = StubBackend::default();
        backend.set_tags("c1", &["work"]);

        let added = manage_tags(&backend, "c1", TagCommand::Add(" rust ".to_owned())).expect("add");
        assert_eq!(added, vec!["work".to_owned(), "rust".to_owned()]);

        let removed =
            manage_tags(&backend, "c1", TagCommand::Remove("work".to_owned())).expect("remove");
        assert_eq!(removed, vec!["rust".to_owned()]);

        let listed = manage_tags(&backend, "c1", TagCommand::Add("  ".to_owned())).expect("list");
        assert_eq!(listed, vec!["rust".to_owned()]);
        assert!(backend.was_called("list_tags:c1"));
    }

    #[test]
    fn draft_history_is_not_saved() {
        let backend = StubBackend::default();
        let mut open = OpenChatState::default();
        open.start_draft();

        save_history(&backend, &open, &["llama".to_owned()]).expect("save");

        assert!(backend.updates().is_empty());
    }

    #[test]
    fn open_chat_history_is_saved() {
        let backend = StubBackend::default();
        let mut open = OpenChatState::default();
        open.set_loading("c1".to_owned(), "Chat".to_owned());
        open.set_ready(Default::default());

        save_history(&backend, &open, &["llama".to_owned()]).expect("save");

        assert_eq!(backend.updates().len(), 1);
        assert_eq!(backend.updates()[0].0, "c1");
    }
}
