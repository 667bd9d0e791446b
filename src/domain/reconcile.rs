//! Applies streamed channel updates to in-memory messages.
//!
//! Updates are applied in delivery order with no deduplication or replay; a missed
//! event simply leaves the message incomplete until the chat is reloaded.

use super::{
    history::ChatHistory,
    message::Message,
    stream::{ChannelEvent, StreamUpdate},
};

/// Text used when an error event carries no message of its own.
pub const DEFAULT_STREAM_ERROR: &str = "Something went wrong while generating the response.";

/// Finds a message by id for mutation.
pub trait MessageLookup {
    fn message_mut(&mut self, id: &str) -> Option<&mut Message>;
}

impl MessageLookup for ChatHistory {
    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.get_mut(id)
    }
}

impl MessageLookup for [Message] {
    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.iter_mut().find(|message| message.id == id)
    }
}

impl MessageLookup for Vec<Message> {
    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.as_mut_slice().message_mut(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The message was patched. `finished` is true when this update completed it.
    Applied { finished: bool },
    /// The chat title changed; the message itself may also have been patched.
    TitleChanged { title: String, finished: bool },
    MessageNotFound,
    Ignored { kind: String },
}

pub fn apply<S>(store: &mut S, event: &ChannelEvent) -> ReconcileOutcome
where
    S: MessageLookup + ?Sized,
{
    if let StreamUpdate::Title(title) = &event.update {
        return ReconcileOutcome::TitleChanged {
            title: title.clone(),
            finished: false,
        };
    }

    if let StreamUpdate::Unknown { kind } = &event.update {
        return ReconcileOutcome::Ignored { kind: kind.clone() };
    }

    let Some(message) = store.message_mut(&event.message_id) else {
        return ReconcileOutcome::MessageNotFound;
    };

    let was_done = message.done;
    let mut title = None;

    match &event.update {
        StreamUpdate::Status(status) => message.status_history.push(status.clone()),
        StreamUpdate::Delta { content } => message.content.push_str(content),
        StreamUpdate::Replace { content } => message.content = content.clone(),
        StreamUpdate::Files(files) => message.files = files.clone(),
        StreamUpdate::Error { message: text } => {
            message.fail(text.clone().unwrap_or_else(|| DEFAULT_STREAM_ERROR.to_owned()));
        }
        StreamUpdate::Completion(update) => {
            if let Some(error) = update.error.as_ref() {
                message.fail(error.clone());
            }
            if !update.sources.is_empty() {
                message.sources = update.sources.clone();
            }
            if let Some(delta) = update.delta.as_deref() {
                message.content.push_str(delta);
            }
            if let Some(content) = update.content.as_ref() {
                message.content = content.clone();
            }
            if let Some(usage) = update.usage {
                message.usage = Some(usage);
            }
            if update.done {
                message.done = true;
            }
            title = update.title.clone();
        }
        StreamUpdate::Title(_) | StreamUpdate::Unknown { .. } => {}
    }

    let finished = !was_done && message.done;
    match title {
        Some(title) => ReconcileOutcome::TitleChanged { title, finished },
        None => ReconcileOutcome::Applied { finished },
    }
}
