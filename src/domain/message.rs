/// Author role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Progress note attached to a message while the model works (web search, tool call, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusUpdate {
    pub action: Option<String>,
    pub description: String,
    pub done: bool,
}

/// A citation the model used for its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: Option<String>,
}

/// Token accounting reported once a completion finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub id: Option<String>,
    pub name: String,
    pub kind: String,
    pub url: Option<String>,
}

/// A node of the branching chat history.
///
/// `parent_id` and `children_ids` are plain id references into the owning
/// [`ChatHistory`](super::history::ChatHistory); a message never owns its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub role: Role,
    pub content: String,
    pub model: Option<String>,
    pub timestamp_s: i64,
    pub done: bool,
    pub error: Option<String>,
    pub status_history: Vec<StatusUpdate>,
    pub sources: Vec<Source>,
    pub usage: Option<Usage>,
    pub files: Vec<FileAttachment>,
}

impl Message {
    pub fn user(
        id: impl Into<String>,
        parent_id: Option<String>,
        content: impl Into<String>,
        timestamp_s: i64,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id,
            children_ids: Vec::new(),
            role: Role::User,
            content: content.into(),
            model: None,
            timestamp_s,
            done: true,
            error: None,
            status_history: Vec::new(),
            sources: Vec::new(),
            usage: None,
            files: Vec::new(),
        }
    }

    /// Creates an empty assistant message that streaming events will fill in.
    pub fn assistant_placeholder(
        id: impl Into<String>,
        parent_id: Option<String>,
        model: impl Into<String>,
        timestamp_s: i64,
    ) -> Self {
        Self {
            role: Role::Assistant,
            model: Some(model.into()),
            done: false,
            ..Self::user(id, parent_id, String::new(), timestamp_s)
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.role == Role::Assistant && !self.done
    }

    pub fn latest_status(&self) -> Option<&StatusUpdate> {
        self.status_history.last()
    }

    /// Marks the message as failed. A failed message is always finished.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.done = true;
    }

    /// Returns the text shown for this message: file labels first, then content,
    /// falling back to the latest status while the response is still empty.
    pub fn display_content(&self) -> String {
        let files = self
            .files
            .iter()
            .map(|file| format!("[{}: {}]", file.kind, file.name))
            .collect::<Vec<_>>()
            .join(" ");

        let body = if !self.content.is_empty() {
            self.content.clone()
        } else if self.is_streaming() {
            self.latest_status()
                .map(|status| format!("[{}]", status.description))
                .unwrap_or_else(|| "[Thinking...]".to_owned())
        } else {
            String::new()
        };

        match (files.is_empty(), body.is_empty()) {
            (true, _) => body,
            (false, true) => files,
            (false, false) => format!("{files}\n{body}"),
        }
    }
}
