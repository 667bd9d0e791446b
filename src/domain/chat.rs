use super::history::ChatHistory;

/// Sidebar row for a chat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub updated_at_s: i64,
    pub created_at_s: i64,
    pub pinned: bool,
    pub archived: bool,
    pub tags: Vec<String>,
    /// Present while the chat is publicly shared.
    pub share_id: Option<String>,
}

impl ChatSummary {
    pub fn is_shared(&self) -> bool {
        self.share_id.is_some()
    }
}

/// A fully loaded chat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chat {
    pub summary: ChatSummary,
    pub history: ChatHistory,
    /// Models the chat was last used with.
    pub models: Vec<String>,
}

/// Title given to a chat created from its first message.
pub fn title_from_first_message(text: &str) -> String {
    const MAX_TITLE_CHARS: usize = 50;

    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= MAX_TITLE_CHARS {
        return normalized;
    }

    let truncated: String = normalized.chars().take(MAX_TITLE_CHARS).collect();
    format!("{}...", truncated.trim_end())
}
