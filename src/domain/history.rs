//! Branching chat history stored as an arena of messages keyed by id.
//!
//! Every edit or regeneration adds a sibling under the same parent, so a chat is a
//! tree. `current_id` points at the leaf of the branch the user is looking at and the
//! displayed conversation is the path from the root down to it.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::message::Message;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("current message {0} is not part of the history")]
    UnknownCurrent(String),
    #[error("parent message {0} is not part of the history")]
    UnknownParent(String),
    #[error("message {0} already exists in the history")]
    DuplicateId(String),
}

/// Direction for switching between sibling branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDirection {
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatHistory {
    messages: HashMap<String, Message>,
    current_id: Option<String>,
}

impl ChatHistory {
    /// Builds a history, rejecting a `current_id` that does not reference a message.
    ///
    /// Links to missing messages are dropped: a dangling `parent_id` turns the
    /// message into a root, dangling `children_ids` entries are removed.
    pub fn new(
        messages: impl IntoIterator<Item = Message>,
        current_id: Option<String>,
    ) -> Result<Self, HistoryError> {
        let messages = sanitize_links(messages.into_iter().map(|m| (m.id.clone(), m)).collect());

        if let Some(id) = current_id.as_ref() {
            if !messages.contains_key(id) {
                return Err(HistoryError::UnknownCurrent(id.clone()));
            }
        }

        Ok(Self {
            messages,
            current_id,
        })
    }

    /// Builds a history whose current message is the newest leaf.
    pub fn recover(messages: impl IntoIterator<Item = Message>) -> Self {
        let messages = sanitize_links(messages.into_iter().map(|m| (m.id.clone(), m)).collect());
        let current_id = newest_leaf(&messages);

        Self {
            messages,
            current_id,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.get_mut(id)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Adds a message under its `parent_id` (or as a new root) and makes it current.
    pub fn append(&mut self, mut message: Message) -> Result<(), HistoryError> {
        if self.messages.contains_key(&message.id) {
            return Err(HistoryError::DuplicateId(message.id));
        }

        if let Some(parent_id) = message.parent_id.as_deref() {
            let parent = self
                .messages
                .get_mut(parent_id)
                .ok_or_else(|| HistoryError::UnknownParent(parent_id.to_owned()))?;
            parent.children_ids.push(message.id.clone());
        }

        message.children_ids.clear();
        self.current_id = Some(message.id.clone());
        self.messages.insert(message.id.clone(), message);
        Ok(())
    }

    /// Returns the displayed conversation: the path from the root to `current_id`.
    pub fn thread(&self) -> Vec<&Message> {
        let mut path = Vec::new();
        let mut cursor = self.current_id.as_deref();

        // The length bound stops a malformed parent cycle from looping forever.
        while let Some(id) = cursor {
            if path.len() >= self.messages.len() {
                break;
            }
            let Some(message) = self.messages.get(id) else {
                break;
            };
            path.push(message);
            cursor = message.parent_id.as_deref();
        }

        path.reverse();
        path
    }

    /// Returns the ids of `id` and its siblings, in creation order.
    pub fn siblings(&self, id: &str) -> Vec<&str> {
        let Some(message) = self.messages.get(id) else {
            return Vec::new();
        };

        match message.parent_id.as_deref().and_then(|p| self.messages.get(p)) {
            Some(parent) => parent.children_ids.iter().map(String::as_str).collect(),
            None => {
                let mut roots: Vec<&Message> = self
                    .messages
                    .values()
                    .filter(|m| m.parent_id.is_none())
                    .collect();
                roots.sort_by(|a, b| (a.timestamp_s, &a.id).cmp(&(b.timestamp_s, &b.id)));
                roots.into_iter().map(|m| m.id.as_str()).collect()
            }
        }
    }

    /// Returns the zero-based position of `id` among its siblings and the sibling count.
    pub fn sibling_position(&self, id: &str) -> Option<(usize, usize)> {
        let siblings = self.siblings(id);
        siblings
            .iter()
            .position(|sibling| *sibling == id)
            .map(|index| (index, siblings.len()))
    }

    /// Moves to the neighbouring sibling of `id` and descends to that branch's newest leaf.
    ///
    /// Returns the new current id, or `None` when there is no sibling in that direction.
    pub fn switch_sibling(&mut self, id: &str, direction: BranchDirection) -> Option<String> {
        let siblings = self.siblings(id);
        let index = siblings.iter().position(|sibling| *sibling == id)?;

        let target = match direction {
            BranchDirection::Previous => index.checked_sub(1)?,
            BranchDirection::Next => index + 1,
        };
        let sibling = siblings.get(target)?.to_string();

        let leaf = self.leaf_of(&sibling);
        self.current_id = Some(leaf.clone());
        Some(leaf)
    }

    /// Follows the most recent child from `id` down to a leaf.
    pub fn leaf_of(&self, id: &str) -> String {
        let mut cursor = id.to_owned();
        let mut steps = 0;

        while let Some(last_child) = self
            .messages
            .get(&cursor)
            .and_then(|m| m.children_ids.last())
        {
            if steps >= self.messages.len() {
                break;
            }
            cursor = last_child.clone();
            steps += 1;
        }

        cursor
    }
}

fn sanitize_links(mut messages: HashMap<String, Message>) -> HashMap<String, Message> {
    let ids: HashSet<String> = messages.keys().cloned().collect();

    for message in messages.values_mut() {
        if let Some(parent_id) = message.parent_id.as_ref() {
            if !ids.contains(parent_id) {
                message.parent_id = None;
            }
        }
        message.children_ids.retain(|child| ids.contains(child));
    }

    messages
}

fn newest_leaf(messages: &HashMap<String, Message>) -> Option<String> {
    messages
        .values()
        .filter(|m| m.children_ids.is_empty())
        .max_by(|a, b| (a.timestamp_s, &a.id).cmp(&(b.timestamp_s, &b.id)))
        .map(|m| m.id.clone())
}
