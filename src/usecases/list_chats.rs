use std::collections::HashMap;

use crate::domain::chat::ChatSummary;

use super::contracts::{ChatListing, ChatSource, UseCaseError};

const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChatsQuery {
    pub page: u32,
    pub include_pinned: bool,
    pub include_archived: bool,
}

impl Default for ListChatsQuery {
    fn default() -> Self {
        Self {
            page: FIRST_PAGE,
            include_pinned: true,
            include_archived: false,
        }
    }
}

impl ListChatsQuery {
    fn normalized_page(&self) -> u32 {
        self.page.max(FIRST_PAGE)
    }
}

/// Fetches the sidebar rows: recent chats merged with the pinned (and optionally
/// archived) listings, newest first. A chat listed twice keeps one row whose
/// pinned and archived flags are OR-merged across listings.
pub fn list_chats(
    source: &dyn ChatSource,
    query: ListChatsQuery,
) -> Result<Vec<ChatSummary>, UseCaseError> {
    let mut listings = vec![ChatListing::Recent {
        page: query.normalized_page(),
    }];
    if query.include_pinned {
        listings.push(ChatListing::Pinned);
    }
    if query.include_archived {
        listings.push(ChatListing::Archived);
    }

    let mut merged: Vec<ChatSummary> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for listing in listings {
        for chat in source.list_chats(listing)? {
            match positions.get(&chat.id) {
                Some(&index) => {
                    let existing = &mut merged[index];
                    existing.pinned |= chat.pinned;
                    existing.archived |= chat.archived;
                }
                None => {
                    positions.insert(chat.id.clone(), merged.len());
                    merged.push(chat);
                }
            }
        }
    }

    merged.sort_by(|left, right| right.updated_at_s.cmp(&left.updated_at_s));
    Ok(merged)
}

/// Fetches a single listing as-is.
pub fn list_chats_only(
    source: &dyn ChatSource,
    listing: ChatListing,
) -> Result<Vec<ChatSummary>, UseCaseError> {
    Ok(source.list_chats(listing)?)
}
