use std::collections::{HashMap, HashSet};

use crate::models::{Conversation, ConversationPage, ConversationPatch, Message, MessagePreview, Tab, TabCounts};

/// Forward pagination cursor for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabPagination {
    pub next_page: u32,
    pub has_more: bool,
    pub error: Option<String>,
}

impl Default for TabPagination {
    fn default() -> Self {
        Self {
            next_page: 1,
            has_more: true,
            error: None,
        }
    }
}

/// Conversations known to this session, keyed by id.
///
/// Tab counts are kept as an aggregate that is adjusted by membership diffing on
/// every change. An authoritative page that carries counts replaces the aggregate;
/// until one arrives, counts are recomputed from the local set.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    conversations: HashMap<String, Conversation>,
    counts: Option<TabCounts>,
    pagination: HashMap<Tab, TabPagination>,
    /// `(tab, page)` requests currently in flight
    in_flight: HashSet<(Tab, u32)>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
        self.counts = None;
        self.pagination.clear();
        self.in_flight.clear();
    }

    // ===== Getters =====

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Conversations in `tab`, newest activity first, optionally narrowed by a search term.
    pub fn list(&self, tab: Tab, search: Option<&str>) -> Vec<&Conversation> {
        let mut list: Vec<&Conversation> = self
            .conversations
            .values()
            .filter(|c| c.in_tab(tab))
            .filter(|c| search.map_or(true, |term| c.matches_search(term)))
            .collect();
        list.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    pub fn counts(&self) -> TabCounts {
        self.counts
            .clone()
            .unwrap_or_else(|| TabCounts::from_conversations(self.conversations.values()))
    }

    pub fn pagination(&self, tab: Tab) -> TabPagination {
        self.pagination.get(&tab).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self, tab: Tab) -> bool {
        self.in_flight.iter().any(|(t, _)| *t == tab)
    }

    // ===== Mutations =====

    /// Insert or replace a conversation with an authoritative copy (last write wins).
    /// Returns false when nothing changed.
    pub fn upsert(&mut self, conversation: Conversation) -> bool {
        let before = self.conversations.get(&conversation.id);
        if before == Some(&conversation) {
            return false;
        }
        if let Some(counts) = self.counts.as_mut() {
            counts.apply_change(before, &conversation);
        }
        self.conversations
            .insert(conversation.id.clone(), conversation);
        true
    }

    /// Optimistic local mutation. The next authoritative upsert overwrites it.
    pub fn patch(&mut self, id: &str, patch: &ConversationPatch) -> Option<&Conversation> {
        let conversation = self.conversations.get_mut(id)?;
        let before = conversation.clone();
        conversation.apply_patch(patch);
        if let Some(counts) = self.counts.as_mut() {
            counts.apply_change(Some(&before), conversation);
        }
        Some(conversation)
    }

    /// Move the denormalized preview forward to `message` if it is newer.
    pub fn apply_preview(&mut self, message: &Message, count_unread: bool) -> bool {
        let Some(conversation) = self.conversations.get_mut(&message.conversation_id) else {
            return false;
        };
        if conversation
            .last_activity()
            .is_some_and(|at| at > message.timestamp)
        {
            return false;
        }

        let preview = MessagePreview {
            text: message.content.clone(),
            timestamp: message.timestamp,
            is_from_customer: message.is_from_customer,
        };
        // Redelivered event
        if conversation.last_message.as_ref() == Some(&preview) {
            return false;
        }

        let before = conversation.clone();
        conversation.last_message = Some(preview);
        if count_unread && message.is_from_customer {
            conversation.unread_count += 1;
        }
        if let Some(counts) = self.counts.as_mut() {
            counts.apply_change(Some(&before), conversation);
        }
        true
    }

    // ===== Pagination =====

    /// Claim the next page for `tab`. None when exhausted or when the same
    /// `(tab, page)` is already in flight.
    pub fn begin_next_page(&mut self, tab: Tab) -> Option<u32> {
        let cursor = self.pagination(tab);
        if !cursor.has_more {
            return None;
        }
        self.in_flight
            .insert((tab, cursor.next_page))
            .then_some(cursor.next_page)
    }

    /// Claim a reload of the first page for `tab`.
    pub fn begin_refresh(&mut self, tab: Tab) -> bool {
        self.in_flight.insert((tab, 1))
    }

    /// Merge an authoritative page fetched for `requested`. Applying the same
    /// page twice is a no-op.
    pub fn apply_page(&mut self, tab: Tab, requested: u32, page: ConversationPage) -> usize {
        self.in_flight.remove(&(tab, requested));

        let mut changed = 0;
        for conversation in page.conversations {
            if self.upsert(conversation) {
                changed += 1;
            }
        }
        match page.counts {
            Some(counts) => self.counts = Some(counts),
            None if self.counts.is_none() => {
                self.counts = Some(TabCounts::from_conversations(self.conversations.values()));
            }
            None => {}
        }

        let cursor = self.pagination.entry(tab).or_default();
        if requested >= cursor.next_page {
            cursor.next_page = requested + 1;
            cursor.has_more = page.has_more;
        }
        cursor.error = None;
        changed
    }

    pub fn fail_page(&mut self, tab: Tab, page: u32, error: String) {
        self.in_flight.remove(&(tab, page));
        self.pagination.entry(tab).or_default().error = Some(error);
    }

    /// Restart pagination for `tab` (tab switch or new search term).
    pub fn reset_tab(&mut self, tab: Tab) {
        self.pagination.remove(&tab);
        self.in_flight.retain(|(t, _)| *t != tab);
    }
}
