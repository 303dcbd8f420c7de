use std::collections::HashMap;

use super::registry::ConversationRegistry;
use super::timeline::MessageTimeline;
use crate::models::Tab;

/// Owned per-session store: the conversation registry plus one timeline per
/// conversation that has been opened. Constructed at session start and torn down
/// with `clear()` on logout.
pub struct InboxStore {
    pub registry: ConversationRegistry,
    timelines: HashMap<String, MessageTimeline>,
    selected: Option<String>,
    active_tab: Tab,
    search: Option<String>,
}

impl Default for InboxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InboxStore {
    pub fn new() -> Self {
        Self {
            registry: ConversationRegistry::new(),
            timelines: HashMap::new(),
            selected: None,
            active_tab: Tab::All,
            search: None,
        }
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.timelines.clear();
        self.selected = None;
        self.active_tab = Tab::All;
        self.search = None;
    }

    // ===== Getters =====

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, conversation_id: &str) -> bool {
        self.selected.as_deref() == Some(conversation_id)
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn timeline(&self, conversation_id: &str) -> Option<&MessageTimeline> {
        self.timelines.get(conversation_id)
    }

    pub fn selected_timeline(&self) -> Option<&MessageTimeline> {
        self.selected.as_deref().and_then(|id| self.timelines.get(id))
    }

    // ===== Mutations =====

    pub fn timeline_mut(&mut self, conversation_id: &str) -> &mut MessageTimeline {
        self.timelines
            .entry(conversation_id.to_string())
            .or_insert_with(|| MessageTimeline::new(conversation_id))
    }

    pub fn existing_timeline_mut(&mut self, conversation_id: &str) -> Option<&mut MessageTimeline> {
        self.timelines.get_mut(conversation_id)
    }

    pub fn select(&mut self, conversation_id: Option<String>) {
        self.selected = conversation_id;
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.search = search.filter(|s| !s.trim().is_empty());
    }
}
