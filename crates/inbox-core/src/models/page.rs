use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::conversation::{Conversation, Tab};
use super::message::Message;

/// Per-tab conversation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabCounts(BTreeMap<Tab, u32>);

impl TabCounts {
    pub fn get(&self, tab: Tab) -> u32 {
        self.0.get(&tab).copied().unwrap_or(0)
    }

    pub fn set(&mut self, tab: Tab, count: u32) {
        self.0.insert(tab, count);
    }

    /// Full recompute from a set of conversations.
    pub fn from_conversations<'a>(conversations: impl IntoIterator<Item = &'a Conversation>) -> Self {
        let mut counts = Self::default();
        for conv in conversations {
            counts.add(conv);
        }
        counts
    }

    pub fn add(&mut self, conv: &Conversation) {
        for tab in Tab::ALL_TABS {
            if conv.in_tab(tab) {
                *self.0.entry(tab).or_insert(0) += 1;
            }
        }
    }

    pub fn remove(&mut self, conv: &Conversation) {
        for tab in Tab::ALL_TABS {
            if conv.in_tab(tab) {
                let count = self.0.entry(tab).or_insert(0);
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Incremental adjustment for one conversation changing from `before` to `after`.
    pub fn apply_change(&mut self, before: Option<&Conversation>, after: &Conversation) {
        if let Some(before) = before {
            self.remove(before);
        }
        self.add(after);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub page: u32,
    pub has_more: bool,
    #[serde(default)]
    pub counts: Option<TabCounts>,
}

/// One page of history, oldest first. Page 1 is the newest page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub page: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationQuery {
    pub tab: Tab,
    pub page: u32,
    pub search: Option<String>,
}

impl ConversationQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("tab", self.tab.as_str().to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_deserialize_from_object() {
        let counts: TabCounts =
            serde_json::from_str(r#"{"all": 12, "unreplied": 3, "spam": 1}"#).unwrap();
        assert_eq!(counts.get(Tab::All), 12);
        assert_eq!(counts.get(Tab::Unreplied), 3);
        assert_eq!(counts.get(Tab::Done), 0);
    }

    #[test]
    fn test_remove_saturates() {
        let mut counts = TabCounts::default();
        counts.set(Tab::Unreplied, 0);
        let conv: Conversation = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "customer": { "id": "x", "name": "X" },
            "status": "open",
            "lastMessage": { "text": "hi", "timestamp": "2024-01-01T00:00:00Z", "isFromCustomer": true }
        }))
        .unwrap();
        counts.remove(&conv);
        assert_eq!(counts.get(Tab::Unreplied), 0);
    }
}
