use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Pending,
    Resolved,
    Done,
}

impl ConversationStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, ConversationStatus::Resolved | ConversationStatus::Done)
    }
}

/// Explicit classification tag carried in conversation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Main,
    General,
    Requests,
    Spam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    All,
    Unreplied,
    Done,
    Main,
    General,
    Requests,
    Spam,
}

impl Tab {
    pub const ALL_TABS: [Tab; 7] = [
        Tab::All,
        Tab::Unreplied,
        Tab::Done,
        Tab::Main,
        Tab::General,
        Tab::Requests,
        Tab::Spam,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::All => "all",
            Tab::Unreplied => "unreplied",
            Tab::Done => "done",
            Tab::Main => "main",
            Tab::General => "general",
            Tab::Requests => "requests",
            Tab::Spam => "spam",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL_TABS.into_iter().find(|tab| tab.as_str() == s)
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<Classification> for Tab {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Main => Tab::Main,
            Classification::General => Tab::General,
            Classification::Requests => Tab::Requests,
            Classification::Spam => Tab::Spam,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Denormalized copy of the newest message, used for list rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePreview {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_customer: bool,
}

/// Conversation metadata blob. Only the classification is interpreted; everything
/// else is kept verbatim so a round trip through the client loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub customer: Customer,
    #[serde(default)]
    pub last_message: Option<MessagePreview>,
    #[serde(default)]
    pub unread_count: u32,
    pub status: ConversationStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub snoozed_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: ConversationMetadata,
}

impl Conversation {
    /// Home tab. Derived from status and the classification tag only, so it can
    /// never drift from the fields it depends on.
    pub fn tab(&self) -> Tab {
        if self.status.is_closed() {
            return Tab::Done;
        }
        self.metadata
            .classification
            .map(Tab::from)
            .unwrap_or(Tab::Main)
    }

    /// Whether the newest known message came from the customer and the
    /// conversation is still open.
    pub fn awaiting_reply(&self) -> bool {
        !self.status.is_closed()
            && self
                .last_message
                .as_ref()
                .is_some_and(|preview| preview.is_from_customer)
    }

    /// Membership used for list filtering and tab counts.
    pub fn in_tab(&self, tab: Tab) -> bool {
        let home = self.tab();
        match tab {
            Tab::All => home != Tab::Spam,
            Tab::Unreplied => home != Tab::Spam && self.awaiting_reply(),
            other => home == other,
        }
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().map(|preview| preview.timestamp)
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.customer.name.to_lowercase().contains(&term)
            || self
                .customer
                .phone
                .as_deref()
                .is_some_and(|phone| phone.contains(&term))
            || self
                .last_message
                .as_ref()
                .is_some_and(|preview| preview.text.to_lowercase().contains(&term))
    }

    pub fn apply_patch(&mut self, patch: &ConversationPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assigned_to) = &patch.assigned_to {
            self.assigned_to = assigned_to.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(classification) = patch.classification {
            self.metadata.classification = classification;
        }
        if let Some(snoozed_until) = patch.snoozed_until {
            self.snoozed_until = snoozed_until;
        }
        if let Some(ai_enabled) = patch.ai_enabled {
            self.ai_enabled = ai_enabled;
        }
        if let Some(unread_count) = patch.unread_count {
            self.unread_count = unread_count;
        }
    }
}

/// Partial update for `PUT /conversations/{id}` and the bulk endpoint.
/// `Some(None)` clears a nullable field; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Option<Classification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_enabled: Option<bool>,
    /// Local-only: opening a conversation clears its unread counter.
    #[serde(skip)]
    pub unread_count: Option<u32>,
}

impl ConversationPatch {
    pub fn status(status: ConversationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_test_conversation(status: ConversationStatus, from_customer: bool) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            customer: Customer {
                id: "cust1".to_string(),
                name: "Ana Souza".to_string(),
                phone: Some("+5511999".to_string()),
            },
            last_message: Some(MessagePreview {
                text: "Where is my order?".to_string(),
                timestamp: Utc.timestamp_opt(100, 0).unwrap(),
                is_from_customer: from_customer,
            }),
            unread_count: 1,
            status,
            assigned_to: None,
            priority: false,
            snoozed_until: None,
            ai_enabled: true,
            tags: vec![],
            metadata: ConversationMetadata::default(),
        }
    }

    #[test]
    fn test_tab_follows_status_and_classification() {
        let mut conv = make_test_conversation(ConversationStatus::Open, true);
        assert_eq!(conv.tab(), Tab::Main);

        conv.metadata.classification = Some(Classification::Requests);
        assert_eq!(conv.tab(), Tab::Requests);

        conv.status = ConversationStatus::Resolved;
        assert_eq!(conv.tab(), Tab::Done);
    }

    #[test]
    fn test_unreplied_membership() {
        let conv = make_test_conversation(ConversationStatus::Open, true);
        assert!(conv.in_tab(Tab::Unreplied));
        assert!(conv.in_tab(Tab::All));

        let answered = make_test_conversation(ConversationStatus::Open, false);
        assert!(!answered.in_tab(Tab::Unreplied));

        let done = make_test_conversation(ConversationStatus::Done, true);
        assert!(!done.in_tab(Tab::Unreplied));
        assert!(done.in_tab(Tab::Done));
    }

    #[test]
    fn test_spam_is_hidden_from_all() {
        let mut conv = make_test_conversation(ConversationStatus::Open, true);
        conv.metadata.classification = Some(Classification::Spam);
        assert!(!conv.in_tab(Tab::All));
        assert!(!conv.in_tab(Tab::Unreplied));
        assert!(conv.in_tab(Tab::Spam));
    }

    #[test]
    fn test_patch_clears_nullable_fields() {
        let mut conv = make_test_conversation(ConversationStatus::Open, true);
        conv.assigned_to = Some("agent-1".to_string());

        let patch = ConversationPatch {
            assigned_to: Some(None),
            priority: Some(true),
            ..Default::default()
        };
        conv.apply_patch(&patch);

        assert_eq!(conv.assigned_to, None);
        assert!(conv.priority);
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = ConversationPatch {
            status: Some(ConversationStatus::Done),
            assigned_to: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "done", "assignedTo": null })
        );
    }

    #[test]
    fn test_metadata_keeps_unknown_keys() {
        let json = serde_json::json!({
            "id": "c9",
            "customer": { "id": "x", "name": "X" },
            "status": "pending",
            "metadata": { "classification": "general", "source": "whatsapp" }
        });
        let conv: Conversation = serde_json::from_value(json).unwrap();
        assert_eq!(conv.tab(), Tab::General);
        assert_eq!(
            conv.metadata.extra.get("source"),
            Some(&Value::String("whatsapp".to_string()))
        );
    }

    #[test]
    fn test_search_matches_name_and_preview() {
        let conv = make_test_conversation(ConversationStatus::Open, true);
        assert!(conv.matches_search("ana"));
        assert!(conv.matches_search("ORDER"));
        assert!(conv.matches_search("  "));
        assert!(!conv.matches_search("refund"));
    }
}
