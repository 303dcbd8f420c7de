use crate::models::Tab;
use crate::scroll::ScrollCommand;

/// What a failed read was loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    Conversations(Tab),
    Timeline(String),
    /// Single-conversation fetch for a deep link
    Conversation(String),
}

/// Notifications for the presentation layer, produced by `InboxRuntime::process`
/// and the runtime's operations.
#[derive(Debug, Clone, PartialEq)]
pub enum InboxEvent {
    /// Registry contents, counts or list error state changed
    ConversationsChanged,
    TimelineChanged {
        conversation_id: String,
    },
    /// Older history was merged at the head of the timeline
    HistoryPrepended {
        conversation_id: String,
        inserted: usize,
    },
    Scroll(ScrollCommand),
    SendFailed {
        conversation_id: String,
        temp_id: String,
        error: String,
    },
    PatchFailed {
        conversation_ids: Vec<String>,
        error: String,
    },
    /// Star, reaction or delete was rejected
    MessageActionFailed {
        conversation_id: String,
        message_id: String,
        error: String,
    },
    LoadFailed {
        target: LoadTarget,
        error: String,
    },
    TypingChanged {
        conversation_id: String,
        is_typing: bool,
    },
    ConnectionChanged {
        connected: bool,
    },
}
