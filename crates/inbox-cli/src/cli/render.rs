use inbox_core::models::{Conversation, DeliveryStatus, Message, TabCounts, Tab};
use inbox_core::store::{InboxStore, MessageTimeline};
use inbox_core::InboxEvent;

const PREVIEW_CHARS: usize = 48;

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

pub fn conversation_line(conversation: &Conversation) -> String {
    let preview = conversation
        .last_message
        .as_ref()
        .map(|p| truncate(&p.text, PREVIEW_CHARS))
        .unwrap_or_default();
    let unread = if conversation.unread_count > 0 {
        format!("({})", conversation.unread_count)
    } else {
        String::new()
    };
    format!(
        "{:<12} {:<9} {:>4}  {}  {}",
        conversation.id,
        conversation.tab(),
        unread,
        conversation.customer.name,
        preview
    )
}

fn status_label(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Sending => "sending",
        DeliveryStatus::Sent => "sent",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Read => "read",
        DeliveryStatus::Error => "failed",
    }
}

/// One timeline row. Customer messages show whether they were answered,
/// agent messages show their delivery status.
pub fn message_line(message: &Message, answered: bool) -> String {
    let marker = if message.is_from_customer {
        if answered {
            "answered"
        } else {
            "awaiting reply"
        }
    } else {
        status_label(message.status)
    };
    let sender = if message.sender_name.is_empty() {
        &message.sender_id
    } else {
        &message.sender_name
    };
    let star = if message.is_starred() { " *" } else { "" };
    format!(
        "[{}] {}: {} [{}]{}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        sender,
        message.content,
        marker,
        star
    )
}

pub fn timeline_lines(timeline: &MessageTimeline) -> Vec<String> {
    timeline
        .messages()
        .iter()
        .map(|m| message_line(m, timeline.is_answered(&m.id)))
        .collect()
}

pub fn counts_line(counts: &TabCounts) -> String {
    Tab::ALL_TABS
        .iter()
        .map(|tab| format!("{}={}", tab, counts.get(*tab)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable line for a live event, or None for purely visual events.
pub fn event_line(event: &InboxEvent, store: &InboxStore) -> Option<String> {
    match event {
        InboxEvent::ConversationsChanged => Some(format!("counts: {}", counts_line(&store.registry.counts()))),
        InboxEvent::TimelineChanged { conversation_id } => {
            let timeline = store.timeline(conversation_id)?;
            let last = timeline.last()?;
            Some(format!(
                "{} {}",
                conversation_id,
                message_line(last, timeline.is_answered(&last.id))
            ))
        }
        InboxEvent::TypingChanged {
            conversation_id,
            is_typing: true,
        } => Some(format!("{} assistant is typing...", conversation_id)),
        InboxEvent::TypingChanged { .. } => None,
        InboxEvent::ConnectionChanged { connected: true } => Some("push: connected".to_string()),
        InboxEvent::ConnectionChanged { connected: false } => {
            Some("push: disconnected, polling".to_string())
        }
        InboxEvent::SendFailed {
            conversation_id,
            error,
            ..
        } => Some(format!("{} send failed: {}", conversation_id, error)),
        InboxEvent::PatchFailed {
            conversation_ids,
            error,
        } => Some(format!("update of {} failed: {}", conversation_ids.join(","), error)),
        InboxEvent::MessageActionFailed {
            message_id, error, ..
        } => Some(format!("action on {} failed: {}", message_id, error)),
        InboxEvent::LoadFailed { target, error } => Some(format!("load {:?} failed: {}", target, error)),
        InboxEvent::HistoryPrepended { .. } | InboxEvent::Scroll(_) => None,
    }
}
