use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::InboxError;
use crate::models::{Conversation, Message};

/// Push event received from the real-time transport, one JSON object per frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum PushEvent {
    #[serde(rename = "new_message", rename_all = "camelCase")]
    NewMessage {
        conversation_id: String,
        message: Message,
        /// Full conversation record, sent when the message opened a new conversation
        #[serde(default)]
        conversation: Option<Conversation>,
    },
    #[serde(rename = "ai_typing", rename_all = "camelCase")]
    Typing {
        conversation_id: String,
        is_typing: bool,
    },
    #[serde(rename = "messages_read", rename_all = "camelCase")]
    MessagesRead {
        conversation_id: String,
        watermark: DateTime<Utc>,
    },
}

impl PushEvent {
    /// Parse one frame. Unknown types, missing conversation ids and payloads whose
    /// ids disagree are rejected as malformed.
    pub fn parse(frame: &str) -> Result<Self, InboxError> {
        let event: PushEvent =
            serde_json::from_str(frame).map_err(|e| InboxError::MalformedEvent {
                reason: e.to_string(),
            })?;

        if event.conversation_id().trim().is_empty() {
            return Err(InboxError::MalformedEvent {
                reason: "empty conversationId".to_string(),
            });
        }
        if let PushEvent::NewMessage {
            conversation_id,
            message,
            ..
        } = &event
        {
            if message.conversation_id != *conversation_id {
                return Err(InboxError::MalformedEvent {
                    reason: format!(
                        "message {} belongs to {}, not {}",
                        message.id, message.conversation_id, conversation_id
                    ),
                });
            }
        }
        Ok(event)
    }

    pub fn conversation_id(&self) -> &str {
        match self {
            PushEvent::NewMessage {
                conversation_id, ..
            } => conversation_id,
            PushEvent::Typing {
                conversation_id, ..
            } => conversation_id,
            PushEvent::MessagesRead {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

/// Everything a transport can report.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    Connected,
    Disconnected,
    Event(PushEvent),
    Malformed { reason: String },
}

impl TransportSignal {
    /// Turn a raw frame into a signal; parse failures become `Malformed`.
    pub fn from_frame(frame: &str) -> Self {
        match PushEvent::parse(frame) {
            Ok(event) => TransportSignal::Event(event),
            Err(e) => TransportSignal::Malformed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_new_message() {
        let frame = r#"{
            "type": "new_message",
            "conversationId": "c1",
            "message": {
                "id": "m1",
                "conversationId": "c1",
                "senderId": "cust",
                "content": "hello",
                "isFromCustomer": true,
                "timestamp": "2024-05-01T10:00:00Z"
            }
        }"#;
        match PushEvent::parse(frame).unwrap() {
            PushEvent::NewMessage {
                conversation_id,
                message,
                conversation,
            } => {
                assert_eq!(conversation_id, "c1");
                assert_eq!(message.content, "hello");
                assert!(conversation.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_typing_and_read() {
        let typing =
            PushEvent::parse(r#"{"type":"ai_typing","conversationId":"c1","isTyping":true}"#)
                .unwrap();
        assert_eq!(
            typing,
            PushEvent::Typing {
                conversation_id: "c1".to_string(),
                is_typing: true
            }
        );

        let read = PushEvent::parse(
            r#"{"type":"messages_read","conversationId":"c2","watermark":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            read,
            PushEvent::MessagesRead {
                conversation_id: "c2".to_string(),
                watermark: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_malformed_frames() {
        for frame in [
            r#"{"type":"ai_typing","isTyping":true}"#,
            r#"{"type":"presence","conversationId":"c1"}"#,
            r#"{"type":"ai_typing","conversationId":"  ","isTyping":true}"#,
            r#"not json"#,
            r#"{"type":"new_message","conversationId":"c1","message":{"id":"m1","conversationId":"c2","senderId":"x","isFromCustomer":true,"timestamp":"2024-05-01T10:00:00Z"}}"#,
        ] {
            assert!(
                matches!(
                    TransportSignal::from_frame(frame),
                    TransportSignal::Malformed { .. }
                ),
                "frame should be rejected: {}",
                frame
            );
        }
    }
}
