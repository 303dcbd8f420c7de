use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::TEMP_ID_PREFIX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    Video,
    Audio,
    Template,
}

/// Delivery progress. The derived ordering follows the lifecycle
/// `Sending < Sent < Delivered < Read`; `Error` sits outside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sending,
    #[default]
    Sent,
    Delivered,
    Read,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    #[serde(default)]
    pub by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub message_id: String,
    #[serde(default)]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnownMetadata {
    Attachment(Attachment),
    Reaction(Reaction),
    #[serde(rename_all = "camelCase")]
    Star {
        #[serde(default)]
        starred_by: Option<String>,
    },
    ReplyTo(ReplyRef),
}

/// One metadata entry on a message. Entries that do not parse as a known kind are
/// kept as raw JSON instead of being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageMetadata {
    Known(KnownMetadata),
    Unknown(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub is_from_customer: bool,
    #[serde(default)]
    pub status: DeliveryStatus,
    pub timestamp: DateTime<Utc>,
    /// Temporary id of the optimistic entry this message confirms, when the server
    /// echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MessageMetadata>,
}

impl Message {
    pub fn is_temporary(&self) -> bool {
        is_temporary_id(&self.id)
    }

    pub fn is_starred(&self) -> bool {
        self.known_metadata()
            .any(|m| matches!(m, KnownMetadata::Star { .. }))
    }

    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.known_metadata().filter_map(|m| match m {
            KnownMetadata::Reaction(reaction) => Some(reaction),
            _ => None,
        })
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.known_metadata().filter_map(|m| match m {
            KnownMetadata::Attachment(attachment) => Some(attachment),
            _ => None,
        })
    }

    pub fn reply_to(&self) -> Option<&ReplyRef> {
        self.known_metadata().find_map(|m| match m {
            KnownMetadata::ReplyTo(reply) => Some(reply),
            _ => None,
        })
    }

    /// Advance delivery status without ever moving it backwards.
    /// `Sending` and `Error` are owned by the send pipeline and are left alone.
    pub fn advance_status(&mut self, status: DeliveryStatus) -> bool {
        if matches!(self.status, DeliveryStatus::Sending | DeliveryStatus::Error) {
            return false;
        }
        if status > self.status && status != DeliveryStatus::Error {
            self.status = status;
            return true;
        }
        false
    }

    fn known_metadata(&self) -> impl Iterator<Item = &KnownMetadata> {
        self.metadata.iter().filter_map(|m| match m {
            MessageMetadata::Known(known) => Some(known),
            MessageMetadata::Unknown(_) => None,
        })
    }
}

pub fn new_temporary_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}
