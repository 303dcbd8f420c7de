//! Optimistic send pipeline.
//!
//! Each attempt moves `Composing -> Sending -> {Confirmed | Failed}`. `begin`
//! synthesizes the provisional message the caller appends right away; the real
//! request runs in the background and is resolved with `confirm` or `fail`.
//! Sends are independent: several may be in flight for one conversation.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AgentIdentity;
use crate::models::{new_temporary_id, DeliveryStatus, Message, MessageType};

/// Body of `POST /conversations/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Temporary id, echoed back so push copies can be matched to the optimistic entry
    pub client_id: String,
}

/// What the background task needs to dispatch one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    pub temp_id: String,
    pub conversation_id: String,
    pub body: OutgoingMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub temp_id: String,
    pub conversation_id: String,
    pub started_at: DateTime<Utc>,
    pub attempt: u32,
}

pub struct SendPipeline {
    agent: AgentIdentity,
    timeout: Duration,
    pending: HashMap<String, PendingSend>,
    attempts: HashMap<String, u32>,
}

impl SendPipeline {
    pub fn new(agent: AgentIdentity, timeout: Duration) -> Self {
        Self {
            agent,
            timeout,
            pending: HashMap::new(),
            attempts: HashMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_pending(&self, temp_id: &str) -> bool {
        self.pending.contains_key(temp_id)
    }

    pub fn pending_for(&self, conversation_id: &str) -> usize {
        self.pending
            .values()
            .filter(|p| p.conversation_id == conversation_id)
            .count()
    }

    /// Synthesize the provisional message and register the attempt.
    pub fn begin(
        &mut self,
        conversation_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> (Message, SendRequest) {
        let temp_id = new_temporary_id();
        let message = Message {
            id: temp_id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_id: self.agent.id.clone(),
            sender_name: self.agent.name.clone(),
            content: content.to_string(),
            message_type: MessageType::Text,
            is_from_customer: false,
            status: DeliveryStatus::Sending,
            timestamp: now,
            client_id: None,
            metadata: vec![],
        };
        let request = self.register(&message, now);
        (message, request)
    }

    /// Re-dispatch a failed provisional message under the same temporary id.
    /// Returns None if the message is not a failed optimistic entry.
    pub fn retry(&mut self, failed: &Message, now: DateTime<Utc>) -> Option<SendRequest> {
        if !failed.is_temporary() || failed.status != DeliveryStatus::Error {
            return None;
        }
        if self.pending.contains_key(&failed.id) {
            return None;
        }
        Some(self.register(failed, now))
    }

    /// Resolve an attempt successfully. The record is dropped.
    pub fn confirm(&mut self, temp_id: &str) -> Option<PendingSend> {
        self.attempts.remove(temp_id);
        self.pending.remove(temp_id)
    }

    /// Resolve an attempt as failed. The record is dropped; the provisional
    /// message stays in the timeline flagged `error` so it can be retried.
    pub fn fail(&mut self, temp_id: &str) -> Option<PendingSend> {
        self.pending.remove(temp_id)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.attempts.clear();
    }

    fn register(&mut self, message: &Message, now: DateTime<Utc>) -> SendRequest {
        let attempt = self.attempts.entry(message.id.clone()).or_insert(0);
        *attempt += 1;
        self.pending.insert(
            message.id.clone(),
            PendingSend {
                temp_id: message.id.clone(),
                conversation_id: message.conversation_id.clone(),
                started_at: now,
                attempt: *attempt,
            },
        );
        SendRequest {
            temp_id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
            body: OutgoingMessage {
                content: message.content.clone(),
                message_type: message.message_type,
                client_id: message.id.clone(),
            },
        }
    }
}
