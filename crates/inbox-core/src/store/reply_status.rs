//! Reply-status inference over a loaded timeline.
//!
//! A customer message counts as answered when some non-customer message is
//! strictly newer than it. The result only covers the messages passed in: a
//! partially loaded timeline yields a locally correct answer for that window and
//! says nothing about older, unloaded messages.
//!
//! Any non-customer message counts as a reply, automated ones included.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::Message;

/// Ids of customer messages that have since been answered.
pub fn compute_answered(messages: &[Message]) -> HashSet<String> {
    let mut ordered: Vec<&Message> = messages.iter().collect();
    // Stable: equal timestamps keep arrival order
    ordered.sort_by_key(|m| m.timestamp);

    let mut last_reply: Option<DateTime<Utc>> = None;
    let mut answered = HashSet::new();

    for message in ordered.into_iter().rev() {
        if message.is_from_customer {
            // Ties are unanswered
            if last_reply.is_some_and(|reply_at| message.timestamp < reply_at) {
                answered.insert(message.id.clone());
            }
        } else if last_reply.map_or(true, |reply_at| message.timestamp > reply_at) {
            last_reply = Some(message.timestamp);
        }
    }

    answered
}
