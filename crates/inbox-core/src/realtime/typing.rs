use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Per-conversation "assistant is typing" flags. A flag that is never cleared
/// expires after `timeout`.
#[derive(Debug, Clone)]
pub struct TypingIndicators {
    timeout: Duration,
    active: HashMap<String, Instant>,
}

impl TypingIndicators {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            active: HashMap::new(),
        }
    }

    pub fn is_typing(&self, conversation_id: &str) -> bool {
        self.active.contains_key(conversation_id)
    }

    /// Returns true if the visible state changed.
    pub fn set(&mut self, conversation_id: &str, typing: bool, now: Instant) -> bool {
        if typing {
            self.active
                .insert(conversation_id.to_string(), now + self.timeout)
                .is_none()
        } else {
            self.active.remove(conversation_id).is_some()
        }
    }

    pub fn clear(&mut self, conversation_id: &str) -> bool {
        self.active.remove(conversation_id).is_some()
    }

    /// Drop expired flags, returning the affected conversation ids.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .active
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.active.remove(id);
        }
        expired.sort();
        expired
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.values().min().copied()
    }

    pub fn clear_all(&mut self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.drain().map(|(id, _)| id).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let mut typing = TypingIndicators::new(Duration::from_secs(15));
        let now = Instant::now();

        assert!(typing.set("c1", true, now));
        assert!(!typing.set("c1", true, now), "refresh is not a change");
        assert!(typing.is_typing("c1"));
        assert!(typing.set("c1", false, now));
        assert!(!typing.set("c1", false, now));
        assert!(!typing.is_typing("c1"));
    }

    #[test]
    fn test_flags_expire() {
        let mut typing = TypingIndicators::new(Duration::from_secs(15));
        let now = Instant::now();
        typing.set("c1", true, now);
        typing.set("c2", true, now + Duration::from_secs(10));

        assert_eq!(typing.next_deadline(), Some(now + Duration::from_secs(15)));
        assert!(typing.expire(now + Duration::from_secs(14)).is_empty());
        assert_eq!(typing.expire(now + Duration::from_secs(15)), vec!["c1"]);
        assert!(typing.is_typing("c2"));
        assert_eq!(typing.clear_all(), vec!["c2"]);
        assert_eq!(typing.next_deadline(), None);
    }
}
