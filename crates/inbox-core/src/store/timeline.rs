use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::reply_status::compute_answered;
use crate::models::{DeliveryStatus, Message, MessagePage};

/// Ordered, de-duplicated message list for one conversation.
///
/// Messages are unique by id and sorted by timestamp ascending. Equal timestamps
/// keep arrival order, so inserting at the upper bound of the equal range is the
/// same as a stable sort over everything received so far.
#[derive(Debug, Clone)]
pub struct MessageTimeline {
    conversation_id: String,
    messages: Vec<Message>,
    answered: HashSet<String>,
    /// Next older history page to request (page 1 is the newest)
    next_page: u32,
    has_more_older: bool,
    /// Page currently being fetched by `begin_load_older`
    loading_page: Option<u32>,
    loaded: bool,
    read_watermark: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl MessageTimeline {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            answered: HashSet::new(),
            next_page: 1,
            has_more_older: true,
            loading_page: None,
            loaded: false,
            read_watermark: None,
            error: None,
        }
    }

    // ===== Getters =====

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn answered(&self) -> &HashSet<String> {
        &self.answered
    }

    pub fn is_answered(&self, id: &str) -> bool {
        self.answered.contains(id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_more_older(&self) -> bool {
        self.has_more_older
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_page.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn read_watermark(&self) -> Option<DateTime<Utc>> {
        self.read_watermark
    }

    // ===== Mutations =====

    /// Add a message at its sorted position. Returns false if the id is already present.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.insert_sorted(message) {
            return false;
        }
        self.recompute();
        true
    }

    /// Append an authoritative message, folding it into the optimistic entry it
    /// confirms when the server echoed the temporary id back.
    pub fn ingest(&mut self, message: Message) -> bool {
        if let Some(temp_id) = message.client_id.clone() {
            if temp_id != message.id && self.contains(&temp_id) {
                self.replace(&temp_id, message);
                return true;
            }
        }
        self.append(message)
    }

    /// Substitute a temporary entry with the authoritative message. Afterwards exactly
    /// one entry carries `real.id` and none carries `temp_id`, regardless of whether the
    /// authoritative copy had already arrived by push.
    pub fn replace(&mut self, temp_id: &str, real: Message) -> bool {
        let had_temp = match self.messages.iter().position(|m| m.id == temp_id) {
            Some(pos) => {
                self.messages.remove(pos);
                true
            }
            None => false,
        };

        match self.messages.iter().position(|m| m.id == real.id) {
            Some(pos) if self.messages[pos].timestamp == real.timestamp => {
                let mut real = real;
                self.apply_watermark(&mut real);
                self.messages[pos] = real;
            }
            Some(pos) => {
                self.messages.remove(pos);
                self.insert_sorted(real);
            }
            None => {
                self.insert_sorted(real);
            }
        }

        self.recompute();
        had_temp
    }

    /// Authoritative in-place update (star, reaction, status from the server).
    pub fn update(&mut self, mut message: Message) -> bool {
        let Some(pos) = self.messages.iter().position(|m| m.id == message.id) else {
            return false;
        };
        if self.messages[pos].timestamp == message.timestamp {
            self.apply_watermark(&mut message);
            self.messages[pos] = message;
        } else {
            self.messages.remove(pos);
            self.insert_sorted(message);
        }
        self.recompute();
        true
    }

    pub fn set_status(&mut self, id: &str, status: DeliveryStatus) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove a message after the backend confirmed its deletion.
    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let pos = self.messages.iter().position(|m| m.id == id)?;
        let removed = self.messages.remove(pos);
        self.recompute();
        Some(removed)
    }

    /// Mark everything at or before `watermark` as read. Older watermarks are ignored.
    pub fn apply_read_watermark(&mut self, watermark: DateTime<Utc>) -> usize {
        if self.read_watermark.is_some_and(|current| watermark <= current) {
            return 0;
        }
        self.read_watermark = Some(watermark);

        let mut changed = 0;
        for message in self.messages.iter_mut().filter(|m| m.timestamp <= watermark) {
            if message.advance_status(DeliveryStatus::Read) {
                changed += 1;
            }
        }
        changed
    }

    // ===== Pagination =====

    /// Claim the next older page. Returns None while a load is in flight or once
    /// history is exhausted.
    pub fn begin_load_older(&mut self) -> Option<u32> {
        if self.loading_page.is_some() || !self.has_more_older {
            return None;
        }
        self.loading_page = Some(self.next_page);
        Some(self.next_page)
    }

    /// Merge a history page fetched for `requested`. The newest page also
    /// initializes the cursor; later reloads of page 1 only merge.
    pub fn merge_page(&mut self, requested: u32, page: MessagePage) -> usize {
        if requested >= self.next_page {
            self.next_page = requested + 1;
            self.has_more_older = page.has_more;
        }
        if self.loading_page == Some(requested) {
            self.loading_page = None;
        }
        self.loaded = true;
        self.error = None;

        let mut inserted = 0;
        for message in page.messages {
            if self.insert_sorted(message) {
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.recompute();
        }
        inserted
    }

    pub fn fail_load(&mut self, page: u32, error: String) {
        if self.loading_page == Some(page) {
            self.loading_page = None;
        }
        self.error = Some(error);
    }

    /// Forget any in-flight claim (the conversation was closed).
    pub fn abandon_load(&mut self) {
        self.loading_page = None;
    }

    fn insert_sorted(&mut self, mut message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.apply_watermark(&mut message);
        let pos = self
            .messages
            .partition_point(|m| m.timestamp <= message.timestamp);
        self.messages.insert(pos, message);
        true
    }

    fn apply_watermark(&self, message: &mut Message) {
        if self.read_watermark.is_some_and(|watermark| message.timestamp <= watermark) {
            message.advance_status(DeliveryStatus::Read);
        }
    }

    fn recompute(&mut self) {
        self.answered = compute_answered(&self.messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageType;
    use chrono::TimeZone;

    fn make_test_message(id: &str, secs: i64, from_customer: bool) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            sender_id: if from_customer { "cust" } else { "agent" }.to_string(),
            sender_name: String::new(),
            content: format!("message {}", id),
            message_type: MessageType::Text,
            is_from_customer: from_customer,
            status: DeliveryStatus::Sent,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            client_id: None,
            metadata: vec![],
        }
    }

    fn ids(timeline: &MessageTimeline) -> Vec<&str> {
        timeline.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_append_is_idempotent() {
        let mut timeline = MessageTimeline::new("c1");
        assert!(timeline.append(make_test_message("m1", 1, true)));
        assert!(!timeline.append(make_test_message("m1", 1, true)));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_same_content_different_ids_are_kept() {
        let mut timeline = MessageTimeline::new("c1");
        let mut a = make_test_message("m1", 1, true);
        let mut b = make_test_message("m2", 1, true);
        a.content = "ok".to_string();
        b.content = "ok".to_string();
        timeline.append(a);
        timeline.append(b);
        assert_eq!(ids(&timeline), vec!["m1", "m2"]);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("b", 5, true));
        timeline.append(make_test_message("a", 5, false));
        timeline.append(make_test_message("early", 1, true));
        assert_eq!(ids(&timeline), vec!["early", "b", "a"]);
    }

    #[test]
    fn test_older_page_after_push() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("C", 5, true));

        timeline.merge_page(1, MessagePage {
            messages: vec![make_test_message("A", 1, true), make_test_message("B", 2, false)],
            page: 1,
            has_more: false,
        });

        assert_eq!(ids(&timeline), vec!["A", "B", "C"]);
        assert!(!timeline.has_more_older());
    }

    #[test]
    fn test_replace_removes_temp_and_sorts_by_real_timestamp() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("m1", 1, true));
        timeline.append(make_test_message("tmp-1", 10, false));
        timeline.append(make_test_message("m2", 5, true));

        let real = make_test_message("srv-9", 3, false);
        assert!(timeline.replace("tmp-1", real));

        assert_eq!(ids(&timeline), vec!["m1", "srv-9", "m2"]);
        assert!(!timeline.contains("tmp-1"));
    }

    #[test]
    fn test_replace_after_push_already_delivered_real() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("tmp-1", 4, false));
        timeline.append(make_test_message("srv-9", 4, false));

        timeline.replace("tmp-1", make_test_message("srv-9", 4, false));

        assert_eq!(ids(&timeline), vec!["srv-9"]);
    }

    #[test]
    fn test_ingest_folds_echoed_client_id() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("tmp-7", 4, false));

        let mut real = make_test_message("srv-7", 4, false);
        real.client_id = Some("tmp-7".to_string());
        assert!(timeline.ingest(real.clone()));
        assert!(!timeline.ingest(real));

        assert_eq!(ids(&timeline), vec!["srv-7"]);
    }

    #[test]
    fn test_reply_status_tracks_mutations() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("q1", 1, true));
        assert!(!timeline.is_answered("q1"));

        timeline.append(make_test_message("r1", 2, false));
        assert!(timeline.is_answered("q1"));

        timeline.remove("r1");
        assert!(!timeline.is_answered("q1"));
    }

    #[test]
    fn test_read_watermark_is_monotonic() {
        let mut timeline = MessageTimeline::new("c1");
        let mut delivered = make_test_message("m1", 1, false);
        delivered.status = DeliveryStatus::Delivered;
        timeline.append(delivered);
        timeline.append(make_test_message("m2", 5, false));
        let mut sending = make_test_message("tmp-3", 2, false);
        sending.status = DeliveryStatus::Sending;
        timeline.append(sending);

        assert_eq!(timeline.apply_read_watermark(Utc.timestamp_opt(3, 0).unwrap()), 1);
        assert_eq!(timeline.get("m1").unwrap().status, DeliveryStatus::Read);
        assert_eq!(timeline.get("tmp-3").unwrap().status, DeliveryStatus::Sending);
        assert_eq!(timeline.get("m2").unwrap().status, DeliveryStatus::Sent);

        assert_eq!(timeline.apply_read_watermark(Utc.timestamp_opt(2, 0).unwrap()), 0);
        assert_eq!(timeline.read_watermark(), Some(Utc.timestamp_opt(3, 0).unwrap()));

        // Late arrivals under the watermark are read on insert
        timeline.append(make_test_message("m0", 0, false));
        assert_eq!(timeline.get("m0").unwrap().status, DeliveryStatus::Read);
    }

    #[test]
    fn test_load_older_guard() {
        let mut timeline = MessageTimeline::new("c1");
        assert_eq!(timeline.begin_load_older(), Some(1));
        assert_eq!(timeline.begin_load_older(), None, "in flight");

        timeline.merge_page(1, MessagePage {
            messages: vec![make_test_message("m5", 5, true)],
            page: 1,
            has_more: true,
        });
        assert_eq!(timeline.begin_load_older(), Some(2));

        timeline.merge_page(2, MessagePage {
            messages: vec![make_test_message("m1", 1, true)],
            page: 2,
            has_more: false,
        });
        assert_eq!(timeline.begin_load_older(), None, "exhausted");
        assert_eq!(ids(&timeline), vec!["m1", "m5"]);
    }

    #[test]
    fn test_reload_of_newest_page_keeps_cursor() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.begin_load_older();
        timeline.merge_page(1, MessagePage {
            messages: vec![make_test_message("m5", 5, true)],
            page: 1,
            has_more: true,
        });
        timeline.begin_load_older();
        timeline.merge_page(2, MessagePage {
            messages: vec![make_test_message("m1", 1, true)],
            page: 2,
            has_more: true,
        });

        timeline.merge_page(1, MessagePage {
            messages: vec![make_test_message("m5", 5, true), make_test_message("m6", 6, false)],
            page: 1,
            has_more: true,
        });
        assert_eq!(timeline.begin_load_older(), Some(3));
        assert_eq!(ids(&timeline), vec!["m1", "m5", "m6"]);
    }

    #[test]
    fn test_failed_load_releases_guard() {
        let mut timeline = MessageTimeline::new("c1");
        assert_eq!(timeline.begin_load_older(), Some(1));
        timeline.fail_load(1, "connection reset".to_string());
        assert_eq!(timeline.error(), Some("connection reset"));
        assert_eq!(timeline.begin_load_older(), Some(1));
    }

    #[test]
    fn test_equal_timestamp_overwrite_keeps_watermark() {
        let mut timeline = MessageTimeline::new("c1");
        timeline.append(make_test_message("tmp-1", 2, false));
        timeline.append(make_test_message("m2", 3, false));
        timeline.apply_read_watermark(Utc.timestamp_opt(4, 0).unwrap());

        // Authoritative copies still report "sent"
        timeline.replace("tmp-1", make_test_message("m2", 3, false));
        assert_eq!(timeline.get("m2").unwrap().status, DeliveryStatus::Read);

        let mut starred = make_test_message("m2", 3, false);
        starred.content = "edited".to_string();
        assert!(timeline.update(starred));
        let m2 = timeline.get("m2").unwrap();
        assert_eq!(m2.status, DeliveryStatus::Read);
        assert_eq!(m2.content, "edited");
    }

    #[test]
    fn test_merge_uses_requested_page_over_echo() {
        let mut timeline = MessageTimeline::new("c1");
        assert_eq!(timeline.begin_load_older(), Some(1));
        // Server echoes a different page number
        timeline.merge_page(1, MessagePage {
            messages: vec![make_test_message("m5", 5, true)],
            page: 0,
            has_more: true,
        });
        assert!(!timeline.is_loading_older());
        assert_eq!(timeline.begin_load_older(), Some(2));
    }
}
