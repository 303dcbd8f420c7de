use std::time::Duration;

use tokio::time::Instant;

use super::debounce::Debouncer;
use super::types::{PushEvent, TransportSignal};
use super::typing::TypingIndicators;
use crate::events::InboxEvent;
use crate::models::{Conversation, Message};
use crate::store::InboxStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport attached
    Detached,
    Connected,
    Disconnected,
}

/// Result of applying one signal or timer tick.
#[derive(Debug, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub events: Vec<InboxEvent>,
    /// Conversation whose timeline should be reloaded from page 1
    pub reload_timeline: Option<String>,
    /// Reload the active tab's first page now
    pub refresh_registry: bool,
    /// A message landed at the tail of the open conversation
    pub appended_to_open: bool,
}

/// Applies push signals to the store. Owns the refresh debouncer, typing
/// flags, the fallback poll and the connection state; network follow-ups are
/// returned to the caller.
pub struct Reconciler {
    refresh: Debouncer,
    typing: TypingIndicators,
    connection: ConnectionState,
    poll_interval: Duration,
    /// Armed only while the transport is disconnected
    poll_deadline: Option<Instant>,
}

impl Reconciler {
    pub fn new(
        debounce: Duration,
        max_wait: Duration,
        typing_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            refresh: Debouncer::new(debounce, max_wait),
            typing: TypingIndicators::new(typing_timeout),
            connection: ConnectionState::Detached,
            poll_interval,
            poll_deadline: None,
        }
    }

    // ===== Getters =====

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn is_typing(&self, conversation_id: &str) -> bool {
        self.typing.is_typing(conversation_id)
    }

    pub fn refresh_pending(&self) -> bool {
        self.refresh.is_armed()
    }

    pub fn is_polling(&self) -> bool {
        self.poll_deadline.is_some()
    }

    /// Earliest timer the caller has to wake up for.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.refresh.deadline(), self.typing.next_deadline(), self.poll_deadline]
            .into_iter()
            .flatten()
            .min()
    }

    // ===== Signals =====

    pub fn apply(
        &mut self,
        store: &mut InboxStore,
        signal: TransportSignal,
        now: Instant,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        match signal {
            TransportSignal::Connected => {
                let previous = std::mem::replace(&mut self.connection, ConnectionState::Connected);
                self.poll_deadline = None;
                outcome.events.push(InboxEvent::ConnectionChanged { connected: true });
                if previous == ConnectionState::Disconnected {
                    tracing::info!("push transport reconnected, refreshing");
                    outcome.reload_timeline = store.selected().map(str::to_string);
                    outcome.refresh_registry = true;
                    self.refresh.cancel();
                }
            }
            TransportSignal::Disconnected => {
                if self.connection != ConnectionState::Disconnected {
                    tracing::info!(interval = ?self.poll_interval, "push transport down, polling");
                    self.poll_deadline = Some(now + self.poll_interval);
                }
                self.connection = ConnectionState::Disconnected;
                outcome.events.push(InboxEvent::ConnectionChanged { connected: false });
                for conversation_id in self.typing.clear_all() {
                    outcome.events.push(InboxEvent::TypingChanged {
                        conversation_id,
                        is_typing: false,
                    });
                }
            }
            TransportSignal::Malformed { reason } => {
                tracing::warn!(%reason, "dropped malformed push event");
            }
            TransportSignal::Event(event) => self.apply_event(store, event, now, &mut outcome),
        }

        outcome
    }

    fn apply_event(
        &mut self,
        store: &mut InboxStore,
        event: PushEvent,
        now: Instant,
        outcome: &mut ReconcileOutcome,
    ) {
        match event {
            PushEvent::NewMessage {
                conversation_id,
                message,
                conversation,
            } => {
                tracing::debug!(
                    conversation = %conversation_id,
                    message = %message.id,
                    "push: new message"
                );
                self.on_new_message(store, conversation_id, message, conversation, outcome);
                self.refresh.trigger(now);
            }
            PushEvent::Typing {
                conversation_id,
                is_typing,
            } => {
                if self.typing.set(&conversation_id, is_typing, now) {
                    outcome.events.push(InboxEvent::TypingChanged {
                        conversation_id,
                        is_typing,
                    });
                }
            }
            PushEvent::MessagesRead {
                conversation_id,
                watermark,
            } => {
                // Unloaded timelines pick up read state from the server on load
                let Some(timeline) = store.existing_timeline_mut(&conversation_id) else {
                    return;
                };
                if timeline.apply_read_watermark(watermark) > 0 {
                    outcome
                        .events
                        .push(InboxEvent::TimelineChanged { conversation_id });
                }
            }
        }
    }

    fn on_new_message(
        &mut self,
        store: &mut InboxStore,
        conversation_id: String,
        message: Message,
        conversation: Option<Conversation>,
        outcome: &mut ReconcileOutcome,
    ) {
        let is_open = store.is_selected(&conversation_id);

        let had_payload = conversation.is_some();
        let mut registry_changed =
            conversation.map_or(false, |conversation| store.registry.upsert(conversation));
        // A full payload already carries preview and unread count for closed conversations
        if is_open || !had_payload {
            registry_changed |= store.registry.apply_preview(&message, !is_open);
        }
        if registry_changed {
            outcome.events.push(InboxEvent::ConversationsChanged);
        }

        let ingested = match store.existing_timeline_mut(&conversation_id) {
            Some(timeline) if is_open || timeline.is_loaded() => timeline.ingest(message),
            _ => false,
        };
        if ingested {
            outcome.events.push(InboxEvent::TimelineChanged {
                conversation_id: conversation_id.clone(),
            });
            outcome.appended_to_open = is_open;
        }

        if self.typing.clear(&conversation_id) {
            outcome.events.push(InboxEvent::TypingChanged {
                conversation_id,
                is_typing: false,
            });
        }
    }

    // ===== Timers =====

    /// Fire whatever timers have expired by `now`.
    pub fn poll_timers(&mut self, store: &InboxStore, now: Instant) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        if self.refresh.poll(now) {
            tracing::debug!("debounced registry refresh");
            outcome.refresh_registry = true;
        }
        if self.poll_deadline.is_some_and(|deadline| now >= deadline) {
            tracing::debug!("polling while disconnected");
            outcome.refresh_registry = true;
            outcome.reload_timeline = store.selected().map(str::to_string);
            self.poll_deadline = Some(now + self.poll_interval);
        }
        for conversation_id in self.typing.expire(now) {
            outcome.events.push(InboxEvent::TypingChanged {
                conversation_id,
                is_typing: false,
            });
        }
        outcome
    }

    /// Stop all timers and forget connection state (detach or logout).
    pub fn reset(&mut self) -> Vec<InboxEvent> {
        self.refresh.cancel();
        self.poll_deadline = None;
        self.connection = ConnectionState::Detached;
        self.typing
            .clear_all()
            .into_iter()
            .map(|conversation_id| InboxEvent::TypingChanged {
                conversation_id,
                is_typing: false,
            })
            .collect()
    }
}
