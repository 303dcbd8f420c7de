use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::backend::{Backend, HttpBackend};
use crate::config::InboxConfig;
use crate::error::{InboxError, Result};
use crate::events::{InboxEvent, LoadTarget};
use crate::models::{
    is_temporary_id, Conversation, ConversationPage, ConversationPatch, ConversationQuery,
    DeliveryStatus, Message, MessagePage, Tab,
};
use crate::realtime::{ReconcileOutcome, Reconciler, Subscription, Transport, TransportSignal};
use crate::scroll::{ScrollController, Viewport};
use crate::send::{SendPipeline, SendRequest};
use crate::store::InboxStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageAction {
    Star,
    React,
    Delete,
}

/// Result of a background request, tagged with the target it was issued for.
#[derive(Debug)]
enum Request {
    ConversationPage {
        tab: Tab,
        generation: u64,
        page: u32,
        result: Result<ConversationPage>,
    },
    MessagePage {
        conversation_id: String,
        generation: u64,
        /// Loaded through the timeline's in-flight guard
        claimed: bool,
        page: u32,
        result: Result<MessagePage>,
    },
    DeepLink {
        conversation_id: String,
        generation: u64,
        result: Result<Conversation>,
    },
    Sent {
        conversation_id: String,
        temp_id: String,
        result: Result<Message>,
    },
    Patched {
        conversation_ids: Vec<String>,
        /// Authoritative copies from before the optimistic patch
        previous: Vec<Conversation>,
        result: Result<Vec<Conversation>>,
    },
    MessageAction {
        conversation_id: String,
        message_id: String,
        action: MessageAction,
        result: Result<Option<Message>>,
    },
}

/// A finished background request. Opaque; hand it back to [`InboxRuntime::process`].
#[derive(Debug)]
pub struct Completion(Request);

/// Something that happened while the runtime was waiting.
#[derive(Debug)]
pub enum InboxUpdate {
    Completed(Completion),
    Signal(TransportSignal),
    /// The transport task ended
    TransportClosed,
    /// A debounce, typing or poll deadline passed
    Timer,
}

/// Per-session orchestrator: owns the store and every piece of sync state.
///
/// All mutation happens on the caller's task through the operations below and
/// [`InboxRuntime::process`]. Network calls run in a `JoinSet`; their results
/// come back through [`InboxRuntime::next_update`] in completion order.
pub struct InboxRuntime {
    store: InboxStore,
    backend: Arc<dyn Backend>,
    pipeline: SendPipeline,
    reconciler: Reconciler,
    scroll: ScrollController,
    tasks: JoinSet<Completion>,
    subscription: Option<Subscription>,
    /// Bumped whenever the selected conversation changes
    selection_generation: u64,
    /// Bumped whenever the active tab or search term changes
    list_generation: u64,
    /// Latest deep link still waiting for its conversation
    pending_deep_link: Option<String>,
    /// A refresh was asked for while page 1 of the active tab was in flight
    refresh_queued: bool,
}

impl InboxRuntime {
    pub fn new(config: &InboxConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            store: InboxStore::new(),
            backend,
            pipeline: SendPipeline::new(config.agent.clone(), config.send_timeout()),
            reconciler: Reconciler::new(
                config.refresh_debounce(),
                config.refresh_max_wait(),
                config.typing_timeout(),
                config.disconnected_poll(),
            ),
            scroll: ScrollController::new(config.scroll.clone()),
            tasks: JoinSet::new(),
            subscription: None,
            selection_generation: 0,
            list_generation: 0,
            pending_deep_link: None,
            refresh_queued: false,
        }
    }

    /// Runtime talking to the REST backend described by `config`.
    pub fn from_config(config: &InboxConfig) -> Self {
        Self::new(config, Arc::new(HttpBackend::from_config(config)))
    }

    // ===== Getters =====

    pub fn store(&self) -> &InboxStore {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    pub fn pending_requests(&self) -> usize {
        self.tasks.len()
    }

    // ===== Event loop =====

    /// Wait for the next request completion, transport signal or timer.
    /// Returns None when there is nothing left to wait for.
    pub async fn next_update(&mut self) -> Option<InboxUpdate> {
        loop {
            let deadline = self.reconciler.next_deadline();
            tokio::select! {
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Ok(completion) => return Some(InboxUpdate::Completed(completion)),
                        Err(e) => {
                            tracing::warn!(error = %e, "background request aborted");
                            continue;
                        }
                    }
                }
                signal = recv_signal(&mut self.subscription), if self.subscription.is_some() => {
                    return Some(match signal {
                        Some(signal) => InboxUpdate::Signal(signal),
                        None => InboxUpdate::TransportClosed,
                    });
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    return Some(InboxUpdate::Timer);
                }
                else => return None,
            }
        }
    }

    /// Apply one update to the store.
    pub fn process(&mut self, update: InboxUpdate) -> Vec<InboxEvent> {
        match update {
            InboxUpdate::Completed(Completion(request)) => self.complete(request),
            InboxUpdate::Signal(signal) => {
                let outcome = self
                    .reconciler
                    .apply(&mut self.store, signal, Instant::now());
                self.follow_up(outcome)
            }
            InboxUpdate::TransportClosed => {
                tracing::info!("push transport ended");
                self.subscription = None;
                let outcome = self.reconciler.apply(
                    &mut self.store,
                    TransportSignal::Disconnected,
                    Instant::now(),
                );
                self.follow_up(outcome)
            }
            InboxUpdate::Timer => {
                let outcome = self.reconciler.poll_timers(&self.store, Instant::now());
                self.follow_up(outcome)
            }
        }
    }

    fn follow_up(&mut self, outcome: ReconcileOutcome) -> Vec<InboxEvent> {
        let mut events = outcome.events;
        if outcome.appended_to_open {
            events.extend(self.scroll.on_append().map(InboxEvent::Scroll));
        }
        if outcome.refresh_registry {
            self.refresh_registry();
        }
        if let Some(conversation_id) = outcome.reload_timeline {
            self.reload_timeline(&conversation_id);
        }
        events
    }

    // ===== Transport =====

    /// Start receiving push signals. Replaces any previous subscription.
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        if let Some(previous) = self.subscription.take() {
            previous.cancel();
        }
        tracing::debug!("attaching push transport");
        self.subscription = Some(Subscription::spawn(transport));
    }

    /// Unsubscribe and cancel timers. Timers are cancelled even when the
    /// transport already ended on its own.
    pub fn detach(&mut self) -> Vec<InboxEvent> {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        let was_connected = self.reconciler.is_connected();
        let mut events = self.reconciler.reset();
        if was_connected {
            events.push(InboxEvent::ConnectionChanged { connected: false });
        }
        events
    }

    /// Tear the session down: abort requests, drop the transport and clear all state.
    pub fn shutdown(&mut self) {
        self.detach();
        // Dropping the set aborts every request still running
        self.tasks = JoinSet::new();
        self.pipeline.clear();
        self.store.clear();
        self.selection_generation += 1;
        self.list_generation += 1;
        self.refresh_queued = false;
    }

    // ===== Conversation list =====

    pub fn select_tab(&mut self, tab: Tab) -> Vec<InboxEvent> {
        if self.store.active_tab() == tab {
            return vec![];
        }
        self.store.set_active_tab(tab);
        self.restart_list();
        vec![InboxEvent::ConversationsChanged]
    }

    pub fn set_search(&mut self, term: Option<String>) -> Vec<InboxEvent> {
        let term = term.filter(|t| !t.trim().is_empty());
        if self.store.search() == term.as_deref() {
            return vec![];
        }
        self.store.set_search(term);
        self.restart_list();
        vec![InboxEvent::ConversationsChanged]
    }

    fn restart_list(&mut self) {
        self.list_generation += 1;
        self.refresh_queued = false;
        self.store.registry.reset_tab(self.store.active_tab());
        self.load_next_conversations();
    }

    /// Request the next page of the active tab. Returns false when exhausted or
    /// already in flight.
    pub fn load_next_conversations(&mut self) -> bool {
        let tab = self.store.active_tab();
        match self.store.registry.begin_next_page(tab) {
            Some(page) => {
                self.spawn_conversation_page(tab, page);
                true
            }
            None => false,
        }
    }

    fn refresh_registry(&mut self) {
        let tab = self.store.active_tab();
        if self.store.registry.begin_refresh(tab) {
            self.spawn_conversation_page(tab, 1);
        } else {
            // The page in flight may predate the change; reload once it lands
            tracing::debug!(%tab, "refresh queued behind page 1");
            self.refresh_queued = true;
        }
    }

    fn spawn_conversation_page(&mut self, tab: Tab, page: u32) {
        let query = ConversationQuery {
            tab,
            page,
            search: self.store.search().map(str::to_string),
        };
        let generation = self.list_generation;
        tracing::debug!(%tab, page, "loading conversations");
        self.spawn(move |backend| async move {
            Request::ConversationPage {
                tab,
                generation,
                page,
                result: backend.list_conversations(&query).await,
            }
        });
    }

    pub fn on_list_scroll(&mut self, viewport: Viewport) -> bool {
        let tab = self.store.active_tab();
        let has_more = self.store.registry.pagination(tab).has_more;
        let loading = self.store.registry.is_loading(tab);
        if self.scroll.on_list_scroll(viewport, has_more, loading) {
            return self.load_next_conversations();
        }
        false
    }

    // ===== Timeline =====

    pub fn open_conversation(&mut self, conversation_id: &str) -> Vec<InboxEvent> {
        if self.store.is_selected(conversation_id) {
            return vec![];
        }
        if let Some(previous) = self.store.selected().map(str::to_string) {
            if let Some(timeline) = self.store.existing_timeline_mut(&previous) {
                timeline.abandon_load();
            }
        }

        self.selection_generation += 1;
        self.pending_deep_link = None;
        self.store.select(Some(conversation_id.to_string()));
        tracing::debug!(conversation = %conversation_id, "opened conversation");

        let mut events = vec![InboxEvent::Scroll(self.scroll.on_conversation_switch())];

        let has_unread = self
            .store
            .registry
            .get(conversation_id)
            .is_some_and(|c| c.unread_count > 0);
        if has_unread {
            let clear = ConversationPatch {
                unread_count: Some(0),
                ..Default::default()
            };
            self.store.registry.patch(conversation_id, &clear);
            events.push(InboxEvent::ConversationsChanged);
        }

        let timeline = self.store.timeline_mut(conversation_id);
        if timeline.is_loaded() {
            self.reload_timeline(conversation_id);
        } else if let Some(page) = timeline.begin_load_older() {
            self.spawn_message_page(conversation_id, page, true);
        }

        events.push(InboxEvent::TimelineChanged {
            conversation_id: conversation_id.to_string(),
        });
        events
    }

    /// Select a conversation by id, fetching it first when it is not registered.
    pub fn open_deep_link(&mut self, conversation_id: &str) -> Vec<InboxEvent> {
        if self.store.registry.contains(conversation_id) {
            return self.open_conversation(conversation_id);
        }

        let generation = self.selection_generation;
        self.pending_deep_link = Some(conversation_id.to_string());
        let conversation_id = conversation_id.to_string();
        tracing::debug!(conversation = %conversation_id, "resolving deep link");
        self.spawn(move |backend| async move {
            let result = backend.get_conversation(&conversation_id).await;
            Request::DeepLink {
                conversation_id,
                generation,
                result,
            }
        });
        vec![]
    }

    pub fn close_conversation(&mut self) {
        if let Some(previous) = self.store.selected().map(str::to_string) {
            if let Some(timeline) = self.store.existing_timeline_mut(&previous) {
                timeline.abandon_load();
            }
        }
        self.selection_generation += 1;
        self.pending_deep_link = None;
        self.store.select(None);
    }

    /// Request the next older page of the open conversation.
    pub fn load_older(&mut self) -> bool {
        let Some(conversation_id) = self.store.selected().map(str::to_string) else {
            return false;
        };
        let timeline = self.store.timeline_mut(&conversation_id);
        if !timeline.is_loaded() {
            return false;
        }
        match timeline.begin_load_older() {
            Some(page) => {
                self.scroll.begin_prepend();
                self.spawn_message_page(&conversation_id, page, true);
                true
            }
            None => false,
        }
    }

    fn reload_timeline(&mut self, conversation_id: &str) {
        self.spawn_message_page(conversation_id, 1, false);
    }

    fn spawn_message_page(&mut self, conversation_id: &str, page: u32, claimed: bool) {
        let generation = self.selection_generation;
        let conversation_id = conversation_id.to_string();
        tracing::debug!(conversation = %conversation_id, page, "loading messages");
        self.spawn(move |backend| async move {
            let result = backend.list_messages(&conversation_id, page).await;
            Request::MessagePage {
                conversation_id,
                generation,
                claimed,
                page,
                result,
            }
        });
    }

    pub fn on_timeline_scroll(&mut self, viewport: Viewport) -> bool {
        let can_load_older = self
            .store
            .selected_timeline()
            .is_some_and(|t| t.is_loaded() && t.has_more_older() && !t.is_loading_older());
        if self.scroll.on_timeline_scroll(viewport, can_load_older) {
            return self.load_older();
        }
        false
    }

    /// The view rendered prepended history and measured its new content height.
    pub fn on_prepend_rendered(&mut self, new_scroll_height: f64) -> Vec<InboxEvent> {
        self.scroll
            .on_prepend_rendered(new_scroll_height)
            .map(InboxEvent::Scroll)
            .into_iter()
            .collect()
    }

    // ===== Sending =====

    /// Append an optimistic message and dispatch it in the background.
    /// Returns the temporary id, or None for blank input.
    pub fn send_message(&mut self, conversation_id: &str, content: &str) -> Option<(String, Vec<InboxEvent>)> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let (message, request) = self.pipeline.begin(conversation_id, content, Utc::now());
        let temp_id = message.id.clone();
        self.store.timeline_mut(conversation_id).append(message);

        let mut events = vec![InboxEvent::TimelineChanged {
            conversation_id: conversation_id.to_string(),
        }];
        if self.store.is_selected(conversation_id) {
            events.extend(self.scroll.on_append().map(InboxEvent::Scroll));
        }

        self.dispatch_send(request);
        Some((temp_id, events))
    }

    /// Re-dispatch a failed optimistic message in place.
    pub fn retry_send(&mut self, conversation_id: &str, temp_id: &str) -> Vec<InboxEvent> {
        let Some(failed) = self
            .store
            .timeline(conversation_id)
            .and_then(|t| t.get(temp_id))
            .cloned()
        else {
            return vec![];
        };
        let Some(request) = self.pipeline.retry(&failed, Utc::now()) else {
            return vec![];
        };

        if let Some(timeline) = self.store.existing_timeline_mut(conversation_id) {
            timeline.set_status(temp_id, DeliveryStatus::Sending);
        }
        self.dispatch_send(request);
        vec![InboxEvent::TimelineChanged {
            conversation_id: conversation_id.to_string(),
        }]
    }

    fn dispatch_send(&mut self, request: SendRequest) {
        let timeout = self.pipeline.timeout();
        tracing::debug!(
            conversation = %request.conversation_id,
            temp_id = %request.temp_id,
            "dispatching send"
        );
        self.spawn(move |backend| async move {
            let SendRequest {
                temp_id,
                conversation_id,
                body,
            } = request;
            let result = match tokio::time::timeout(
                timeout,
                backend.send_message(&conversation_id, &body),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(InboxError::Timeout {
                    secs: timeout.as_secs(),
                }),
            };
            Request::Sent {
                conversation_id,
                temp_id,
                result,
            }
        });
    }

    // ===== Conversation updates =====

    /// Optimistically patch one conversation and persist it.
    pub fn patch_conversation(&mut self, conversation_id: &str, patch: ConversationPatch) -> Vec<InboxEvent> {
        self.bulk_update(vec![conversation_id.to_string()], patch)
    }

    /// Optimistically patch several conversations with a single request.
    pub fn bulk_update(&mut self, conversation_ids: Vec<String>, patch: ConversationPatch) -> Vec<InboxEvent> {
        if conversation_ids.is_empty() {
            return vec![];
        }
        let mut previous = Vec::with_capacity(conversation_ids.len());
        for id in &conversation_ids {
            if let Some(conversation) = self.store.registry.get(id) {
                previous.push(conversation.clone());
            }
            self.store.registry.patch(id, &patch);
        }

        let ids = conversation_ids;
        self.spawn(move |backend| async move {
            let result = match ids.as_slice() {
                [single] => backend
                    .update_conversation(single, &patch)
                    .await
                    .map(|c| vec![c]),
                _ => backend.bulk_update(&ids, &patch).await,
            };
            Request::Patched {
                conversation_ids: ids,
                previous,
                result,
            }
        });
        vec![InboxEvent::ConversationsChanged]
    }

    // ===== Message actions =====

    pub fn star_message(&mut self, conversation_id: &str, message_id: &str, starred: bool) -> bool {
        self.spawn_message_action(conversation_id, message_id, MessageAction::Star, move |backend, c, m| async move {
            backend.star_message(&c, &m, starred).await.map(Some)
        })
    }

    pub fn react_to_message(&mut self, conversation_id: &str, message_id: &str, emoji: &str) -> bool {
        let emoji = emoji.to_string();
        self.spawn_message_action(conversation_id, message_id, MessageAction::React, move |backend, c, m| async move {
            backend.react_to_message(&c, &m, &emoji).await.map(Some)
        })
    }

    /// Delete a message. It stays in the timeline until the backend confirms.
    pub fn delete_message(&mut self, conversation_id: &str, message_id: &str) -> bool {
        self.spawn_message_action(conversation_id, message_id, MessageAction::Delete, |backend, c, m| async move {
            backend.delete_message(&c, &m).await.map(|_| None)
        })
    }

    fn spawn_message_action<F, Fut>(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        action: MessageAction,
        call: F,
    ) -> bool
    where
        F: FnOnce(Arc<dyn Backend>, String, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<Message>>> + Send + 'static,
    {
        // Unconfirmed messages have no server-side identity yet
        if is_temporary_id(message_id) {
            return false;
        }
        let conversation_id = conversation_id.to_string();
        let message_id = message_id.to_string();
        self.spawn(move |backend| async move {
            let result = call(backend, conversation_id.clone(), message_id.clone()).await;
            Request::MessageAction {
                conversation_id,
                message_id,
                action,
                result,
            }
        });
        true
    }

    fn spawn<F, Fut>(&mut self, make: F)
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = Request> + Send + 'static,
    {
        let future = make(self.backend.clone());
        self.tasks.spawn(async move { Completion(future.await) });
    }

    // ===== Completions =====

    fn complete(&mut self, request: Request) -> Vec<InboxEvent> {
        match request {
            Request::ConversationPage {
                tab,
                generation,
                page,
                result,
            } => self.complete_conversation_page(tab, generation, page, result),
            Request::MessagePage {
                conversation_id,
                generation,
                claimed,
                page,
                result,
            } => self.complete_message_page(conversation_id, generation, claimed, page, result),
            Request::DeepLink {
                conversation_id,
                generation,
                result,
            } => {
                if generation != self.selection_generation
                    || self.pending_deep_link.as_deref() != Some(conversation_id.as_str())
                {
                    tracing::debug!(conversation = %conversation_id, "discarding stale deep link");
                    return vec![];
                }
                self.pending_deep_link = None;
                match result {
                    Ok(conversation) => {
                        self.store.registry.upsert(conversation);
                        let mut events = vec![InboxEvent::ConversationsChanged];
                        events.extend(self.open_conversation(&conversation_id));
                        events
                    }
                    Err(e) => {
                        tracing::warn!(conversation = %conversation_id, error = %e, "deep link failed");
                        vec![InboxEvent::LoadFailed {
                            target: LoadTarget::Conversation(conversation_id),
                            error: e.to_string(),
                        }]
                    }
                }
            }
            Request::Sent {
                conversation_id,
                temp_id,
                result,
            } => self.complete_send(conversation_id, temp_id, result),
            Request::Patched {
                conversation_ids,
                previous,
                result,
            } => match result {
                Ok(conversations) => {
                    for conversation in conversations {
                        self.store.registry.upsert(conversation);
                    }
                    vec![InboxEvent::ConversationsChanged]
                }
                Err(e) => {
                    tracing::warn!(count = conversation_ids.len(), error = %e, "conversation update failed");
                    for conversation in previous {
                        self.store.registry.upsert(conversation);
                    }
                    self.refresh_registry();
                    vec![
                        InboxEvent::ConversationsChanged,
                        InboxEvent::PatchFailed {
                            conversation_ids,
                            error: e.to_string(),
                        },
                    ]
                }
            },
            Request::MessageAction {
                conversation_id,
                message_id,
                action,
                result,
            } => {
                let changed = match result {
                    Ok(updated) => {
                        let Some(timeline) = self.store.existing_timeline_mut(&conversation_id) else {
                            return vec![];
                        };
                        match (action, updated) {
                            (MessageAction::Delete, _) => timeline.remove(&message_id).is_some(),
                            (_, Some(message)) => timeline.update(message),
                            (_, None) => false,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(message = %message_id, ?action, error = %e, "message action failed");
                        return vec![InboxEvent::MessageActionFailed {
                            conversation_id,
                            message_id,
                            error: e.to_string(),
                        }];
                    }
                };
                if changed {
                    vec![InboxEvent::TimelineChanged { conversation_id }]
                } else {
                    vec![]
                }
            }
        }
    }

    fn complete_conversation_page(
        &mut self,
        tab: Tab,
        generation: u64,
        page: u32,
        result: Result<ConversationPage>,
    ) -> Vec<InboxEvent> {
        if generation != self.list_generation {
            tracing::debug!(%tab, page, "discarding stale conversation page");
            return vec![];
        }
        let events = match result {
            Ok(conversation_page) => {
                let changed = self.store.registry.apply_page(tab, page, conversation_page);
                tracing::debug!(%tab, page, changed, "conversation page merged");
                vec![InboxEvent::ConversationsChanged]
            }
            Err(e) => {
                tracing::warn!(%tab, page, error = %e, "conversation page failed");
                self.store.registry.fail_page(tab, page, e.to_string());
                vec![
                    InboxEvent::ConversationsChanged,
                    InboxEvent::LoadFailed {
                        target: LoadTarget::Conversations(tab),
                        error: e.to_string(),
                    },
                ]
            }
        };
        if page == 1 && std::mem::take(&mut self.refresh_queued) {
            self.refresh_registry();
        }
        events
    }

    fn complete_message_page(
        &mut self,
        conversation_id: String,
        generation: u64,
        claimed: bool,
        page: u32,
        result: Result<MessagePage>,
    ) -> Vec<InboxEvent> {
        if generation != self.selection_generation || !self.store.is_selected(&conversation_id) {
            tracing::debug!(conversation = %conversation_id, page, "discarding stale message page");
            return vec![];
        }

        let timeline = self.store.timeline_mut(&conversation_id);
        match result {
            Ok(message_page) => {
                let inserted = timeline.merge_page(page, message_page);
                if claimed && page > 1 {
                    if inserted == 0 {
                        self.scroll.cancel_prepend();
                        return vec![];
                    }
                    return vec![InboxEvent::HistoryPrepended {
                        conversation_id,
                        inserted,
                    }];
                }
                let mut events = vec![InboxEvent::TimelineChanged { conversation_id }];
                if inserted > 0 {
                    events.extend(self.scroll.on_append().map(InboxEvent::Scroll));
                }
                events
            }
            Err(e) => {
                tracing::warn!(conversation = %conversation_id, page, error = %e, "message page failed");
                if claimed {
                    timeline.fail_load(page, e.to_string());
                    if page > 1 {
                        self.scroll.cancel_prepend();
                    }
                }
                vec![InboxEvent::LoadFailed {
                    target: LoadTarget::Timeline(conversation_id),
                    error: e.to_string(),
                }]
            }
        }
    }

    fn complete_send(
        &mut self,
        conversation_id: String,
        temp_id: String,
        result: Result<Message>,
    ) -> Vec<InboxEvent> {
        match result {
            Ok(message) => {
                self.pipeline.confirm(&temp_id);
                tracing::debug!(temp_id = %temp_id, message = %message.id, "send confirmed");

                let mut events = Vec::new();
                if self.store.registry.apply_preview(&message, false) {
                    events.push(InboxEvent::ConversationsChanged);
                }
                if let Some(timeline) = self.store.existing_timeline_mut(&conversation_id) {
                    timeline.replace(&temp_id, message);
                    events.push(InboxEvent::TimelineChanged {
                        conversation_id: conversation_id.clone(),
                    });
                }
                if !self.reconciler.is_connected() && self.store.is_selected(&conversation_id) {
                    self.reload_timeline(&conversation_id);
                }
                events
            }
            Err(e) => {
                self.pipeline.fail(&temp_id);
                tracing::warn!(temp_id = %temp_id, error = %e, "send failed");

                let mut events = Vec::new();
                if let Some(timeline) = self.store.existing_timeline_mut(&conversation_id) {
                    if timeline.set_status(&temp_id, DeliveryStatus::Error) {
                        events.push(InboxEvent::TimelineChanged {
                            conversation_id: conversation_id.clone(),
                        });
                    }
                }
                events.push(InboxEvent::SendFailed {
                    conversation_id,
                    temp_id,
                    error: e.to_string(),
                });
                events
            }
        }
    }
}

async fn recv_signal(subscription: &mut Option<Subscription>) -> Option<TransportSignal> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
