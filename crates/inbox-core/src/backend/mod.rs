mod http;

pub use http::HttpBackend;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Conversation, ConversationPage, ConversationPatch, ConversationQuery, Message, MessagePage};
use crate::send::OutgoingMessage;

/// Request/response surface of the inbox backend. Every call is independent;
/// results may complete in any order.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_conversations(&self, query: &ConversationQuery) -> Result<ConversationPage>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation>;

    /// History page `page` (1 = newest), oldest message first within the page.
    async fn list_messages(&self, conversation_id: &str, page: u32) -> Result<MessagePage>;

    async fn send_message(&self, conversation_id: &str, message: &OutgoingMessage) -> Result<Message>;

    async fn update_conversation(
        &self,
        conversation_id: &str,
        patch: &ConversationPatch,
    ) -> Result<Conversation>;

    async fn bulk_update(
        &self,
        conversation_ids: &[String],
        patch: &ConversationPatch,
    ) -> Result<Vec<Conversation>>;

    async fn star_message(&self, conversation_id: &str, message_id: &str, starred: bool) -> Result<Message>;

    async fn react_to_message(&self, conversation_id: &str, message_id: &str, emoji: &str) -> Result<Message>;

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()>;
}
