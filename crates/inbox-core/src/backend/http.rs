use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Backend;
use crate::config::InboxConfig;
use crate::error::{InboxError, Result};
use crate::models::{Conversation, ConversationPage, ConversationPatch, ConversationQuery, Message, MessagePage};
use crate::send::OutgoingMessage;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdateBody<'a> {
    conversation_ids: &'a [String],
    #[serde(flatten)]
    patch: &'a ConversationPatch,
}

#[derive(Serialize)]
struct StarBody {
    starred: bool,
}

#[derive(Serialize)]
struct ReactionBody<'a> {
    emoji: &'a str,
}

/// REST client for the inbox backend
pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    page_size: u32,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            page_size: crate::constants::DEFAULT_PAGE_SIZE,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &InboxConfig) -> Self {
        let mut backend = Self::new(config.api_url.clone(), config.api_token.clone());
        backend.page_size = config.page_size;
        backend
    }

    /// Endpoint URL below the base. Each segment is percent-encoded on its own,
    /// so ids containing `/` or spaces stay a single segment.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = |reason: String| InboxError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let builder = self.client.request(method, self.url(segments)?);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn execute(&self, builder: RequestBuilder, resource: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(InboxError::NotFound {
                resource: resource.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %resource, "backend request failed");
            return Err(InboxError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, resource: &str) -> Result<T> {
        let response = self.execute(builder, resource).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_conversations(&self, query: &ConversationQuery) -> Result<ConversationPage> {
        let mut pairs = query.query_pairs();
        pairs.push(("limit", self.page_size.to_string()));
        let builder = self.request(Method::GET, &["conversations"])?.query(&pairs);
        self.fetch(builder, "conversations").await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let builder = self.request(Method::GET, &["conversations", conversation_id])?;
        self.fetch(builder, conversation_id).await
    }

    async fn list_messages(&self, conversation_id: &str, page: u32) -> Result<MessagePage> {
        let builder = self
            .request(Method::GET, &["conversations", conversation_id, "messages"])?
            .query(&[("page", page.to_string())]);
        self.fetch(builder, conversation_id).await
    }

    async fn send_message(&self, conversation_id: &str, message: &OutgoingMessage) -> Result<Message> {
        let builder = self
            .request(Method::POST, &["conversations", conversation_id, "messages"])?
            .json(message);
        self.fetch(builder, conversation_id).await
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        patch: &ConversationPatch,
    ) -> Result<Conversation> {
        let builder = self
            .request(Method::PUT, &["conversations", conversation_id])?
            .json(patch);
        self.fetch(builder, conversation_id).await
    }

    async fn bulk_update(
        &self,
        conversation_ids: &[String],
        patch: &ConversationPatch,
    ) -> Result<Vec<Conversation>> {
        let body = BulkUpdateBody {
            conversation_ids,
            patch,
        };
        let builder = self
            .request(Method::PUT, &["conversations", "bulk-update"])?
            .json(&body);
        self.fetch(builder, "conversations/bulk-update").await
    }

    async fn star_message(&self, conversation_id: &str, message_id: &str, starred: bool) -> Result<Message> {
        let builder = self
            .request(Method::PUT, &message_segments(conversation_id, message_id, "star"))?
            .json(&StarBody { starred });
        self.fetch(builder, message_id).await
    }

    async fn react_to_message(&self, conversation_id: &str, message_id: &str, emoji: &str) -> Result<Message> {
        let builder = self
            .request(Method::PUT, &message_segments(conversation_id, message_id, "reaction"))?
            .json(&ReactionBody { emoji });
        self.fetch(builder, message_id).await
    }

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        let builder = self.request(
            Method::DELETE,
            &["conversations", conversation_id, "messages", message_id],
        )?;
        self.execute(builder, message_id).await.map(|_| ())
    }
}

fn message_segments<'a>(conversation_id: &'a str, message_id: &'a str, action: &'a str) -> [&'a str; 5] {
    ["conversations", conversation_id, "messages", message_id, action]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationStatus;

    #[test]
    fn test_url_escapes_ids() {
        let backend = HttpBackend::new("http://localhost:3000/api", None);
        assert_eq!(
            backend.url(&["conversations", "c-1"]).unwrap().as_str(),
            "http://localhost:3000/api/conversations/c-1"
        );
        assert_eq!(
            backend
                .url(&message_segments("c/1", "m 2", "star"))
                .unwrap()
                .as_str(),
            "http://localhost:3000/api/conversations/c%2F1/messages/m%202/star"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:3000/api/", None);
        assert_eq!(
            backend.url(&["conversations"]).unwrap().as_str(),
            "http://localhost:3000/api/conversations"
        );
    }

    #[test]
    fn test_invalid_base_url_is_an_error() {
        let backend = HttpBackend::new("not a url", None);
        let err = backend.url(&["conversations"]).unwrap_err();
        assert!(matches!(err, InboxError::InvalidUrl { .. }));
    }

    #[test]
    fn test_bulk_body_wire_format() {
        let ids = vec!["c1".to_string(), "c2".to_string()];
        let patch = ConversationPatch::status(ConversationStatus::Done);
        let body = BulkUpdateBody {
            conversation_ids: &ids,
            patch: &patch,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "conversationIds": ["c1", "c2"], "status": "done" })
        );
    }
}
