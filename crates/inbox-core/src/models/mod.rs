pub mod conversation;
pub mod message;
pub mod page;

pub use conversation::{
    Classification, Conversation, ConversationMetadata, ConversationPatch, ConversationStatus,
    Customer, MessagePreview, Tab,
};
pub use message::{
    is_temporary_id, new_temporary_id, Attachment, DeliveryStatus, KnownMetadata, Message,
    MessageMetadata, MessageType, Reaction, ReplyRef,
};
pub use page::{ConversationPage, ConversationQuery, MessagePage, TabCounts};
