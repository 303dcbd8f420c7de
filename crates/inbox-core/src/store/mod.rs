pub mod inbox_store;
pub mod registry;
pub mod reply_status;
pub mod timeline;

pub use inbox_store::InboxStore;
pub use registry::{ConversationRegistry, TabPagination};
pub use reply_status::compute_answered;
pub use timeline::MessageTimeline;
