pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod realtime;
pub mod runtime;
pub mod scroll;
pub mod send;
pub mod store;

pub use backend::{Backend, HttpBackend};
pub use config::InboxConfig;
pub use error::{InboxError, Result};
pub use events::{InboxEvent, LoadTarget};
pub use runtime::{InboxRuntime, InboxUpdate};
