use thiserror::Error;

pub type Result<T, E = InboxError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Not found: {resource}")]
    NotFound { resource: String },
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("Invalid API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Malformed push event: {reason}")]
    MalformedEvent { reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
