//! Application-wide constants
//!
//! Defaults for the tunables in `InboxConfig` and a few fixed wire values.

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Socket file name for the push stream (inside the runtime dir)
pub const PUSH_SOCKET_NAME: &str = "inbox-push.sock";

/// Prefix for client-issued message ids that have not been confirmed yet
pub const TEMP_ID_PREFIX: &str = "tmp-";

// Agent defaults
pub const DEFAULT_AGENT_ID: &str = "agent";
pub const DEFAULT_AGENT_NAME: &str = "Agent";

/// Conversations requested per registry page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Registry refresh debounce window
pub const REFRESH_DEBOUNCE_MS: u64 = 500;

/// Upper bound on how long a continuous event storm can postpone a refresh
pub const REFRESH_MAX_WAIT_MS: u64 = 2_000;

/// Typing indicator lifetime when no explicit stop arrives
pub const TYPING_TIMEOUT_SECS: u64 = 15;

/// Poll interval while the push transport is down
pub const DISCONNECTED_POLL_SECS: u64 = 10;

/// Timeout for a single send attempt
pub const SEND_TIMEOUT_SECS: u64 = 30;

/// Delay before the socket client reconnects after a drop
pub const RECONNECT_DELAY_SECS: u64 = 2;

// Scroll thresholds (pixels)
pub const SCROLL_BOTTOM_THRESHOLD_PX: f64 = 100.0;
pub const SCROLL_TOP_THRESHOLD_PX: f64 = 50.0;
pub const LIST_BOTTOM_THRESHOLD_PX: f64 = 200.0;

/// Delays for forced scroll-to-bottom retries while layout settles
pub const FORCE_SCROLL_RETRY_MS: [u64; 4] = [0, 50, 150, 300];
