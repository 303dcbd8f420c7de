use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AGENT_ID, DEFAULT_AGENT_NAME, DEFAULT_API_URL, DEFAULT_PAGE_SIZE,
    DISCONNECTED_POLL_SECS, LIST_BOTTOM_THRESHOLD_PX, PUSH_SOCKET_NAME, REFRESH_DEBOUNCE_MS, REFRESH_MAX_WAIT_MS,
    SCROLL_BOTTOM_THRESHOLD_PX, SCROLL_TOP_THRESHOLD_PX, SEND_TIMEOUT_SECS, TYPING_TIMEOUT_SECS,
};

/// Identity stamped on optimistic messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentity {
    pub id: String,
    pub name: String,
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self {
            id: DEFAULT_AGENT_ID.to_string(),
            name: DEFAULT_AGENT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollThresholds {
    pub bottom_px: f64,
    pub top_px: f64,
    pub list_bottom_px: f64,
}

impl Default for ScrollThresholds {
    fn default() -> Self {
        Self {
            bottom_px: SCROLL_BOTTOM_THRESHOLD_PX,
            top_px: SCROLL_TOP_THRESHOLD_PX,
            list_bottom_px: LIST_BOTTOM_THRESHOLD_PX,
        }
    }
}

/// Session configuration, loadable from a camelCase JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboxConfig {
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub socket_path: PathBuf,
    pub agent: AgentIdentity,
    pub page_size: u32,
    pub refresh_debounce_ms: u64,
    pub refresh_max_wait_ms: u64,
    pub typing_timeout_secs: u64,
    pub disconnected_poll_secs: u64,
    pub send_timeout_secs: u64,
    pub scroll: ScrollThresholds,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            socket_path: default_socket_path(),
            agent: AgentIdentity::default(),
            page_size: DEFAULT_PAGE_SIZE,
            refresh_debounce_ms: REFRESH_DEBOUNCE_MS,
            refresh_max_wait_ms: REFRESH_MAX_WAIT_MS,
            typing_timeout_secs: TYPING_TIMEOUT_SECS,
            disconnected_poll_secs: DISCONNECTED_POLL_SECS,
            send_timeout_secs: SEND_TIMEOUT_SECS,
            scroll: ScrollThresholds::default(),
        }
    }
}

impl InboxConfig {
    /// Load config from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: InboxConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply `INBOX_*` environment overrides on top of this config.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("INBOX_API_URL") {
            self.api_url = url;
        }
        if let Some(token) = lookup("INBOX_API_TOKEN") {
            self.api_token = Some(token);
        }
        if let Some(socket) = lookup("INBOX_SOCKET") {
            self.socket_path = PathBuf::from(socket);
        }
        if let Some(id) = lookup("INBOX_AGENT_ID") {
            self.agent.id = id;
        }
        if let Some(name) = lookup("INBOX_AGENT_NAME") {
            self.agent.name = name;
        }
        self
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn refresh_max_wait(&self) -> Duration {
        Duration::from_millis(self.refresh_max_wait_ms)
    }

    pub fn typing_timeout(&self) -> Duration {
        Duration::from_secs(self.typing_timeout_secs)
    }

    pub fn disconnected_poll(&self) -> Duration {
        Duration::from_secs(self.disconnected_poll_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(PUSH_SOCKET_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox.json");
        std::fs::write(
            &path,
            r#"{"apiUrl": "https://inbox.example/api", "agent": {"id": "a7", "name": "Rita"}}"#,
        )
        .unwrap();

        let config = InboxConfig::load(&path).unwrap();
        assert_eq!(config.api_url, "https://inbox.example/api");
        assert_eq!(config.agent.name, "Rita");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.refresh_debounce(), Duration::from_millis(500));
        assert_eq!(config.typing_timeout(), Duration::from_secs(15));
        assert_eq!(config.disconnected_poll(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = InboxConfig::load(Path::new("/nonexistent/inbox.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("INBOX_API_URL", "http://10.0.0.2/api"),
            ("INBOX_SOCKET", "/run/push.sock"),
            ("INBOX_API_TOKEN", "secret"),
        ]
        .into_iter()
        .collect();

        let config = InboxConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_url, "http://10.0.0.2/api");
        assert_eq!(config.socket_path, PathBuf::from("/run/push.sock"));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.agent, AgentIdentity::default());
    }
}
