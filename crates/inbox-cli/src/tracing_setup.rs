use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives, e.g. `INBOX_LOG=inbox_core=debug`
pub const LOG_ENV: &str = "INBOX_LOG";
/// Append logs to this file in addition to stderr
pub const LOG_FILE_ENV: &str = "INBOX_LOG_FILE";

const DEFAULT_FILTER: &str = "info";

pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // stdout carries command output
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter).with(stderr_layer);

    match std::env::var(LOG_FILE_ENV) {
        Ok(log_path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {}", log_path))?;

            let file_layer = fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true);

            registry
                .with(file_layer)
                .try_init()
                .context("Failed to install tracing subscriber")?;
            tracing::debug!(path = %log_path, "file logging enabled");
        }
        Err(_) => registry
            .try_init()
            .context("Failed to install tracing subscriber")?,
    }
    Ok(())
}
