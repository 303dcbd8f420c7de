use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use inbox_core::models::{ConversationPatch, ConversationStatus, Tab};
use inbox_core::realtime::SocketTransport;
use inbox_core::{InboxConfig, InboxEvent, InboxRuntime};

use super::render;

/// Operator command, already validated by the argument parser.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Conversations {
        tab: Tab,
        search: Option<String>,
        pages: u32,
    },
    Messages {
        conversation_id: String,
        older_pages: u32,
    },
    Send {
        conversation_id: String,
        content: String,
    },
    Close {
        conversation_ids: Vec<String>,
    },
    Watch {
        conversation_id: Option<String>,
        socket: Option<PathBuf>,
    },
}

/// Run until every background request has finished.
async fn drain(runtime: &mut InboxRuntime) -> Vec<InboxEvent> {
    let mut events = Vec::new();
    while let Some(update) = runtime.next_update().await {
        events.extend(runtime.process(update));
    }
    events
}

fn first_failure(events: &[InboxEvent]) -> Option<String> {
    events.iter().find_map(|event| match event {
        InboxEvent::LoadFailed { error, .. }
        | InboxEvent::SendFailed { error, .. }
        | InboxEvent::PatchFailed { error, .. }
        | InboxEvent::MessageActionFailed { error, .. } => Some(error.clone()),
        _ => None,
    })
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub async fn run_command(command: CliCommand, config: InboxConfig, json: bool, pretty: bool) -> Result<()> {
    let mut runtime = InboxRuntime::from_config(&config);
    let result = match command {
        CliCommand::Conversations { tab, search, pages } => {
            list_conversations(&mut runtime, tab, search, pages, json, pretty).await
        }
        CliCommand::Messages {
            conversation_id,
            older_pages,
        } => show_messages(&mut runtime, &conversation_id, older_pages, json, pretty).await,
        CliCommand::Send {
            conversation_id,
            content,
        } => send(&mut runtime, &conversation_id, &content, json, pretty).await,
        CliCommand::Close { conversation_ids } => close(&mut runtime, conversation_ids).await,
        CliCommand::Watch {
            conversation_id,
            socket,
        } => {
            let socket = socket.unwrap_or_else(|| config.socket_path.clone());
            watch(&mut runtime, socket, conversation_id).await
        }
    };
    runtime.shutdown();
    result
}

async fn list_conversations(
    runtime: &mut InboxRuntime,
    tab: Tab,
    search: Option<String>,
    pages: u32,
    json: bool,
    pretty: bool,
) -> Result<()> {
    runtime.select_tab(tab);
    runtime.set_search(search.clone());
    // No-op when select_tab or set_search already started page 1
    runtime.load_next_conversations();

    let mut events = drain(runtime).await;
    for _ in 1..pages {
        if !runtime.load_next_conversations() {
            break;
        }
        events.extend(drain(runtime).await);
    }
    if let Some(error) = first_failure(&events) {
        bail!("Failed to load conversations: {}", error);
    }

    let list = runtime.store().registry.list(tab, search.as_deref());
    if json {
        return print_json(&list, pretty);
    }
    println!("{}", render::counts_line(&runtime.store().registry.counts()));
    for conversation in list {
        println!("{}", render::conversation_line(conversation));
    }
    Ok(())
}

async fn show_messages(
    runtime: &mut InboxRuntime,
    conversation_id: &str,
    older_pages: u32,
    json: bool,
    pretty: bool,
) -> Result<()> {
    let mut events = runtime.open_deep_link(conversation_id);
    events.extend(drain(runtime).await);
    for _ in 0..older_pages {
        if !runtime.load_older() {
            break;
        }
        events.extend(drain(runtime).await);
    }
    if let Some(error) = first_failure(&events) {
        bail!("Failed to load {}: {}", conversation_id, error);
    }

    let timeline = runtime
        .store()
        .timeline(conversation_id)
        .with_context(|| format!("No timeline for {}", conversation_id))?;
    if json {
        return print_json(&timeline.messages(), pretty);
    }
    for line in render::timeline_lines(timeline) {
        println!("{}", line);
    }
    if timeline.has_more_older() {
        println!("(older messages available, use --older)");
    }
    Ok(())
}

async fn send(
    runtime: &mut InboxRuntime,
    conversation_id: &str,
    content: &str,
    json: bool,
    pretty: bool,
) -> Result<()> {
    let Some((temp_id, _)) = runtime.send_message(conversation_id, content) else {
        bail!("Message is empty");
    };
    let events = drain(runtime).await;
    if let Some(error) = first_failure(&events) {
        bail!("Send failed: {}", error);
    }

    // The server echoes the temporary id as client_id when it supports it
    let confirmed = runtime
        .store()
        .timeline(conversation_id)
        .and_then(|t| t.messages().iter().find(|m| m.client_id.as_deref() == Some(temp_id.as_str())));
    match (confirmed, json) {
        (Some(message), true) => print_json(message, pretty)?,
        (Some(message), false) => println!("sent {}", message.id),
        (None, _) => println!("sent"),
    }
    Ok(())
}

async fn close(runtime: &mut InboxRuntime, conversation_ids: Vec<String>) -> Result<()> {
    if conversation_ids.is_empty() {
        bail!("No conversations given");
    }
    let count = conversation_ids.len();
    runtime.bulk_update(conversation_ids, ConversationPatch::status(ConversationStatus::Done));
    let events = drain(runtime).await;
    if let Some(error) = first_failure(&events) {
        bail!("Update failed: {}", error);
    }
    println!("closed {} conversation(s)", count);
    Ok(())
}

async fn watch(runtime: &mut InboxRuntime, socket: PathBuf, conversation_id: Option<String>) -> Result<()> {
    tracing::info!(socket = %socket.display(), "watching push stream");
    runtime.attach(Box::new(SocketTransport::new(socket)));
    runtime.load_next_conversations();
    if let Some(conversation_id) = &conversation_id {
        runtime.open_deep_link(conversation_id);
    }

    loop {
        tokio::select! {
            update = runtime.next_update() => {
                let Some(update) = update else { break };
                for event in runtime.process(update) {
                    if let Some(line) = render::event_line(&event, runtime.store()) {
                        println!("{}", line);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_picks_errors_only() {
        let events = vec![
            InboxEvent::ConversationsChanged,
            InboxEvent::SendFailed {
                conversation_id: "c1".to_string(),
                temp_id: "tmp-1".to_string(),
                error: "Backend returned 502: bad gateway".to_string(),
            },
        ];
        assert_eq!(
            first_failure(&events).as_deref(),
            Some("Backend returned 502: bad gateway")
        );
        assert_eq!(first_failure(&events[..1]), None);
    }
}
