use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::mpsc;

use super::transport::Transport;
use super::types::TransportSignal;
use crate::constants::RECONNECT_DELAY_SECS;

/// Push transport reading newline-delimited JSON frames from a Unix socket.
/// Reconnects after a fixed delay whenever the socket is missing or closes.
pub struct SocketTransport {
    socket_path: PathBuf,
    reconnect_delay: Duration,
}

impl SocketTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    async fn connect(&self) -> Option<UnixStream> {
        if !self.socket_path.exists() {
            tracing::debug!(path = ?self.socket_path, "push socket not found");
            return None;
        }

        match UnixStream::connect(&self.socket_path).await {
            Ok(stream) => {
                tracing::info!(path = ?self.socket_path, "connected to push socket");
                Some(stream)
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to connect to push socket");
                None
            }
        }
    }
}

/// Forward every non-empty line as a signal. Returns false once the receiver is gone.
/// A frame that is not valid UTF-8 is reported as malformed; the stream keeps going.
async fn forward_frames<R>(
    mut reader: R,
    signals: &mpsc::Sender<TransportSignal>,
) -> Result<bool, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(true);
        }

        let signal = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                TransportSignal::from_frame(line)
            }
            Err(e) => TransportSignal::Malformed {
                reason: format!("frame is not UTF-8: {}", e),
            },
        };
        if let TransportSignal::Malformed { reason } = &signal {
            tracing::warn!(%reason, "dropping malformed push frame");
        }
        if signals.send(signal).await.is_err() {
            return Ok(false);
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn run(self: Box<Self>, signals: mpsc::Sender<TransportSignal>) {
        loop {
            if let Some(stream) = self.connect().await {
                if signals.send(TransportSignal::Connected).await.is_err() {
                    break;
                }

                match forward_frames(BufReader::new(stream), &signals).await {
                    Ok(false) => break,
                    Ok(true) => tracing::info!("push socket closed"),
                    Err(e) => tracing::warn!(error = %e, "push socket read error"),
                }

                if signals.send(TransportSignal::Disconnected).await.is_err() {
                    break;
                }
            } else if signals.is_closed() {
                break;
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
        tracing::debug!("push transport stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_forward_frames_skips_blank_lines() {
        let input = b"\n{\"type\":\"ai_typing\",\"conversationId\":\"c1\",\"isTyping\":false}\n\n{oops}\n";
        let (tx, mut rx) = mpsc::channel(8);

        let still_open = forward_frames(&input[..], &tx).await.unwrap();
        assert!(still_open);
        drop(tx);

        assert!(matches!(rx.recv().await, Some(TransportSignal::Event(_))));
        assert!(matches!(
            rx.recv().await,
            Some(TransportSignal::Malformed { .. })
        ));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_does_not_end_stream() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"type\":\"ai_typing\",\"conversationId\":\"c1\",\"isTyping\":true}\n");
        input.extend_from_slice(b"\xff\xfe bad\n");
        input.extend_from_slice(b"{\"type\":\"ai_typing\",\"conversationId\":\"c2\",\"isTyping\":true}\n");
        let (tx, mut rx) = mpsc::channel(8);

        assert!(forward_frames(&input[..], &tx).await.unwrap());
        drop(tx);

        assert!(matches!(rx.recv().await, Some(TransportSignal::Event(_))));
        assert!(matches!(
            rx.recv().await,
            Some(TransportSignal::Malformed { reason }) if reason.contains("UTF-8")
        ));
        match rx.recv().await {
            Some(TransportSignal::Event(event)) => assert_eq!(event.conversation_id(), "c2"),
            other => panic!("expected the frame after the bad one, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_socket_connect_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let transport = SocketTransport::new(&path).with_reconnect_delay(Duration::from_secs(60));
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(Box::new(transport).run(tx));

        let (mut stream, _) = listener.accept().await.unwrap();
        stream
            .write_all(b"{\"type\":\"ai_typing\",\"conversationId\":\"c9\",\"isTyping\":true}\n")
            .await
            .unwrap();
        drop(stream);

        assert_eq!(rx.recv().await, Some(TransportSignal::Connected));
        assert!(matches!(rx.recv().await, Some(TransportSignal::Event(_))));
        assert_eq!(rx.recv().await, Some(TransportSignal::Disconnected));

        task.abort();
    }
}
