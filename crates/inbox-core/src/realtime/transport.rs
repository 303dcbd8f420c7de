use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::types::TransportSignal;

/// A source of push signals. `run` drives the connection until the receiver
/// side goes away; reconnect policy belongs to the implementation.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn run(self: Box<Self>, signals: mpsc::Sender<TransportSignal>);
}

const SIGNAL_BUFFER: usize = 256;

/// A running transport. Dropping it stops delivery.
pub struct Subscription {
    receiver: mpsc::Receiver<TransportSignal>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Spawn the transport onto the current tokio runtime.
    pub fn spawn(transport: Box<dyn Transport>) -> Self {
        let (tx, receiver) = mpsc::channel(SIGNAL_BUFFER);
        let task = tokio::spawn(transport.run(tx));
        Self { receiver, task }
    }

    /// Next signal, or None once the transport has stopped for good.
    pub async fn recv(&mut self) -> Option<TransportSignal> {
        self.receiver.recv().await
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// In-process transport fed through a [`ChannelFeed`]. Used by tests and by
/// embedders that already own a push connection.
pub struct ChannelTransport {
    feed: mpsc::UnboundedReceiver<TransportSignal>,
}

/// Sending half of a [`ChannelTransport`].
#[derive(Clone)]
pub struct ChannelFeed {
    tx: mpsc::UnboundedSender<TransportSignal>,
}

impl ChannelTransport {
    pub fn new() -> (Self, ChannelFeed) {
        let (tx, feed) = mpsc::unbounded_channel();
        (Self { feed }, ChannelFeed { tx })
    }
}

impl ChannelFeed {
    pub fn connect(&self) -> bool {
        self.tx.send(TransportSignal::Connected).is_ok()
    }

    pub fn disconnect(&self) -> bool {
        self.tx.send(TransportSignal::Disconnected).is_ok()
    }

    pub fn send(&self, signal: TransportSignal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// Feed a raw wire frame, exactly as a socket would deliver it.
    pub fn push_raw(&self, frame: &str) -> bool {
        self.send(TransportSignal::from_frame(frame))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn run(mut self: Box<Self>, signals: mpsc::Sender<TransportSignal>) {
        while let Some(signal) = self.feed.recv().await {
            if signals.send(signal).await.is_err() {
                tracing::debug!("signal receiver dropped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_forwards_in_order() {
        let (transport, feed) = ChannelTransport::new();
        let mut subscription = Subscription::spawn(Box::new(transport));

        feed.connect();
        feed.push_raw(r#"{"type":"ai_typing","conversationId":"c1","isTyping":true}"#);
        feed.push_raw("garbage");
        feed.disconnect();

        assert_eq!(subscription.recv().await, Some(TransportSignal::Connected));
        assert!(matches!(
            subscription.recv().await,
            Some(TransportSignal::Event(_))
        ));
        assert!(matches!(
            subscription.recv().await,
            Some(TransportSignal::Malformed { .. })
        ));
        assert_eq!(
            subscription.recv().await,
            Some(TransportSignal::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_stream_ends_when_feed_dropped() {
        let (transport, feed) = ChannelTransport::new();
        let mut subscription = Subscription::spawn(Box::new(transport));
        feed.connect();
        drop(feed);

        assert_eq!(subscription.recv().await, Some(TransportSignal::Connected));
        assert_eq!(subscription.recv().await, None);
    }
}
