//! Real-time push: wire events, transports and the reconciler that folds them
//! into the store.

mod debounce;
mod reconciler;
mod socket;
mod transport;
mod types;
mod typing;

pub use debounce::Debouncer;
pub use reconciler::{ConnectionState, ReconcileOutcome, Reconciler};
pub use socket::SocketTransport;
pub use transport::{ChannelFeed, ChannelTransport, Subscription, Transport};
pub use types::{PushEvent, TransportSignal};
pub use typing::TypingIndicators;
