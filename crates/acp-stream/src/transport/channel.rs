//! In-process transport over a tokio channel.

use acp_protocol::Event;
use tokio::sync::mpsc;

use super::Transport;
use crate::error::TransportError;

/// Forwards every event into an unbounded channel.
///
/// Pairs with [`crate::drive`] to run an aggregator as a single consumer.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    /// Create a transport together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, event: &Event) -> Result<(), TransportError> {
        self.tx
            .send(event.clone())
            .map_err(|_| TransportError::Closed)
    }
}
