//! Event transports.
//!
//! A transport delivers one event at a time and flushes it before returning;
//! events are never batched. Implementations:
//! - `SseTransport`: writes server-sent-event frames to any `io::Write`
//! - `ChannelTransport`: forwards events into a tokio channel

mod channel;
mod sse;

pub use channel::ChannelTransport;
pub use sse::{SseDecoder, SseFrame, SseTransport, encode_frame};

use acp_protocol::Event;

use crate::error::TransportError;

/// Delivers events to a consumer.
pub trait Transport: Send + Sync {
    /// Deliver and flush one event.
    fn send(&self, event: &Event) -> Result<(), TransportError>;
}
