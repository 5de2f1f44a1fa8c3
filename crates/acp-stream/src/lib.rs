//! Streaming runtime for the agent communication protocol.
//!
//! - [`Sequencer`]: producer side, allocates ids and indices and emits events
//! - [`Aggregator`]: consumer side, folds events into an [`acp_protocol::Message`]
//! - [`transport`]: delivery of single events (SSE frames, tokio channel)
//!
//! ```text
//! Sequencer --Event--> Transport --frames--> SseDecoder --Event--> Aggregator --> Message
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod logging;
pub mod sequencer;
pub mod transport;

pub use aggregator::{Aggregator, drive};
pub use config::{AggregatorConfig, LoggingConfig, SequencerConfig, StreamConfig};
pub use error::{ConfigError, StreamError, StreamResult, TransportError};
pub use sequencer::{BlockOptions, IdGenerator, Sequencer, UuidGenerator};
pub use transport::{ChannelTransport, SseDecoder, SseFrame, SseTransport, Transport};
