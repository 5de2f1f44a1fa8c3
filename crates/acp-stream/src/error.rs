//! Stream-level error types.
//!
//! Keeps delivery failures apart from invalid event streams: a
//! [`StreamError::Transport`] means the document is intact but the event did
//! not reach its destination.

use acp_protocol::ProtocolError;
use thiserror::Error;

/// Result type for aggregator and sequencer operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Failure to deliver an event.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport closed")]
    Closed,
}

/// Error returned by [`crate::Aggregator`] and [`crate::Sequencer`].
#[derive(Debug, Error)]
pub enum StreamError {
    /// The event stream itself is invalid.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The event was applied but could not be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl StreamError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            Self::Transport(_) => None,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_and_transport_are_distinct() {
        let protocol: StreamError = ProtocolError::StreamDone.into();
        assert!(!protocol.is_transport());
        assert_eq!(protocol.as_protocol(), Some(&ProtocolError::StreamDone));

        let transport: StreamError = TransportError::Closed.into();
        assert!(transport.is_transport());
        assert!(transport.as_protocol().is_none());
        assert_eq!(transport.to_string(), "transport closed");
    }
}
