//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding events or folding them into a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Malformed or illegally shaped run event.
    #[error("run structure error: {0}")]
    RunStructure(String),

    /// A lifecycle event arrived after the run reached its terminal state.
    #[error("run structure error: stream already done")]
    StreamDone,

    /// Malformed block event.
    #[error("block structure error: {0}")]
    BlockStructure(String),

    /// Malformed content event, kind mismatch on merge, or out-of-order delta.
    #[error("content structure error: {0}")]
    ContentStructure(String),

    /// The outer event tag is not one of the known kinds.
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),

    /// The content tag is not one of the known kinds.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

impl ProtocolError {
    pub(crate) fn content(message: impl Into<String>) -> Self {
        Self::ContentStructure(message.into())
    }

    /// Whether this error belongs to the run-structure family.
    pub fn is_run_structure(&self) -> bool {
        matches!(self, Self::RunStructure(_) | Self::StreamDone)
    }

    /// Whether this error belongs to the content-structure family.
    pub fn is_content_structure(&self) -> bool {
        matches!(self, Self::ContentStructure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_done_is_run_structure() {
        let err = ProtocolError::StreamDone;
        assert!(err.is_run_structure());
        assert!(err.to_string().contains("stream already done"));
    }

    #[test]
    fn test_display_includes_tag() {
        let err = ProtocolError::UnsupportedContentType("hologram".to_string());
        assert_eq!(err.to_string(), "unsupported content type: hologram");
    }
}
