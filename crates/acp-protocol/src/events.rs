//! Wire events.
//!
//! Events are ephemeral: a run is streamed as a flat sequence of them and the
//! consumer folds the sequence into a [`crate::Message`]. Every event is a JSON
//! object carrying `type`, `timestamp` and the fields of its kind.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::delta::DeltaContent;
use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::Usage;

// ============================================================================
// Event type
// ============================================================================

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    RunStarted,
    RunFinished,
    RunInterrupt,
    RunError,
    BlockStart,
    BlockEnd,
    ContentStart,
    ContentDelta,
    ContentEnd,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        Self::RunStarted,
        Self::RunFinished,
        Self::RunInterrupt,
        Self::RunError,
        Self::BlockStart,
        Self::BlockEnd,
        Self::ContentStart,
        Self::ContentDelta,
        Self::ContentEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RunStarted => "run_started",
            Self::RunFinished => "run_finished",
            Self::RunInterrupt => "run_interrupt",
            Self::RunError => "run_error",
            Self::BlockStart => "block_start",
            Self::BlockEnd => "block_end",
            Self::ContentStart => "content_start",
            Self::ContentDelta => "content_delta",
            Self::ContentEnd => "content_end",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    /// Run lifecycle kinds.
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::RunStarted | Self::RunFinished | Self::RunInterrupt | Self::RunError
        )
    }

    fn structure_error(self, message: String) -> ProtocolError {
        match self {
            Self::RunStarted | Self::RunFinished | Self::RunInterrupt | Self::RunError => {
                ProtocolError::RunStructure(message)
            }
            Self::BlockStart | Self::BlockEnd => ProtocolError::BlockStructure(message),
            Self::ContentStart | Self::ContentDelta | Self::ContentEnd => {
                ProtocolError::ContentStructure(message)
            }
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event envelope
// ============================================================================

/// A wire event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Unix ms, assigned when the event is built.
    pub timestamp: i64,

    /// The event payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

// ============================================================================
// Event payloads
// ============================================================================

/// All event payloads, tagged by `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- Run lifecycle --
    /// A run began.
    RunStarted {
        run_id: String,
        #[serde(default)]
        parent_run_id: String,
    },

    /// The run completed normally.
    RunFinished { run_id: String },

    /// The run was stopped before completing.
    RunInterrupt { run_id: String },

    /// The run failed.
    RunError { run_id: String, error: String },

    // -- Blocks --
    /// A block opened.
    BlockStart {
        block_id: String,
        #[serde(default)]
        parent_block_id: String,
        #[serde(default)]
        is_parallel: bool,
        #[serde(default)]
        is_subagent: bool,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        metadata: Map<String, Value>,
    },

    /// A block closed, optionally reporting token usage.
    BlockEnd {
        block_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    // -- Content --
    /// A content item opened inside a block.
    ContentStart {
        content_id: String,
        related_block_id: String,
        #[serde(default)]
        parent_content_id: String,
        #[serde(default)]
        index: u64,
    },

    /// One fragment of a content item.
    ContentDelta {
        content_id: String,
        #[serde(default)]
        index: u64,
        content: DeltaContent,
    },

    /// A content item closed.
    ContentEnd { content_id: String },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::RunStarted { .. } => EventType::RunStarted,
            Self::RunFinished { .. } => EventType::RunFinished,
            Self::RunInterrupt { .. } => EventType::RunInterrupt,
            Self::RunError { .. } => EventType::RunError,
            Self::BlockStart { .. } => EventType::BlockStart,
            Self::BlockEnd { .. } => EventType::BlockEnd,
            Self::ContentStart { .. } => EventType::ContentStart,
            Self::ContentDelta { .. } => EventType::ContentDelta,
            Self::ContentEnd { .. } => EventType::ContentEnd,
        }
    }
}

impl Event {
    /// Wrap a payload, stamping it with the current time.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// The run, block or content id this event is about.
    pub fn subject_id(&self) -> &str {
        match &self.payload {
            EventPayload::RunStarted { run_id, .. }
            | EventPayload::RunFinished { run_id }
            | EventPayload::RunInterrupt { run_id }
            | EventPayload::RunError { run_id, .. } => run_id,
            EventPayload::BlockStart { block_id, .. } | EventPayload::BlockEnd { block_id, .. } => {
                block_id
            }
            EventPayload::ContentStart { content_id, .. }
            | EventPayload::ContentDelta { content_id, .. }
            | EventPayload::ContentEnd { content_id } => content_id,
        }
    }

    /// Frame identifier used by streaming transports: `<type>_<timestamp>`.
    pub fn sse_id(&self) -> String {
        format!("{}_{}", self.event_type(), self.timestamp)
    }

    // -- Constructors --

    pub fn run_started(run_id: impl Into<String>, parent_run_id: impl Into<String>) -> Self {
        Self::new(EventPayload::RunStarted {
            run_id: run_id.into(),
            parent_run_id: parent_run_id.into(),
        })
    }

    pub fn run_finished(run_id: impl Into<String>) -> Self {
        Self::new(EventPayload::RunFinished {
            run_id: run_id.into(),
        })
    }

    pub fn run_interrupt(run_id: impl Into<String>) -> Self {
        Self::new(EventPayload::RunInterrupt {
            run_id: run_id.into(),
        })
    }

    pub fn run_error(run_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(EventPayload::RunError {
            run_id: run_id.into(),
            error: error.into(),
        })
    }

    /// A plain block: not parallel, not a sub-agent, no metadata.
    pub fn block_start(block_id: impl Into<String>, parent_block_id: impl Into<String>) -> Self {
        Self::new(EventPayload::BlockStart {
            block_id: block_id.into(),
            parent_block_id: parent_block_id.into(),
            is_parallel: false,
            is_subagent: false,
            metadata: Map::new(),
        })
    }

    pub fn block_end(block_id: impl Into<String>, usage: Option<Usage>) -> Self {
        Self::new(EventPayload::BlockEnd {
            block_id: block_id.into(),
            usage,
        })
    }

    pub fn content_start(
        content_id: impl Into<String>,
        related_block_id: impl Into<String>,
        parent_content_id: impl Into<String>,
        index: u64,
    ) -> Self {
        Self::new(EventPayload::ContentStart {
            content_id: content_id.into(),
            related_block_id: related_block_id.into(),
            parent_content_id: parent_content_id.into(),
            index,
        })
    }

    pub fn content_delta(content_id: impl Into<String>, index: u64, content: DeltaContent) -> Self {
        Self::new(EventPayload::ContentDelta {
            content_id: content_id.into(),
            index,
            content,
        })
    }

    pub fn content_end(content_id: impl Into<String>) -> Self {
        Self::new(EventPayload::ContentEnd {
            content_id: content_id.into(),
        })
    }

    // -- Decoding --

    /// Decode an event, dispatching on its `type` tag before reading fields.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::UnsupportedEventType(String::new()))?;
        let event_type = EventType::parse(tag)
            .ok_or_else(|| ProtocolError::UnsupportedEventType(tag.to_string()))?;

        let timestamp = match value.get("timestamp") {
            None | Some(Value::Null) => 0,
            Some(ts) => ts.as_i64().ok_or_else(|| {
                event_type.structure_error(format!("{event_type} has a non-integer timestamp"))
            })?,
        };

        // Nested tag first so an unknown content kind is reported as such.
        if event_type == EventType::ContentDelta {
            let content = value.get("content").cloned().ok_or_else(|| {
                ProtocolError::content("content_delta is missing its content")
            })?;
            DeltaContent::from_value(content)?;
        }

        let payload: EventPayload = serde_json::from_value(value)
            .map_err(|e| event_type.structure_error(format!("malformed {event_type}: {e}")))?;
        Ok(Self { timestamp, payload })
    }

    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ProtocolError::UnsupportedEventType(format!("invalid json: {e}")))?;
        Self::from_value(value)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
