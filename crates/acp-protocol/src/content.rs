//! Persisted content types.
//!
//! A [`Content`] is the accumulated result of folding zero or more
//! [`crate::DeltaContent`] values. It is what a [`crate::Block`] stores and
//! what a persisted document carries on the wire, tagged by `type`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, ProtocolResult};

// ============================================================================
// Content kinds
// ============================================================================

/// Discriminant of a persisted content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Thinking,
    ToolCall,
    McpCall,
    File,
    Data,
    Artifact,
    Variable,
    Interaction,
    Custom,
    CommandExecution,
    CodeExecution,
    WebSearch,
}

impl ContentKind {
    /// Canonical `type` tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Thinking => "thinking",
            Self::ToolCall => "tool_call",
            Self::McpCall => "mcp_call",
            Self::File => "file",
            Self::Data => "data",
            Self::Artifact => "artifact",
            Self::Variable => "variable",
            Self::Interaction => "interaction",
            Self::Custom => "custom",
            Self::CommandExecution => "command_execution",
            Self::CodeExecution => "code_execution",
            Self::WebSearch => "web_search",
        }
    }

    /// Parse a persisted `type` tag.
    ///
    /// Older documents store the tag of the last delta applied (for example
    /// `mcp_result` or `command_execution_result`); those map to their call kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "text" => Self::Text,
            "thinking" => Self::Thinking,
            "tool_call" => Self::ToolCall,
            "mcp_call" | "mcp_args" | "mcp_result" => Self::McpCall,
            "file" => Self::File,
            "data" => Self::Data,
            "artifact" => Self::Artifact,
            "variable" => Self::Variable,
            "interaction" => Self::Interaction,
            "custom" => Self::Custom,
            "command_execution" | "command_execution_result" => Self::CommandExecution,
            "code_execution" | "code_execution_result" => Self::CodeExecution,
            "web_search" | "web_search_result" => Self::WebSearch,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Content
// ============================================================================

/// A persisted content item, tagged by `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text(TextContent),
    Thinking(TextContent),
    ToolCall(ToolCallContent),
    McpCall(McpContent),
    File(FileContent),
    Data(DataContent),
    Artifact(FileContent),
    Variable(VariableContent),
    Interaction(InteractionContent),
    Custom(CustomContent),
    CommandExecution(CommandContent),
    CodeExecution(CodeExecutionContent),
    WebSearch(WebSearchContent),
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text(_) => ContentKind::Text,
            Self::Thinking(_) => ContentKind::Thinking,
            Self::ToolCall(_) => ContentKind::ToolCall,
            Self::McpCall(_) => ContentKind::McpCall,
            Self::File(_) => ContentKind::File,
            Self::Data(_) => ContentKind::Data,
            Self::Artifact(_) => ContentKind::Artifact,
            Self::Variable(_) => ContentKind::Variable,
            Self::Interaction(_) => ContentKind::Interaction,
            Self::Custom(_) => ContentKind::Custom,
            Self::CommandExecution(_) => ContentKind::CommandExecution,
            Self::CodeExecution(_) => ContentKind::CodeExecution,
            Self::WebSearch(_) => ContentKind::WebSearch,
        }
    }

    /// Decode a content item, dispatching on its `type` tag first.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::content("content is missing a type tag"))?;
        let kind = ContentKind::from_tag(tag)
            .ok_or_else(|| ProtocolError::UnsupportedContentType(tag.to_string()))?;

        let malformed = |e: serde_json::Error| {
            ProtocolError::content(format!("malformed {kind} content: {e}"))
        };
        let content = match kind {
            ContentKind::Text => Self::Text(serde_json::from_value(value).map_err(malformed)?),
            ContentKind::Thinking => {
                Self::Thinking(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::ToolCall => {
                Self::ToolCall(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::McpCall => Self::McpCall(serde_json::from_value(value).map_err(malformed)?),
            ContentKind::File => Self::File(serde_json::from_value(value).map_err(malformed)?),
            ContentKind::Data => Self::Data(serde_json::from_value(value).map_err(malformed)?),
            ContentKind::Artifact => {
                Self::Artifact(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::Variable => {
                Self::Variable(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::Interaction => {
                Self::Interaction(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::Custom => Self::Custom(serde_json::from_value(value).map_err(malformed)?),
            ContentKind::CommandExecution => {
                Self::CommandExecution(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::CodeExecution => {
                Self::CodeExecution(serde_json::from_value(value).map_err(malformed)?)
            }
            ContentKind::WebSearch => {
                Self::WebSearch(serde_json::from_value(value).map_err(malformed)?)
            }
        };
        Ok(content)
    }

    /// Decode a content item from JSON text.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ProtocolError::content(format!("invalid content JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn as_text(&self) -> Option<&TextContent> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileContent> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableContent> {
        match self {
            Self::Variable(variables) => Some(variables),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Variant payloads
// ============================================================================

/// Text or reasoning trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

/// A tool invocation with its streamed arguments and outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallContent {
    pub tool_name: String,
    #[serde(default)]
    pub tool_args: String,
    #[serde(default)]
    pub tool_result: String,
    /// Sticky: once set, further result text is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An invocation on an external tool server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpContent {
    /// Server identity, fixed at call time.
    pub mcp_name: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_args: String,
    #[serde(default)]
    pub tool_result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A file or artifact reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub mime_type: String,
    pub file_id: String,
}

/// Inline binary payload.
///
/// `data` is the base64 encoding of every fragment received so far. The
/// decoded bytes are kept alongside so appending does not re-decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataContent {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
    #[serde(skip)]
    pub(crate) buffer: Vec<u8>,
}

impl PartialEq for DataContent {
    fn eq(&self, other: &Self) -> bool {
        self.mime_type == other.mime_type && self.data == other.data
    }
}

impl DataContent {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(&bytes),
            buffer: bytes,
        }
    }

    /// Decoded payload. Reads `data` whenever it was replaced after the last merge.
    pub fn bytes(&self) -> ProtocolResult<Vec<u8>> {
        if self.buffer_is_current() {
            return Ok(self.buffer.clone());
        }
        STANDARD
            .decode(&self.data)
            .map_err(|e| ProtocolError::content(format!("invalid base64 data: {e}")))
    }

    fn buffer_is_current(&self) -> bool {
        STANDARD.encode(&self.buffer) == self.data
    }

    /// Rebuild the cached bytes from `data` if they no longer agree.
    pub(crate) fn sync_buffer(&mut self) -> ProtocolResult<()> {
        if !self.buffer_is_current() {
            self.buffer = self.bytes()?;
        }
        Ok(())
    }
}

/// Structured key/value output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableContent {
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// A multi-turn UI interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContent {
    #[serde(default)]
    pub interaction_id: String,
    #[serde(default)]
    pub a2ui_version: String,
    #[serde(default)]
    pub a2ui_messages: Vec<Value>,
}

/// Opaque application payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomContent {
    pub raw: String,
}

/// A shell command and its output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandContent {
    pub command: String,
    #[serde(default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Code sent to an interpreter and its output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeExecutionContent {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A web search and its single terminal outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebSearchContent {
    pub query: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub results: Vec<WebSearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub(crate) resolved: bool,
}

impl PartialEq for WebSearchContent {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query
            && self.answer == other.answer
            && self.results == other.results
            && self.error == other.error
    }
}

impl WebSearchContent {
    /// Whether the terminal outcome has been received.
    pub fn is_resolved(&self) -> bool {
        self.resolved
            || self.error.is_some()
            || !self.answer.is_empty()
            || !self.results.is_empty()
    }
}

/// One hit of a web search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}
