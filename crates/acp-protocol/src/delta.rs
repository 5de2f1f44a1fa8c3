//! Delta content carried by `content_delta` events.
//!
//! Deltas are transient: they are folded into a [`crate::Content`] by the
//! aggregator and never stored themselves. Field names follow the persisted
//! family except that incremental text always travels as `delta`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::WebSearchResult;
use crate::error::{ProtocolError, ProtocolResult};

/// All delta kinds, tagged by `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaContent {
    /// Answer text fragment.
    Text { delta: String },

    /// Reasoning trace fragment.
    Thinking { delta: String },

    /// Opens a tool invocation.
    ToolCall { tool_name: String },

    /// Tool argument fragment (usually partial JSON).
    ToolArgs { delta: String },

    /// Tool output fragment, or the failure that ends it.
    ToolResult {
        #[serde(default)]
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Opens an invocation on an external tool server.
    McpCall { mcp_name: String, tool_name: String },

    /// External tool argument fragment.
    McpArgs { delta: String },

    /// External tool output fragment, or the failure that ends it.
    McpResult {
        #[serde(default)]
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Reference to a stored file.
    File { mime_type: String, file_id: String },

    /// Base64 fragment of an inline binary payload.
    Data {
        #[serde(default)]
        mime_type: String,
        delta: String,
    },

    /// Reference to a produced artifact.
    Artifact { mime_type: String, file_id: String },

    /// Structured variables; keys overwrite earlier values.
    Variable { variables: Map<String, Value> },

    /// One UI interaction message.
    Interaction {
        #[serde(default)]
        interaction_id: String,
        #[serde(default)]
        a2ui_version: String,
        #[serde(default)]
        a2ui_message: Value,
    },

    /// Opaque payload delivered in one piece.
    Custom { raw: String },

    /// Shell command about to run. Travels as `delta` like other fragments.
    CommandExecution {
        #[serde(rename = "delta", alias = "command")]
        command: String,
    },

    /// Shell output fragment.
    CommandExecutionResult {
        #[serde(default)]
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Code fragment to execute.
    CodeExecution {
        #[serde(default)]
        lang: String,
        delta: String,
    },

    /// Code execution output fragment.
    CodeExecutionResult {
        #[serde(default)]
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Search request.
    WebSearch { query: String },

    /// Terminal search outcome.
    WebSearchResult {
        #[serde(default)]
        answer: String,
        #[serde(default)]
        results: Vec<WebSearchResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl DeltaContent {
    /// Every `type` tag a delta may carry.
    pub const TAGS: &'static [&'static str] = &[
        "text",
        "thinking",
        "tool_call",
        "tool_args",
        "tool_result",
        "mcp_call",
        "mcp_args",
        "mcp_result",
        "file",
        "data",
        "artifact",
        "variable",
        "interaction",
        "custom",
        "command_execution",
        "command_execution_result",
        "code_execution",
        "code_execution_result",
        "web_search",
        "web_search_result",
    ];

    /// The `type` tag of this delta.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolArgs { .. } => "tool_args",
            Self::ToolResult { .. } => "tool_result",
            Self::McpCall { .. } => "mcp_call",
            Self::McpArgs { .. } => "mcp_args",
            Self::McpResult { .. } => "mcp_result",
            Self::File { .. } => "file",
            Self::Data { .. } => "data",
            Self::Artifact { .. } => "artifact",
            Self::Variable { .. } => "variable",
            Self::Interaction { .. } => "interaction",
            Self::Custom { .. } => "custom",
            Self::CommandExecution { .. } => "command_execution",
            Self::CommandExecutionResult { .. } => "command_execution_result",
            Self::CodeExecution { .. } => "code_execution",
            Self::CodeExecutionResult { .. } => "code_execution_result",
            Self::WebSearch { .. } => "web_search",
            Self::WebSearchResult { .. } => "web_search_result",
        }
    }

    /// Decode a delta, dispatching on its `type` tag first.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::content("delta content is missing a type tag"))?;
        if !Self::TAGS.contains(&tag) {
            return Err(ProtocolError::UnsupportedContentType(tag.to_string()));
        }
        let tag = tag.to_string();
        serde_json::from_value(value)
            .map_err(|e| ProtocolError::content(format!("malformed {tag} delta: {e}")))
    }

    // -- Constructors --

    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text {
            delta: delta.into(),
        }
    }

    pub fn thinking(delta: impl Into<String>) -> Self {
        Self::Thinking {
            delta: delta.into(),
        }
    }

    pub fn tool_call(tool_name: impl Into<String>) -> Self {
        Self::ToolCall {
            tool_name: tool_name.into(),
        }
    }

    pub fn tool_args(delta: impl Into<String>) -> Self {
        Self::ToolArgs {
            delta: delta.into(),
        }
    }

    pub fn tool_result(delta: impl Into<String>) -> Self {
        Self::ToolResult {
            delta: delta.into(),
            error: None,
        }
    }

    pub fn tool_error(error: impl Into<String>) -> Self {
        Self::ToolResult {
            delta: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn mcp_call(mcp_name: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::McpCall {
            mcp_name: mcp_name.into(),
            tool_name: tool_name.into(),
        }
    }

    pub fn mcp_args(delta: impl Into<String>) -> Self {
        Self::McpArgs {
            delta: delta.into(),
        }
    }

    pub fn mcp_result(delta: impl Into<String>) -> Self {
        Self::McpResult {
            delta: delta.into(),
            error: None,
        }
    }

    pub fn mcp_error(error: impl Into<String>) -> Self {
        Self::McpResult {
            delta: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn file(mime_type: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self::File {
            mime_type: mime_type.into(),
            file_id: file_id.into(),
        }
    }

    /// Encode `bytes` as one base64 data fragment.
    pub fn data(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Data {
            mime_type: mime_type.into(),
            delta: STANDARD.encode(bytes),
        }
    }

    pub fn artifact(mime_type: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self::Artifact {
            mime_type: mime_type.into(),
            file_id: file_id.into(),
        }
    }

    pub fn variable(variables: Map<String, Value>) -> Self {
        Self::Variable { variables }
    }

    pub fn interaction(
        interaction_id: impl Into<String>,
        a2ui_version: impl Into<String>,
        a2ui_message: Value,
    ) -> Self {
        Self::Interaction {
            interaction_id: interaction_id.into(),
            a2ui_version: a2ui_version.into(),
            a2ui_message,
        }
    }

    pub fn custom(raw: impl Into<String>) -> Self {
        Self::Custom { raw: raw.into() }
    }

    pub fn command(command: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
        }
    }

    pub fn command_result(delta: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::CommandExecutionResult {
            delta: delta.into(),
            exit_code,
            error: None,
        }
    }

    pub fn code(lang: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::CodeExecution {
            lang: lang.into(),
            delta: delta.into(),
        }
    }

    pub fn code_result(delta: impl Into<String>) -> Self {
        Self::CodeExecutionResult {
            delta: delta.into(),
            error: None,
        }
    }

    pub fn web_search(query: impl Into<String>) -> Self {
        Self::WebSearch {
            query: query.into(),
        }
    }

    pub fn web_search_result(answer: impl Into<String>, results: Vec<WebSearchResult>) -> Self {
        Self::WebSearchResult {
            answer: answer.into(),
            results,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_delta_wire_shape() {
        let json = serde_json::to_value(DeltaContent::text("hel")).unwrap();
        assert_eq!(json, json!({"type": "text", "delta": "hel"}));
    }

    #[test]
    fn test_tool_result_omits_absent_error() {
        let json = serde_json::to_string(&DeltaContent::tool_result("ok")).unwrap();
        assert!(json.contains("\"type\":\"tool_result\""));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_data_delta_is_base64() {
        let delta = DeltaContent::data("image/png", b"\x89PNG");
        let DeltaContent::Data { delta, mime_type } = delta else {
            panic!("Expected Data delta");
        };
        assert_eq!(mime_type, "image/png");
        assert_eq!(STANDARD.decode(delta).unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_command_delta_uses_delta_field() {
        let json = serde_json::to_value(DeltaContent::command("ls -la")).unwrap();
        assert_eq!(json, json!({"type": "command_execution", "delta": "ls -la"}));

        let decoded =
            DeltaContent::from_value(json!({"type": "command_execution", "delta": "ls -la"}))
                .unwrap();
        assert_eq!(decoded, DeltaContent::command("ls -la"));

        let legacy =
            DeltaContent::from_value(json!({"type": "command_execution", "command": "pwd"}))
                .unwrap();
        assert_eq!(legacy, DeltaContent::command("pwd"));
    }

    #[test]
    fn test_from_value_unknown_tag() {
        let err = DeltaContent::from_value(json!({"type": "hologram", "delta": "x"})).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnsupportedContentType("hologram".to_string())
        );
    }

    #[test]
    fn test_from_value_malformed_known_tag() {
        let err = DeltaContent::from_value(json!({"type": "tool_call"})).unwrap_err();
        assert!(err.is_content_structure());
    }

    #[test]
    fn test_every_tag_is_listed() {
        let samples = [
            DeltaContent::text(""),
            DeltaContent::thinking(""),
            DeltaContent::tool_call("t"),
            DeltaContent::tool_args(""),
            DeltaContent::tool_result(""),
            DeltaContent::mcp_call("m", "t"),
            DeltaContent::mcp_args(""),
            DeltaContent::mcp_result(""),
            DeltaContent::file("text/plain", "f"),
            DeltaContent::data("text/plain", b""),
            DeltaContent::artifact("text/plain", "a"),
            DeltaContent::variable(Map::new()),
            DeltaContent::interaction("i", "0.8", Value::Null),
            DeltaContent::custom(""),
            DeltaContent::command("ls"),
            DeltaContent::command_result("", None),
            DeltaContent::code("python", ""),
            DeltaContent::code_result(""),
            DeltaContent::web_search("q"),
            DeltaContent::web_search_result("", vec![]),
        ];
        assert_eq!(samples.len(), DeltaContent::TAGS.len());
        for sample in samples {
            let value = serde_json::to_value(&sample).unwrap();
            assert_eq!(value["type"], sample.tag());
            assert!(DeltaContent::TAGS.contains(&sample.tag()));
        }
    }
}
