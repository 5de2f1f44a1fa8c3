//! Persisted document types.
//!
//! A [`Message`] is what a run leaves behind once its events are folded: an
//! ordered list of [`Block`]s, each holding the [`Content`] items that ended
//! inside it, in the order they ended.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::{Content, FileContent, TextContent, VariableContent};
use crate::error::{ProtocolError, ProtocolResult};
use crate::ids::NONE_RUN_ID;

/// Message role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage reported when a block ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write_tokens: Option<u64>,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A group of content inside a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    /// Completed content, in completion order.
    #[serde(default)]
    pub contents: Vec<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_parallel: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_subagent: bool,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_block_id: String,
}

impl Block {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// The document a run folds into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub role: Role,

    #[serde(default)]
    pub blocks: Vec<Block>,

    /// Unix ms.
    pub created_at: i64,

    /// Unix ms, bumped on every applied event.
    pub updated_at: i64,

    /// Terminal run error, if the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Role::default())
    }
}

impl Message {
    /// Empty document with the reserved run id.
    pub fn new(role: Role) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: NONE_RUN_ID.to_string(),
            role,
            blocks: Vec::new(),
            created_at: now,
            updated_at: now,
            errors: None,
        }
    }

    fn contents(&self) -> impl Iterator<Item = &Content> {
        self.blocks.iter().flat_map(|b| b.contents.iter())
    }

    /// The last text item and every file item, in document order.
    pub fn inputs(&self) -> (Option<&TextContent>, Vec<&FileContent>) {
        let mut text = None;
        let mut files = Vec::new();
        for content in self.contents() {
            match content {
                Content::Text(t) => text = Some(t),
                Content::File(f) => files.push(f),
                _ => {}
            }
        }
        (text, files)
    }

    /// The last text item and the last variable item.
    pub fn variables(&self) -> (Option<&TextContent>, Option<&VariableContent>) {
        let text = self.contents().filter_map(Content::as_text).last();
        let variables = self.contents().filter_map(Content::as_variable).last();
        (text, variables)
    }

    /// Decode a persisted document, reporting content tag problems precisely.
    pub fn from_value(value: Value) -> ProtocolResult<Self> {
        if let Some(blocks) = value.get("blocks").and_then(Value::as_array) {
            for block in blocks {
                let Some(contents) = block.get("contents").and_then(Value::as_array) else {
                    continue;
                };
                for content in contents {
                    Content::from_value(content.clone())?;
                }
            }
        }
        serde_json::from_value(value)
            .map_err(|e| ProtocolError::BlockStructure(format!("malformed message: {e}")))
    }

    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ProtocolError::BlockStructure(format!("invalid json: {e}")))?;
        Self::from_value(value)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
