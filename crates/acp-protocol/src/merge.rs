//! Content merge rules.
//!
//! Folding a delta into a content slot is split into an initializer
//! ([`Content::from_delta`], absent slot) and a reducer ([`Content::merge`],
//! present slot). Both validate before they mutate, so a rejected delta leaves
//! the accumulated value exactly as it was.
//!
//! | delta | absent slot | present slot |
//! |---|---|---|
//! | `text`, `thinking` | store | append |
//! | `tool_call`, `mcp_call` | store call | rejected |
//! | `tool_args`, `mcp_args` | rejected | append args |
//! | `tool_result`, `mcp_result` | rejected | append text, sticky error |
//! | `file`, `artifact`, `custom` | store | rejected |
//! | `data` | decode and store | decode and append |
//! | `variable` | store | key-wise overwrite |
//! | `interaction` | store | push message |
//! | `command_execution` | store | rejected |
//! | `command_execution_result` | rejected | append text, sticky error |
//! | `code_execution` | store | append code |
//! | `code_execution_result` | rejected | append text, sticky error |
//! | `web_search` | store | rejected |
//! | `web_search_result` | rejected | store once |

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::content::{
    CodeExecutionContent, CommandContent, Content, CustomContent, DataContent, FileContent,
    InteractionContent, McpContent, TextContent, ToolCallContent, VariableContent,
    WebSearchContent,
};
use crate::delta::DeltaContent;
use crate::error::{ProtocolError, ProtocolResult};

/// Fold `delta` into `slot`, initializing it when empty.
pub fn fold(slot: &mut Option<Content>, delta: &DeltaContent) -> ProtocolResult<()> {
    match slot {
        Some(content) => content.merge(delta),
        None => {
            *slot = Some(Content::from_delta(delta)?);
            Ok(())
        }
    }
}

impl Content {
    /// Build the first accumulated value from a delta.
    pub fn from_delta(delta: &DeltaContent) -> ProtocolResult<Self> {
        let content = match delta {
            DeltaContent::Text { delta } => Self::Text(TextContent {
                text: delta.clone(),
            }),
            DeltaContent::Thinking { delta } => Self::Thinking(TextContent {
                text: delta.clone(),
            }),
            DeltaContent::ToolCall { tool_name } => Self::ToolCall(ToolCallContent {
                tool_name: tool_name.clone(),
                ..Default::default()
            }),
            DeltaContent::McpCall {
                mcp_name,
                tool_name,
            } => Self::McpCall(McpContent {
                mcp_name: mcp_name.clone(),
                tool_name: tool_name.clone(),
                ..Default::default()
            }),
            DeltaContent::File { mime_type, file_id } => Self::File(FileContent {
                mime_type: mime_type.clone(),
                file_id: file_id.clone(),
            }),
            DeltaContent::Artifact { mime_type, file_id } => Self::Artifact(FileContent {
                mime_type: mime_type.clone(),
                file_id: file_id.clone(),
            }),
            DeltaContent::Data { mime_type, delta } => {
                Self::Data(DataContent::new(mime_type.clone(), decode_fragment(delta)?))
            }
            DeltaContent::Variable { variables } => Self::Variable(VariableContent {
                variables: variables.clone(),
            }),
            DeltaContent::Interaction {
                interaction_id,
                a2ui_version,
                a2ui_message,
            } => {
                let mut interaction = InteractionContent::default();
                interaction.push(interaction_id, a2ui_version, a2ui_message);
                Self::Interaction(interaction)
            }
            DeltaContent::Custom { raw } => Self::Custom(CustomContent { raw: raw.clone() }),
            DeltaContent::CommandExecution { command } => Self::CommandExecution(CommandContent {
                command: command.clone(),
                ..Default::default()
            }),
            DeltaContent::CodeExecution { lang, delta } => {
                Self::CodeExecution(CodeExecutionContent {
                    lang: lang.clone(),
                    code: delta.clone(),
                    ..Default::default()
                })
            }
            DeltaContent::WebSearch { query } => Self::WebSearch(WebSearchContent {
                query: query.clone(),
                ..Default::default()
            }),
            DeltaContent::ToolArgs { .. }
            | DeltaContent::ToolResult { .. }
            | DeltaContent::McpArgs { .. }
            | DeltaContent::McpResult { .. }
            | DeltaContent::CommandExecutionResult { .. }
            | DeltaContent::CodeExecutionResult { .. }
            | DeltaContent::WebSearchResult { .. } => {
                return Err(ProtocolError::content(format!(
                    "{} delta arrived before its call",
                    delta.tag()
                )));
            }
        };
        Ok(content)
    }

    /// Merge a delta into an already initialized value.
    pub fn merge(&mut self, delta: &DeltaContent) -> ProtocolResult<()> {
        match (self, delta) {
            (Self::Text(text), DeltaContent::Text { delta })
            | (Self::Thinking(text), DeltaContent::Thinking { delta }) => {
                text.text.push_str(delta);
            }

            (Self::ToolCall(call), DeltaContent::ToolArgs { delta }) => {
                call.tool_args.push_str(delta);
            }
            (Self::ToolCall(call), DeltaContent::ToolResult { delta, error }) => {
                append_outcome(&mut call.tool_result, &mut call.error, delta, error);
            }

            (Self::McpCall(call), DeltaContent::McpArgs { delta }) => {
                call.tool_args.push_str(delta);
            }
            (Self::McpCall(call), DeltaContent::McpResult { delta, error }) => {
                append_outcome(&mut call.tool_result, &mut call.error, delta, error);
            }

            (Self::Data(data), DeltaContent::Data { mime_type, delta }) => {
                let fragment = decode_fragment(delta)?;
                data.sync_buffer()?;
                if data.mime_type.is_empty() {
                    data.mime_type = mime_type.clone();
                }
                data.buffer.extend_from_slice(&fragment);
                data.data = STANDARD.encode(&data.buffer);
            }

            (Self::Variable(vars), DeltaContent::Variable { variables }) => {
                for (key, value) in variables {
                    vars.variables.insert(key.clone(), value.clone());
                }
            }

            (
                Self::Interaction(interaction),
                DeltaContent::Interaction {
                    interaction_id,
                    a2ui_version,
                    a2ui_message,
                },
            ) => {
                interaction.push(interaction_id, a2ui_version, a2ui_message);
            }

            (
                Self::CommandExecution(command),
                DeltaContent::CommandExecutionResult {
                    delta,
                    exit_code,
                    error,
                },
            ) => {
                append_outcome(&mut command.result, &mut command.error, delta, error);
                if exit_code.is_some() {
                    command.exit_code = *exit_code;
                }
            }

            (Self::CodeExecution(code), DeltaContent::CodeExecution { lang, delta }) => {
                if code.lang.is_empty() {
                    code.lang = lang.clone();
                }
                code.code.push_str(delta);
            }
            (Self::CodeExecution(code), DeltaContent::CodeExecutionResult { delta, error }) => {
                append_outcome(&mut code.result, &mut code.error, delta, error);
            }

            (
                Self::WebSearch(search),
                DeltaContent::WebSearchResult {
                    answer,
                    results,
                    error,
                },
            ) => {
                if search.is_resolved() {
                    return Err(ProtocolError::content(
                        "web_search already received its result",
                    ));
                }
                search.answer = answer.clone();
                search.results = results.clone();
                search.error = error.clone();
                search.resolved = true;
            }

            (content, delta) => {
                let kind = content.kind();
                return Err(if single_shot_repeat(kind.as_str(), delta.tag()) {
                    ProtocolError::content(format!("{kind} content accepts a single delta"))
                } else {
                    ProtocolError::content(format!(
                        "{} delta cannot merge into {kind} content",
                        delta.tag()
                    ))
                });
            }
        }
        Ok(())
    }
}

impl InteractionContent {
    /// Append one message; id and version stick to the first non-empty value.
    fn push(&mut self, interaction_id: &str, a2ui_version: &str, message: &serde_json::Value) {
        if self.interaction_id.is_empty() {
            self.interaction_id = interaction_id.to_string();
        }
        if self.a2ui_version.is_empty() {
            self.a2ui_version = a2ui_version.to_string();
        }
        if !message.is_null() {
            self.a2ui_messages.push(message.clone());
        }
    }
}

/// Append result text unless an error already ended the outcome.
fn append_outcome(
    result: &mut String,
    current_error: &mut Option<String>,
    delta: &str,
    error: &Option<String>,
) {
    if current_error.is_some() {
        return;
    }
    match error {
        Some(error) => *current_error = Some(error.clone()),
        None => result.push_str(delta),
    }
}

fn decode_fragment(fragment: &str) -> ProtocolResult<Vec<u8>> {
    STANDARD
        .decode(fragment)
        .map_err(|e| ProtocolError::content(format!("invalid base64 data fragment: {e}")))
}

fn single_shot_repeat(content_tag: &str, delta_tag: &str) -> bool {
    content_tag == delta_tag
        && matches!(
            content_tag,
            "tool_call"
                | "mcp_call"
                | "file"
                | "artifact"
                | "custom"
                | "command_execution"
                | "web_search"
        )
}
