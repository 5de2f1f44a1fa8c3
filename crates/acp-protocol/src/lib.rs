//! Canonical protocol types for agent-to-consumer streaming.
//!
//! This crate defines the wire events, the content families and the persisted
//! document shared by every ACP producer and consumer:
//!
//! ```text
//! Agent logic --> Sequencer --[events]--> Transport --[frames]--> Aggregator --> Message
//! ```
//!
//! ## Design Principles
//!
//! 1. **Events are ephemeral, messages are persistent.** A run is streamed as
//!    `run_*`, `block_*` and `content_*` events and folded into one [`Message`].
//! 2. **Deltas and content are separate families.** [`DeltaContent`] is what a
//!    `content_delta` carries; [`Content`] is what a block stores.
//! 3. **Merging is total over the tag pair.** Every (content, delta) pair either
//!    merges or fails with a content-structure error; nothing is silently coerced.
//! 4. **Tags are dispatched before fields.** Unknown `type` tags surface as
//!    unsupported-type errors rather than generic JSON failures.

pub mod content;
pub mod delta;
pub mod error;
pub mod events;
pub mod ids;
pub mod merge;
pub mod messages;

pub use content::{
    CodeExecutionContent, CommandContent, Content, ContentKind, CustomContent, DataContent,
    FileContent, InteractionContent, McpContent, TextContent, ToolCallContent, VariableContent,
    WebSearchContent, WebSearchResult,
};
pub use delta::DeltaContent;
pub use error::{ProtocolError, ProtocolResult};
pub use events::{Event, EventPayload, EventType};
pub use ids::{NONE_BLOCK_ID, NONE_CONTENT_ID, NONE_RUN_ID};
pub use merge::fold;
pub use messages::{Block, Message, Role, Usage};
