//! Producer-side event generation.
//!
//! The [`Sequencer`] allocates run, block and content ids, assigns positional
//! indices to content items, and substitutes the reserved "none" ids for
//! empty parent references. It does not enforce protocol ordering; callers
//! emit events in the order they want them consumed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use acp_protocol::{
    DeltaContent, Event, EventPayload, NONE_BLOCK_ID, NONE_CONTENT_ID, NONE_RUN_ID, ProtocolError,
    Usage, ids,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::SequencerConfig;
use crate::error::{StreamError, StreamResult};
use crate::transport::Transport;

/// Source of run, block and content ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Options for [`Sequencer::block_start_with`].
#[derive(Debug, Clone, Default)]
pub struct BlockOptions {
    pub parent_block_id: String,
    pub is_parallel: bool,
    pub is_subagent: bool,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Default)]
struct Indices {
    next: u64,
    by_content: HashMap<String, u64>,
}

/// Emits well-formed events with allocated ids and indices.
pub struct Sequencer {
    indices: Mutex<Indices>,
    parent_run_id: String,
    id_gen: Box<dyn IdGenerator>,
    transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("indices", &self.indices)
            .field("parent_run_id", &self.parent_run_id)
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(&SequencerConfig::default())
    }
}

impl Sequencer {
    pub fn new(config: &SequencerConfig) -> Self {
        Self {
            indices: Mutex::new(Indices::default()),
            parent_run_id: ids::or_none(&config.parent_run_id, NONE_RUN_ID),
            id_gen: Box::new(UuidGenerator),
            transport: None,
        }
    }

    /// Send every emitted event to `transport`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_id_generator(mut self, id_gen: impl IdGenerator + 'static) -> Self {
        self.id_gen = Box::new(id_gen);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Indices> {
        self.indices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send while the caller still holds the index lock.
    fn emit(&self, _guard: &MutexGuard<'_, Indices>, payload: EventPayload) -> StreamResult<Event> {
        let event = Event::new(payload);
        if let Some(transport) = &self.transport {
            transport.send(&event).map_err(|e| {
                warn!(event = %event.event_type(), error = %e, "Failed to send event");
                StreamError::Transport(e)
            })?;
        }
        Ok(event)
    }

    // -- Run lifecycle --

    /// Start a new run under the configured parent run.
    pub fn run_started(&self) -> StreamResult<Event> {
        let guard = self.lock();
        let payload = EventPayload::RunStarted {
            run_id: self.id_gen.next_id(),
            parent_run_id: self.parent_run_id.clone(),
        };
        self.emit(&guard, payload)
    }

    pub fn run_finished(&self, run_id: &str) -> StreamResult<Event> {
        let guard = self.lock();
        let payload = EventPayload::RunFinished {
            run_id: run_id.to_string(),
        };
        self.emit(&guard, payload)
    }

    pub fn run_interrupted(&self, run_id: &str) -> StreamResult<Event> {
        let guard = self.lock();
        let payload = EventPayload::RunInterrupt {
            run_id: run_id.to_string(),
        };
        self.emit(&guard, payload)
    }

    pub fn run_error(&self, run_id: &str, error: &str) -> StreamResult<Event> {
        let guard = self.lock();
        let payload = EventPayload::RunError {
            run_id: run_id.to_string(),
            error: error.to_string(),
        };
        self.emit(&guard, payload)
    }

    // -- Blocks --

    /// Open a plain block. An empty parent means no parent.
    pub fn block_start(&self, parent_block_id: &str) -> StreamResult<Event> {
        self.block_start_with(BlockOptions {
            parent_block_id: parent_block_id.to_string(),
            ..Default::default()
        })
    }

    pub fn block_start_with(&self, options: BlockOptions) -> StreamResult<Event> {
        let guard = self.lock();
        let payload = EventPayload::BlockStart {
            block_id: self.id_gen.next_id(),
            parent_block_id: ids::or_none(&options.parent_block_id, NONE_BLOCK_ID),
            is_parallel: options.is_parallel,
            is_subagent: options.is_subagent,
            metadata: options.metadata,
        };
        self.emit(&guard, payload)
    }

    pub fn block_end(&self, block_id: &str, usage: Option<Usage>) -> StreamResult<Event> {
        let guard = self.lock();
        let payload = EventPayload::BlockEnd {
            block_id: block_id.to_string(),
            usage,
        };
        self.emit(&guard, payload)
    }

    // -- Content --

    /// Open a content item in `block_id` and allocate its index.
    pub fn content_start(&self, block_id: &str, parent_content_id: &str) -> StreamResult<Event> {
        let mut guard = self.lock();
        let content_id = self.id_gen.next_id();
        let index = guard.next;
        guard.next += 1;
        guard.by_content.insert(content_id.clone(), index);

        let payload = EventPayload::ContentStart {
            content_id,
            related_block_id: block_id.to_string(),
            parent_content_id: ids::or_none(parent_content_id, NONE_CONTENT_ID),
            index,
        };
        self.emit(&guard, payload)
    }

    /// Emit a delta for a content item opened by [`Sequencer::content_start`].
    pub fn content_delta(&self, content_id: &str, delta: DeltaContent) -> StreamResult<Event> {
        let guard = self.lock();
        let index = *guard.by_content.get(content_id).ok_or_else(|| {
            ProtocolError::ContentStructure(format!("no index recorded for content {content_id}"))
        })?;
        let payload = EventPayload::ContentDelta {
            content_id: content_id.to_string(),
            index,
            content: delta,
        };
        self.emit(&guard, payload)
    }

    pub fn content_end(&self, content_id: &str) -> StreamResult<Event> {
        let mut guard = self.lock();
        if guard.by_content.remove(content_id).is_none() {
            debug!(content_id = %content_id, "content_end for content without an index");
        }
        let payload = EventPayload::ContentEnd {
            content_id: content_id.to_string(),
        };
        self.emit(&guard, payload)
    }

    /// Index recorded for an open content item.
    pub fn index_of(&self, content_id: &str) -> Option<u64> {
        self.lock().by_content.get(content_id).copied()
    }

    /// Content items opened but not yet ended.
    pub fn open_contents(&self) -> usize {
        self.lock().by_content.len()
    }
}
