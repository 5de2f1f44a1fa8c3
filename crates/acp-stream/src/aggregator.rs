//! Folds an event stream into a [`Message`].
//!
//! The aggregator is the only writer of its document. Events must be applied
//! in the order they were produced; block lookups and the run lifecycle both
//! depend on it.
//!
//! ## Concurrency
//!
//! State sits behind one mutex, so concurrent `apply` calls are memory safe,
//! but the aggregator assumes **one logical writer**. Interleaving two
//! independent event streams into the same aggregator has no defined result.
//!
//! ## Lifecycle
//!
//! ```text
//! idle --run_started--> started --run_finished | run_interrupt | run_error--> finished
//! ```
//!
//! `run_started` while started is ignored. Any lifecycle event once finished
//! fails with [`ProtocolError::StreamDone`]. Block and content events are
//! accepted in every state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use acp_protocol::{Block, Content, Event, EventPayload, Message, ProtocolError, fold};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::AggregatorConfig;
use crate::error::{StreamError, StreamResult};
use crate::transport::Transport;

/// A content item between `content_start` and `content_end`.
#[derive(Debug)]
struct PendingContent {
    /// Absent until the first delta arrives.
    content: Option<Content>,
    block_id: String,
}

#[derive(Debug)]
struct State {
    started: bool,
    finished: bool,
    message: Message,
    pending: HashMap<String, PendingContent>,
}

impl State {
    fn apply(&mut self, event: &Event) -> Result<(), ProtocolError> {
        match &event.payload {
            EventPayload::RunStarted { run_id, .. } => {
                if self.finished {
                    return Err(ProtocolError::StreamDone);
                }
                if self.started {
                    debug!(run_id = %run_id, "Ignoring repeated run_started");
                    return Ok(());
                }
                self.started = true;
                if !run_id.is_empty() {
                    self.message.id = run_id.clone();
                }
            }

            EventPayload::RunFinished { .. } | EventPayload::RunInterrupt { .. } => {
                if self.finished {
                    return Err(ProtocolError::StreamDone);
                }
                self.finished = true;
            }

            EventPayload::RunError { error, .. } => {
                if self.finished {
                    return Err(ProtocolError::StreamDone);
                }
                self.finished = true;
                self.message.errors = Some(error.clone());
            }

            EventPayload::BlockStart {
                block_id,
                parent_block_id,
                is_parallel,
                is_subagent,
                metadata,
            } => {
                self.message.blocks.push(Block {
                    id: block_id.clone(),
                    contents: Vec::new(),
                    usage: None,
                    is_parallel: *is_parallel,
                    is_subagent: *is_subagent,
                    metadata: metadata.clone(),
                    parent_block_id: parent_block_id.clone(),
                });
            }

            EventPayload::BlockEnd { block_id, usage } => match self.find_block(block_id) {
                Some(block) => block.usage = usage.clone(),
                None => debug!(block_id = %block_id, "block_end for unknown block"),
            },

            EventPayload::ContentStart {
                content_id,
                related_block_id,
                ..
            } => {
                if self.find_block(related_block_id).is_none() {
                    debug!(
                        content_id = %content_id,
                        block_id = %related_block_id,
                        "content_start for unknown block, content untracked"
                    );
                    return Ok(());
                }
                self.pending.insert(
                    content_id.clone(),
                    PendingContent {
                        content: None,
                        block_id: related_block_id.clone(),
                    },
                );
            }

            EventPayload::ContentDelta {
                content_id,
                content: delta,
                ..
            } => match self.pending.get_mut(content_id) {
                Some(pending) => fold(&mut pending.content, delta)?,
                None => debug!(content_id = %content_id, "Dropping delta for untracked content"),
            },

            EventPayload::ContentEnd { content_id } => {
                let Some(pending) = self.pending.remove(content_id) else {
                    debug!(content_id = %content_id, "content_end for untracked content");
                    return Ok(());
                };
                let Some(content) = pending.content else {
                    debug!(content_id = %content_id, "content ended without deltas");
                    return Ok(());
                };
                match self.find_block(&pending.block_id) {
                    Some(block) => block.contents.push(content),
                    None => debug!(
                        content_id = %content_id,
                        block_id = %pending.block_id,
                        "Owning block vanished before content_end"
                    ),
                }
            }
        }
        Ok(())
    }

    /// Most recently opened block with this id.
    fn find_block(&mut self, block_id: &str) -> Option<&mut Block> {
        self.message
            .blocks
            .iter_mut()
            .rev()
            .find(|block| block.id == block_id)
    }

    fn touch(&mut self) {
        let now = chrono::Utc::now().timestamp_millis();
        self.message.updated_at = now.max(self.message.updated_at);
    }
}

/// Stateful event-to-document folder.
///
/// ```
/// use acp_protocol::{DeltaContent, Event};
/// use acp_stream::Aggregator;
///
/// let aggregator = Aggregator::new();
/// aggregator.apply(&Event::run_started("r1", "")).unwrap();
/// aggregator.apply(&Event::block_start("b1", "")).unwrap();
/// aggregator.apply(&Event::content_start("c1", "b1", "", 0)).unwrap();
/// aggregator.apply(&Event::content_delta("c1", 0, DeltaContent::text("hi"))).unwrap();
/// aggregator.apply(&Event::content_end("c1")).unwrap();
/// aggregator.apply(&Event::run_finished("r1")).unwrap();
///
/// let message = aggregator.into_message();
/// assert_eq!(message.id, "r1");
/// ```
pub struct Aggregator {
    state: Mutex<State>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("state", &self.state)
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_config(&AggregatorConfig::default())
    }

    pub fn with_config(config: &AggregatorConfig) -> Self {
        Self {
            state: Mutex::new(State {
                started: false,
                finished: false,
                message: Message::new(config.role),
                pending: HashMap::new(),
            }),
            transport: None,
        }
    }

    /// Forward every successfully applied event to `transport`.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one event.
    ///
    /// A protocol error leaves the document as it was. A transport error is
    /// reported after the event has already been applied.
    pub fn apply(&self, event: &Event) -> StreamResult<()> {
        let mut state = self.lock();
        state.apply(event)?;
        state.touch();

        if let Some(transport) = &self.transport {
            // Sent under the lock so forwarded order matches applied order.
            transport.send(event).map_err(|e| {
                warn!(event = %event.event_type(), error = %e, "Failed to forward event");
                StreamError::Transport(e)
            })?;
        }
        Ok(())
    }

    /// Decode and apply one JSON-encoded event.
    pub fn apply_json(&self, json: &str) -> StreamResult<()> {
        let event = Event::from_json(json)?;
        self.apply(&event)
    }

    /// Copy of the document as it stands.
    pub fn snapshot(&self) -> Message {
        self.lock().message.clone()
    }

    pub fn into_message(self) -> Message {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .message
    }

    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Content items opened but not yet ended.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }
}

/// Apply events from `rx` until every sender is dropped.
///
/// Stops at the first error. The aggregator stays with the caller, so the
/// document built so far is still available through [`Aggregator::snapshot`]
/// or [`Aggregator::into_message`] either way.
pub async fn drive(
    mut rx: mpsc::UnboundedReceiver<Event>,
    aggregator: &Aggregator,
) -> StreamResult<()> {
    while let Some(event) = rx.recv().await {
        aggregator.apply(&event)?;
    }
    Ok(())
}
