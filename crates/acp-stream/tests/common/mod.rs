//! Shared helpers for stream tests.

#![allow(dead_code)]

use acp_protocol::{DeltaContent, Event};
use acp_stream::Aggregator;

/// Apply every event, panicking on the first failure.
pub fn apply_all(aggregator: &Aggregator, events: &[Event]) {
    for event in events {
        aggregator
            .apply(event)
            .unwrap_or_else(|e| panic!("failed to apply {}: {e}", event.event_type()));
    }
}

/// Open a run with a single block `b1`.
pub fn run_with_block(run_id: &str) -> Vec<Event> {
    vec![
        Event::run_started(run_id, ""),
        Event::block_start("b1", ""),
    ]
}

/// A complete content item: start, one delta per entry, end.
pub fn content(content_id: &str, block_id: &str, deltas: Vec<DeltaContent>) -> Vec<Event> {
    let mut events = vec![Event::content_start(content_id, block_id, "", 0)];
    events.extend(
        deltas
            .into_iter()
            .map(|delta| Event::content_delta(content_id, 0, delta)),
    );
    events.push(Event::content_end(content_id));
    events
}
