//! Aggregator behavior over whole event streams.

mod common;

use std::sync::Arc;
use std::thread;

use acp_protocol::{Content, DeltaContent, Event, ProtocolError, Usage};
use acp_stream::Aggregator;
use common::{apply_all, content, run_with_block};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn test_run_started_is_idempotent() {
    let aggregator = Aggregator::new();
    aggregator.apply(&Event::run_started("r1", "")).unwrap();
    aggregator.apply(&Event::run_started("r2", "")).unwrap();
    assert!(aggregator.is_started());
    assert_eq!(aggregator.snapshot().id, "r1");
}

#[test]
fn test_second_terminal_event_fails() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    aggregator.apply(&Event::run_finished("r1")).unwrap();
    let before = aggregator.snapshot();

    let err = aggregator
        .apply(&Event::run_error("r1", "late failure"))
        .unwrap_err();
    assert_eq!(err.as_protocol(), Some(&ProtocolError::StreamDone));
    assert!(err.to_string().contains("stream already done"));
    assert_eq!(aggregator.snapshot(), before);
}

#[test]
fn test_completion_order_wins_over_start_order() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    apply_all(
        &aggregator,
        &[
            Event::content_start("c1", "b1", "", 0),
            Event::content_start("c2", "b1", "", 1),
            Event::content_delta("c1", 0, DeltaContent::text("first opened")),
            Event::content_delta("c2", 1, DeltaContent::text("first closed")),
            Event::content_end("c2"),
            Event::content_end("c1"),
        ],
    );
    let contents = &aggregator.snapshot().blocks[0].contents;
    let texts: Vec<_> = contents
        .iter()
        .map(|c| c.as_text().unwrap().text.as_str())
        .collect();
    assert_eq!(texts, vec!["first closed", "first opened"]);
}

#[test]
fn test_block_end_binds_to_latest_duplicate() {
    let aggregator = Aggregator::new();
    let usage = Usage {
        input_tokens: 42,
        output_tokens: 8,
        ..Default::default()
    };
    apply_all(
        &aggregator,
        &[
            Event::run_started("r1", ""),
            Event::block_start("b1", ""),
            Event::block_start("b1", ""),
            Event::block_end("b1", Some(usage.clone())),
        ],
    );
    let blocks = aggregator.snapshot().blocks;
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].usage.is_none());
    assert_eq!(blocks[1].usage, Some(usage));
}

#[test]
fn test_content_start_binds_to_latest_duplicate_block() {
    let aggregator = Aggregator::new();
    apply_all(
        &aggregator,
        &[Event::block_start("b1", ""), Event::block_start("b1", "")],
    );
    apply_all(
        &aggregator,
        &content("c1", "b1", vec![DeltaContent::text("x")]),
    );
    let blocks = aggregator.snapshot().blocks;
    assert!(blocks[0].contents.is_empty());
    assert_eq!(blocks[1].contents.len(), 1);
}

#[test]
fn test_end_to_end_document() {
    let aggregator = Aggregator::new();
    apply_all(
        &aggregator,
        &[
            Event::run_started("r1", ""),
            Event::block_start("b1", ""),
            Event::content_start("c1", "b1", "", 0),
            Event::content_delta("c1", 0, DeltaContent::text("hel")),
            Event::content_delta("c1", 0, DeltaContent::text("lo")),
            Event::content_end("c1"),
            Event::block_end("b1", None),
            Event::run_finished("r1"),
        ],
    );
    assert!(aggregator.is_finished());
    let message = aggregator.into_message();
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["id"], "r1");
    assert_eq!(
        value["blocks"],
        json!([{"id": "b1", "contents": [{"type": "text", "text": "hello"}]}])
    );
    assert!(value.get("errors").is_none());
}

#[test]
fn test_concurrent_apply_keeps_each_item_intact() {
    const WRITERS: usize = 8;
    const FRAGMENTS: usize = 50;

    let aggregator = Arc::new(Aggregator::new());
    apply_all(&aggregator, &run_with_block("r1"));

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                let content_id = format!("c{writer}");
                let deltas = (0..FRAGMENTS)
                    .map(|i| DeltaContent::text(format!("{writer}.{i};")))
                    .collect();
                apply_all(&aggregator, &content(&content_id, "b1", deltas));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    aggregator.apply(&Event::block_end("b1", None)).unwrap();
    assert_eq!(aggregator.pending_len(), 0);

    let message = aggregator.snapshot();
    let contents = &message.blocks[0].contents;
    assert_eq!(contents.len(), WRITERS);

    let mut texts: Vec<String> = contents
        .iter()
        .map(|c| c.as_text().unwrap().text.clone())
        .collect();
    texts.sort();
    let mut expected: Vec<String> = (0..WRITERS)
        .map(|writer| (0..FRAGMENTS).map(|i| format!("{writer}.{i};")).collect())
        .collect();
    expected.sort();
    assert_eq!(texts, expected);
}

#[test]
fn test_interaction_keeps_first_identity() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    apply_all(
        &aggregator,
        &content(
            "c1",
            "b1",
            vec![
                DeltaContent::interaction("itx-1", "0.8", json!({"beginRendering": {}})),
                DeltaContent::interaction("itx-2", "0.9", json!({"surfaceUpdate": {}})),
            ],
        ),
    );
    let message = aggregator.into_message();
    assert_eq!(message.blocks[0].contents.len(), 1);
    let Content::Interaction(interaction) = &message.blocks[0].contents[0] else {
        panic!("Expected Interaction content");
    };
    assert_eq!(interaction.a2ui_messages.len(), 2);
    assert_eq!(interaction.interaction_id, "itx-1");
    assert_eq!(interaction.a2ui_version, "0.8");
}

#[test]
fn test_unknown_content_delta_is_dropped() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    aggregator
        .apply(&Event::content_delta("ghost", 0, DeltaContent::text("boo")))
        .unwrap();
    aggregator.apply(&Event::content_end("ghost")).unwrap();
    let message = aggregator.into_message();
    assert!(message.blocks.iter().all(|b| b.contents.is_empty()));
}

#[test]
fn test_tool_call_through_stream() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    apply_all(
        &aggregator,
        &content(
            "c1",
            "b1",
            vec![
                DeltaContent::tool_call("grep"),
                DeltaContent::tool_args(r#"{"pattern":"fn main"}"#),
                DeltaContent::tool_result("src/main.rs:1"),
                DeltaContent::tool_error("exit status 2"),
                DeltaContent::tool_result(" ignored"),
            ],
        ),
    );
    let message = aggregator.into_message();
    let Content::ToolCall(call) = &message.blocks[0].contents[0] else {
        panic!("Expected ToolCall content");
    };
    assert_eq!(call.tool_result, "src/main.rs:1");
    assert_eq!(call.error.as_deref(), Some("exit status 2"));
}

#[test]
fn test_tool_args_before_call_is_an_error() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    aggregator
        .apply(&Event::content_start("c1", "b1", "", 0))
        .unwrap();
    let err = aggregator
        .apply(&Event::content_delta("c1", 0, DeltaContent::tool_args("{}")))
        .unwrap_err();
    assert!(err.as_protocol().unwrap().is_content_structure());
}

#[test]
fn test_persisted_document_round_trips() {
    let aggregator = Aggregator::new();
    apply_all(&aggregator, &run_with_block("r1"));
    apply_all(
        &aggregator,
        &content("c1", "b1", vec![DeltaContent::data("image/png", &[9, 8, 7])]),
    );
    apply_all(
        &aggregator,
        &content(
            "c2",
            "b1",
            vec![
                DeltaContent::web_search("acp protocol"),
                DeltaContent::web_search_result("", vec![]),
            ],
        ),
    );
    let message = aggregator.into_message();
    let json = serde_json::to_string(&message).unwrap();
    assert_eq!(acp_protocol::Message::from_json(&json).unwrap(), message);
}

proptest! {
    #[test]
    fn text_chunks_concatenate(chunks in proptest::collection::vec("[a-z ]{0,8}", 1..20)) {
        let aggregator = Aggregator::new();
        apply_all(&aggregator, &run_with_block("r1"));
        let deltas = chunks.iter().map(|c| DeltaContent::text(c.clone())).collect();
        apply_all(&aggregator, &content("c1", "b1", deltas));

        let message = aggregator.into_message();
        let text = &message.blocks[0].contents[0].as_text().unwrap().text;
        prop_assert_eq!(text, &chunks.concat());
    }

    #[test]
    fn binary_fragments_concatenate(
        fragments in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..32), 1..12)
    ) {
        let aggregator = Aggregator::new();
        apply_all(&aggregator, &run_with_block("r1"));
        let deltas = fragments
            .iter()
            .map(|f| DeltaContent::data("application/octet-stream", f))
            .collect();
        apply_all(&aggregator, &content("c1", "b1", deltas));

        let message = aggregator.into_message();
        let Content::Data(data) = &message.blocks[0].contents[0] else {
            panic!("Expected Data content");
        };
        prop_assert_eq!(data.bytes().unwrap(), fragments.concat());
    }
}
