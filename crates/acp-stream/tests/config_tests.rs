//! Configuration loading from files.

use std::collections::HashMap;

use acp_protocol::Role;
use acp_stream::{Aggregator, Sequencer, StreamConfig};

#[test]
fn test_load_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acp.toml");
    std::fs::write(
        &path,
        r#"
[aggregator]
role = "system"

[sequencer]
parent_run_id = "parent-run"

[logging]
level = "debug"
json = true
"#,
    )
    .unwrap();

    let config = StreamConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap();
    assert_eq!(config.aggregator.role, Role::System);
    assert_eq!(config.sequencer.parent_run_id, "parent-run");
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);

    let aggregator = Aggregator::with_config(&config.aggregator);
    assert_eq!(aggregator.snapshot().role, Role::System);
}

#[test]
fn test_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acp.toml");
    std::fs::write(&path, "[aggregator]\nrole = \"system\"\n").unwrap();

    let env = HashMap::from([("ACP__AGGREGATOR__ROLE".to_string(), "user".to_string())]);
    let config = StreamConfig::load_with_env(Some(&path), Some(env)).unwrap();
    assert_eq!(config.aggregator.role, Role::User);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let config = StreamConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap();
    assert_eq!(config, StreamConfig::default());
}

#[test]
fn test_write_default_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("acp.toml");
    StreamConfig::write_default(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("# ACP stream configuration"));

    let config = StreamConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap();
    assert_eq!(config, StreamConfig::default());
}

#[test]
fn test_sequencer_uses_configured_parent() {
    let config = StreamConfig::default();
    let sequencer = Sequencer::new(&config.sequencer);
    let event = sequencer.run_started().unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["parent_run_id"], acp_protocol::NONE_RUN_ID);
}
