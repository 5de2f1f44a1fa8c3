//! Stream configuration.
//!
//! Loaded in layers: built-in defaults, then an optional TOML file, then
//! environment variables of the form `ACP__SECTION__KEY`
//! (for example `ACP__AGGREGATOR__ROLE=user`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use acp_protocol::Role;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ACP";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub aggregator: AggregatorConfig,
    pub sequencer: SequencerConfig,
    pub logging: LoggingConfig,
}

/// Aggregator settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Role stamped on the aggregated message.
    pub role: Role,
}

/// Sequencer settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Parent run id for emitted `run_started` events. Empty means none.
    pub parent_run_id: String,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is not set.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

impl StreamConfig {
    /// Load from defaults, an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`StreamConfig::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("aggregator.role", defaults.aggregator.role.as_str())?
            .set_default("sequencer.parent_run_id", defaults.sequencer.parent_run_id)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let built = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: StreamConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.level_filter()?;
        Ok(())
    }

    /// Write the default configuration as commented TOML.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(&Self::default())?;
        let mut body = format!("# ACP stream configuration\n# File: {}\n\n", path.display());
        body.push_str(&toml);
        fs::write(path, body)?;
        Ok(())
    }
}
