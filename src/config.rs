//! Runtime configuration for the `cronctl` binary: polling cadence,
//! clock behaviour, and logging. The reconciliation core itself
//! (`reconciler::sync_cron_job`) takes its tunables as an explicit
//! `ReconcilerConfig` argument; this module is only about wiring that up
//! from the process environment and an optional TOML file.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconciler::ReconcilerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("io error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for the `cronctl` process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub reconciler: ReconcilerSection,
    pub logging: LoggingConfig,
}

/// TOML-friendly mirror of `ReconcilerConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerSection {
    /// Cluster-wide fallback for `CronJobSpec::starting_deadline_seconds`
    /// when a CronJob leaves it unset. `None` keeps the unbounded default.
    pub default_starting_deadline_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ReconcilerSection {
    fn default() -> Self {
        let default = ReconcilerConfig::default();
        Self {
            default_starting_deadline_seconds: default.default_starting_deadline_seconds,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Start from defaults, then overlay environment variables:
    /// `CRONCTL_DEFAULT_STARTING_DEADLINE_SECONDS`, `CRONCTL_LOG_LEVEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("CRONCTL_DEFAULT_STARTING_DEADLINE_SECONDS") {
            let parsed = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CRONCTL_DEFAULT_STARTING_DEADLINE_SECONDS".to_string(),
                reason: "must be an integer number of seconds".to_string(),
            })?;
            config.reconciler.default_starting_deadline_seconds = Some(parsed);
        }

        if let Ok(level) = env::var("CRONCTL_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults for any section the
    /// file omits (achieved by `#[serde(default)]` on every field group
    /// would be preferable, but a whole-file deserialize keeps this small
    /// and matches how the file is expected to be hand-written in full).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.reconciler.default_starting_deadline_seconds, Some(s) if s <= 0) {
            return Err(ConfigError::InvalidValue {
                key: "reconciler.default_starting_deadline_seconds".to_string(),
                reason: "must be > 0 when set".to_string(),
            });
        }
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }
        Ok(())
    }

    /// Build the `ReconcilerConfig` the core actually consumes.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            default_starting_deadline_seconds: self.reconciler.default_starting_deadline_seconds,
        }
    }
}

/// Install a `tracing` subscriber reading `RUST_LOG` if set, else the
/// configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
