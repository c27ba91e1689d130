//! Configuration management for the drift monitor

use crate::drift::{DataDriftConfig, ModelDriftConfig};
use crate::model::TrainerConfig;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub data_drift: DataDriftConfig,
    #[serde(default)]
    pub model_drift: ModelDriftConfig,
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filesystem layout for reference bundles and cycle reports
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Root directory of the reference bundle store
    pub reference_dir: String,
    /// Directory cycle reports are written into
    pub report_dir: String,
}

/// Pushgateway export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Pushgateway base URL; metrics export is disabled when unset
    pub pushgateway_url: Option<String>,
    /// Job label on the pushed group
    #[serde(default = "default_job")]
    pub job: String,
}

fn default_job() -> String {
    "clv_drift_monitor".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pushgateway_url: None,
            job: default_job(),
        }
    }
}

/// Retrain-event publishing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// NATS server URL; event publishing is disabled when unset
    pub nats_url: Option<String>,
    /// Subject retrain events are published on
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_subject() -> String {
    "clv.retrain".to_string()
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            nats_url: None,
            subject: default_subject(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                reference_dir: "reference".to_string(),
                report_dir: "reports".to_string(),
            },
            data_drift: DataDriftConfig::default(),
            model_drift: ModelDriftConfig::default(),
            trainer: TrainerConfig::default(),
            metrics: MetricsConfig::default(),
            trigger: TriggerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
