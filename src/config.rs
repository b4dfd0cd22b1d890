//! Configuration management for the heart risk service

use crate::types::prediction::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "HEART_API_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Socket address the server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Static model artifacts read once at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Serialized classifier (JSON)
    pub model_path: PathBuf,
    /// JSON array of training column names
    pub columns_path: PathBuf,
    /// Abort startup when the artifacts cannot be loaded. When false the
    /// service starts degraded and `/health` reports the failure.
    pub required: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            columns_path: PathBuf::from("training_columns.json"),
            required: true,
        }
    }
}

/// Decision configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Probability above which the prediction is positive
    pub threshold: f64,
    /// Risk level classification thresholds
    pub risk_levels: RiskLevelThresholds,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            risk_levels: RiskLevelThresholds::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Periodic metrics summary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from `HEART_API_CONFIG` or `config/config.toml`
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, overlaid by `HEART_API__*` variables.
    ///
    /// A missing file is not an error; every section falls back to its defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("HEART_API")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.detection.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("detection.threshold must be within [0, 1], got {threshold}");
        }
        let levels = &self.detection.risk_levels;
        let bounds = [levels.medium, levels.high, levels.critical];
        let in_range = bounds.iter().all(|b| (0.0..=1.0).contains(b));
        if !in_range || !bounds.windows(2).all(|w| w[0] <= w[1]) {
            anyhow::bail!(
                "detection.risk_levels must satisfy 0 <= medium <= high <= critical <= 1, got {}/{}/{}",
                levels.medium,
                levels.high,
                levels.critical
            );
        }
        Ok(())
    }
}
