//! Configuration management for the carbon footprint estimator

use crate::types::TierThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Where the input field schema comes from
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    /// Derive fields from a reference CSV dataset
    #[default]
    Dataset,
    /// Read fields from a JSON metadata document
    Metadata,
}

/// Model artifact format
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Single JSON bundle
    #[default]
    Json,
    /// Directory of ONNX graphs (requires the `onnx` feature)
    Onnx,
}

/// How the emission tier is chosen
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TierPolicy {
    /// Tier from the cluster label (0 = Low, 1 = Medium, 2 = High)
    #[default]
    Cluster,
    /// Tier from the emission estimate and fixed thresholds
    Threshold,
}

/// How submissions reach the application
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrontendMode {
    /// Interactive terminal form
    #[default]
    Form,
    /// NATS request/reply service
    Nats,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub schema: SchemaConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub tiers: TiersConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input schema configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub source: SchemaSource,
    /// Reference dataset, used when `source = "dataset"`
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,
    /// Target column excluded from the dataset-derived schema
    #[serde(default = "default_target_column")]
    pub target_column: String,
    /// Metadata document, used when `source = "metadata"`
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,
}

fn default_dataset_path() -> String {
    "data/carbon_emission.csv".to_string()
}

fn default_target_column() -> String {
    "CarbonEmission".to_string()
}

fn default_metadata_path() -> String {
    "data/metadata.json".to_string()
}

/// ML models configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    /// JSON bundle path, used with the json backend
    #[serde(default = "default_bundle_path")]
    pub bundle_path: String,
    /// Directory containing ONNX model files, used with the onnx backend
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_bundle_path() -> String {
    "models/carbon_model.json".to_string()
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

/// Tier classification configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TiersConfig {
    #[serde(default)]
    pub policy: TierPolicy,
    #[serde(default)]
    pub thresholds: TierThresholds,
}

/// Result presentation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PresentationConfig {
    /// Render the comparison chart to SVG
    #[serde(default = "default_true")]
    pub charts: bool,
    /// Directory for rendered charts
    #[serde(default = "default_chart_dir")]
    pub chart_dir: String,
}

fn default_true() -> bool {
    true
}

fn default_chart_dir() -> String {
    "charts".to_string()
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            charts: true,
            chart_dir: default_chart_dir(),
        }
    }
}

/// Submission surface configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub mode: FrontendMode,
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
    /// Subject for incoming submissions
    #[serde(default = "default_submission_subject")]
    pub submission_subject: String,
    /// Subject for outcomes of submissions sent without a reply subject
    #[serde(default = "default_result_subject")]
    pub result_subject: String,
    /// Seconds between metrics summaries in service mode
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_submission_subject() -> String {
    "carbon.submissions".to_string()
}

fn default_result_subject() -> String {
    "carbon.results".to_string()
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            mode: FrontendMode::Form,
            nats_url: default_nats_url(),
            submission_subject: default_submission_subject(),
            result_subject: default_result_subject(),
            metrics_interval_secs: default_metrics_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

impl AppConfig {
    /// Load configuration from file
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
            schema: SchemaConfig {
                source: SchemaSource::Dataset,
                dataset_path: default_dataset_path(),
                target_column: default_target_column(),
                metadata_path: default_metadata_path(),
            },
            models: ModelsConfig {
                backend: ModelBackend::Json,
                bundle_path: default_bundle_path(),
                models_dir: default_models_dir(),
                onnx_threads: 1,
            },
            tiers: TiersConfig::default(),
            presentation: PresentationConfig::default(),
            frontend: FrontendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.schema.source, SchemaSource::Dataset);
        assert_eq!(config.schema.target_column, "CarbonEmission");
        assert_eq!(config.models.backend, ModelBackend::Json);
        assert_eq!(config.tiers.policy, TierPolicy::Cluster);
        assert_eq!(config.frontend.mode, FrontendMode::Form);
        assert_eq!(config.tiers.thresholds.low_below, 200.0);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let toml = r#"
            [schema]
            source = "metadata"
            metadata_path = "meta.json"

            [models]
            bundle_path = "bundle.json"

            [tiers]
            policy = "threshold"
        "#;

        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.schema.source, SchemaSource::Metadata);
        assert_eq!(config.schema.metadata_path, "meta.json");
        assert_eq!(config.schema.target_column, "CarbonEmission");
        assert_eq!(config.models.bundle_path, "bundle.json");
        assert_eq!(config.tiers.policy, TierPolicy::Threshold);
        assert_eq!(config.tiers.thresholds.medium_below, 400.0);
        assert!(config.presentation.charts);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(AppConfig::load_from_path("config/absent.toml").is_err());
    }
}
