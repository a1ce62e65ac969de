//! Model artifact loader

use super::{ColumnPreprocessor, KMeansClusterer, LinearRegressor, ModelBundle};
use crate::config::{ModelBackend, ModelsConfig};
use crate::error::ModelLoadError;
use crate::types::ClusterSummaryTable;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// On-disk layout of the JSON model bundle
#[derive(Debug, Deserialize)]
struct BundleFile {
    regression: LinearRegressor,
    #[serde(default)]
    preprocessor: Option<ColumnPreprocessor>,
    #[serde(default)]
    clustering: Option<KMeansClusterer>,
    #[serde(default)]
    cluster_summary: ClusterSummaryTable,
}

/// Loader for model artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the bundle for the configured backend
    pub fn load(&self, config: &ModelsConfig) -> Result<ModelBundle, ModelLoadError> {
        match config.backend {
            ModelBackend::Json => self.load_bundle(&config.bundle_path),
            ModelBackend::Onnx => self.load_onnx(&config.models_dir),
        }
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, models_dir: &str) -> Result<ModelBundle, ModelLoadError> {
        super::onnx::OnnxModelLoader::new(self.onnx_threads)?.load_bundle(models_dir)
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, models_dir: &str) -> Result<ModelBundle, ModelLoadError> {
        Err(ModelLoadError::Inconsistent(format!(
            "ONNX models in {} requested, but this build lacks the `onnx` feature ({} threads configured)",
            models_dir, self.onnx_threads
        )))
    }

    /// Load a JSON model bundle from file
    pub fn load_bundle<P: AsRef<Path>>(&self, path: P) -> Result<ModelBundle, ModelLoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model bundle");

        let file = File::open(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::bundle_from_reader(BufReader::new(file))
    }

    /// Parse and check a JSON model bundle
    pub fn bundle_from_reader<R: Read>(reader: R) -> Result<ModelBundle, ModelLoadError> {
        let file: BundleFile = serde_json::from_reader(reader)?;

        file.regression.validate()?;
        if let Some(preprocessor) = &file.preprocessor {
            preprocessor.validate()?;
        }
        if let Some(clustering) = &file.clustering {
            clustering.validate()?;
        }

        match (&file.preprocessor, &file.clustering) {
            (Some(preprocessor), Some(clustering)) => {
                if preprocessor.output_width() != clustering.n_features() {
                    return Err(ModelLoadError::Inconsistent(format!(
                        "preprocessor emits {} features but centroids have {}",
                        preprocessor.output_width(),
                        clustering.n_features()
                    )));
                }
                if file.cluster_summary.is_empty() {
                    warn!("Clustering model loaded without cluster summaries");
                }
            }
            (Some(_), None) => warn!("Preprocessor loaded without a clustering model, clustering disabled"),
            (None, Some(_)) => warn!("Clustering model loaded without a preprocessor, clustering disabled"),
            (None, None) => info!("No clustering model in bundle"),
        }

        info!(
            clusters = file.clustering.as_ref().map(KMeansClusterer::n_clusters).unwrap_or(0),
            summaries = file.cluster_summary.len(),
            "Model bundle loaded successfully"
        );

        Ok(ModelBundle {
            regression: Box::new(file.regression),
            preprocessor: file
                .preprocessor
                .map(|p| Box::new(p) as Box<dyn super::Preprocessor>),
            clustering: file
                .clustering
                .map(|c| Box::new(c) as Box<dyn super::Clusterer>),
            cluster_summary: file.cluster_summary,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON bundle used by tests across the crate: Diet/DistanceKm regression,
/// scaler + one-hot preprocessor, three clusters with summaries for 0 and 1.
#[cfg(test)]
pub(crate) const TEST_BUNDLE: &str = r#"{
    "regression": {
        "columns": ["Diet", "DistanceKm"],
        "intercept": 100.0,
        "numeric": {"DistanceKm": 2.0},
        "categorical": {"Diet": {"Omnivore": 80.0, "Vegan": 10.0}}
    },
    "preprocessor": {
        "columns": ["Diet", "DistanceKm"],
        "steps": [
            {"type": "standard_scale", "column": "DistanceKm", "mean": 50.0, "scale": 25.0},
            {"type": "one_hot", "column": "Diet", "categories": ["Omnivore", "Vegan"]}
        ]
    },
    "clustering": {
        "centroids": [[-1.0, 0.0, 1.0], [0.0, 1.0, 0.0], [2.0, 1.0, 0.0]]
    },
    "cluster_summary": {
        "0": {"average_emission": 140.0, "sample_size": 120},
        "1": {"average_emission": 310.5, "sample_size": 95}
    }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_full_bundle() {
        let bundle = ModelLoader::bundle_from_reader(TEST_BUNDLE.as_bytes()).unwrap();
        assert!(bundle.has_clustering());
        assert_eq!(bundle.cluster_summary.len(), 2);
        assert_eq!(bundle.regression.expected_columns(), ["Diet", "DistanceKm"]);
    }

    #[test]
    fn test_regression_only_bundle() {
        let json = r#"{"regression": {"columns": ["Km"], "intercept": 1.0, "numeric": {"Km": 0.5}}}"#;
        let bundle = ModelLoader::bundle_from_reader(json.as_bytes()).unwrap();
        assert!(!bundle.has_clustering());
        assert!(bundle.cluster_summary.is_empty());
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let json = r#"{
            "regression": {"columns": ["Km"], "intercept": 1.0},
            "preprocessor": {"columns": ["Km"], "steps": [{"type": "standard_scale", "column": "Km", "mean": 0, "scale": 1}]},
            "clustering": {"centroids": [[0.0, 1.0]]}
        }"#;
        let result = ModelLoader::bundle_from_reader(json.as_bytes());
        assert!(matches!(result, Err(ModelLoadError::Inconsistent(_))));
    }

    #[test]
    fn test_missing_regression_rejected() {
        let result = ModelLoader::bundle_from_reader(r#"{"clustering": null}"#.as_bytes());
        assert!(matches!(result, Err(ModelLoadError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ModelLoader::new().load_bundle("models/absent.json");
        assert!(matches!(result, Err(ModelLoadError::Io { .. })));
    }
}
