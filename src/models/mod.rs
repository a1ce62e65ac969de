//! ML model inference components

pub mod inference;
pub mod kmeans;
pub mod linear;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocessor;

use crate::error::PredictionError;
use crate::types::{ClusterSummaryTable, FeatureRecord};

pub use inference::InferenceEngine;
pub use kmeans::KMeansClusterer;
pub use linear::LinearRegressor;
pub use loader::ModelLoader;
pub use preprocessor::ColumnPreprocessor;

/// Fitted model mapping a feature record to an emission estimate
pub trait Regressor: Send + Sync {
    /// Columns the model was fit on, in order
    fn expected_columns(&self) -> &[String];

    /// One output per record row; the dispatcher uses the first
    fn predict(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictionError>;
}

/// Fitted transform applied to a record before clustering
pub trait Preprocessor: Send + Sync {
    fn expected_columns(&self) -> &[String];

    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictionError>;
}

/// Fitted model mapping a transformed record to a cluster label
pub trait Clusterer: Send + Sync {
    fn predict(&self, transformed: &[f64]) -> Result<Vec<u32>, PredictionError>;
}

/// Everything loaded from the model artifacts
pub struct ModelBundle {
    pub regression: Box<dyn Regressor>,
    pub preprocessor: Option<Box<dyn Preprocessor>>,
    pub clustering: Option<Box<dyn Clusterer>>,
    pub cluster_summary: ClusterSummaryTable,
}

impl ModelBundle {
    /// Bundle with only a regression model
    pub fn regression_only(regression: Box<dyn Regressor>) -> Self {
        Self {
            regression,
            preprocessor: None,
            clustering: None,
            cluster_summary: ClusterSummaryTable::new(),
        }
    }

    /// Whether the clustering path can run
    pub fn has_clustering(&self) -> bool {
        self.preprocessor.is_some() && self.clustering.is_some()
    }
}
