//! Inference dispatch: regression, optional clustering, cluster summary

use crate::config::{AppConfig, TierPolicy};
use crate::error::{DispatchError, FeatureMappingError, PredictionError};
use crate::models::loader::ModelLoader;
use crate::models::ModelBundle;
use crate::types::{cluster_display_name, FeatureRecord, PredictionResult, Tier, TierThresholds};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Runs a feature record through the loaded models
pub struct InferenceEngine {
    bundle: ModelBundle,
    policy: TierPolicy,
    thresholds: TierThresholds,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.models.onnx_threads);
        let bundle = loader
            .load(&config.models)
            .context("Failed to load model artifacts")?;

        info!(
            backend = ?config.models.backend,
            policy = ?config.tiers.policy,
            clustering = bundle.has_clustering(),
            "Inference engine initialized"
        );

        Ok(Self::with_bundle(
            bundle,
            config.tiers.policy.clone(),
            config.tiers.thresholds.clone(),
        ))
    }

    /// Create inference engine around an already loaded bundle
    pub fn with_bundle(bundle: ModelBundle, policy: TierPolicy, thresholds: TierThresholds) -> Self {
        if policy == TierPolicy::Cluster && !bundle.has_clustering() {
            warn!("Cluster tier policy without a clustering model, tiers will be empty");
        }
        Self {
            bundle,
            policy,
            thresholds,
        }
    }

    pub fn has_clustering(&self) -> bool {
        self.bundle.has_clustering()
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Columns the regression model was fit on
    pub fn expected_columns(&self) -> &[String] {
        self.bundle.regression.expected_columns()
    }

    /// Run the full prediction for one record
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, DispatchError> {
        check_columns(record, self.bundle.regression.expected_columns())?;

        let emission_estimate = self
            .bundle
            .regression
            .predict(record)?
            .first()
            .copied()
            .ok_or(PredictionError::EmptyOutput("regression"))?;

        let cluster_label = self.predict_cluster(record)?;

        let cluster_summary = cluster_label
            .and_then(|label| self.bundle.cluster_summary.get(&label))
            .cloned();

        let cluster_name =
            cluster_label.map(|label| cluster_display_name(label, cluster_summary.is_some()));

        let tier = match self.policy {
            TierPolicy::Cluster => cluster_label.and_then(Tier::from_cluster_label),
            TierPolicy::Threshold => Some(Tier::from_emission(emission_estimate, &self.thresholds)),
        };

        debug!(
            emission = emission_estimate,
            cluster = ?cluster_label,
            tier = ?tier,
            "Inference complete"
        );

        Ok(PredictionResult {
            emission_estimate,
            cluster_label,
            cluster_summary,
            cluster_name,
            tier,
        })
    }

    /// Preprocess and cluster, when both models are loaded
    fn predict_cluster(&self, record: &FeatureRecord) -> Result<Option<u32>, DispatchError> {
        let (preprocessor, clustering) = match (&self.bundle.preprocessor, &self.bundle.clustering) {
            (Some(p), Some(c)) => (p, c),
            _ => return Ok(None),
        };

        check_columns(record, preprocessor.expected_columns())?;
        let transformed = preprocessor.transform(record)?;
        let label = clustering
            .predict(&transformed)?
            .first()
            .copied()
            .ok_or(PredictionError::EmptyOutput("clustering"))?;

        Ok(Some(label))
    }
}

/// The record must hold exactly `expected`, in the same order
fn check_columns(record: &FeatureRecord, expected: &[String]) -> Result<(), FeatureMappingError> {
    let actual = record.column_names();

    let missing: Vec<String> = expected
        .iter()
        .filter(|c| !actual.contains(&c.as_str()))
        .cloned()
        .collect();
    let unexpected: Vec<String> = actual
        .iter()
        .filter(|c| !expected.iter().any(|e| e.as_str() == **c))
        .map(|c| c.to_string())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(FeatureMappingError::ColumnMismatch {
            missing,
            unexpected,
        });
    }
    if actual.len() != expected.len() || actual.iter().zip(expected).any(|(a, e)| *a != e.as_str()) {
        return Err(FeatureMappingError::ColumnOrder);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loader::TEST_BUNDLE;
    use crate::models::{LinearRegressor, Regressor};
    use crate::types::{ClusterSummary, FeatureValue};

    fn engine(policy: TierPolicy) -> InferenceEngine {
        let bundle = ModelLoader::bundle_from_reader(TEST_BUNDLE.as_bytes()).unwrap();
        InferenceEngine::with_bundle(bundle, policy, TierThresholds::default())
    }

    fn record(diet: &str, km: f64) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        record.push("Diet", FeatureValue::Text(diet.to_string()));
        record.push("DistanceKm", FeatureValue::Number(km));
        record
    }

    struct FailingRegressor {
        columns: Vec<String>,
    }

    impl Regressor for FailingRegressor {
        fn expected_columns(&self) -> &[String] {
            &self.columns
        }

        fn predict(&self, _record: &FeatureRecord) -> Result<Vec<f64>, PredictionError> {
            Err(PredictionError::Runtime {
                model: "regression",
                message: "shape mismatch".to_string(),
            })
        }
    }

    #[test]
    fn test_prediction_with_cluster_summary() {
        let result = engine(TierPolicy::Cluster).predict(&record("Vegan", 20.0)).unwrap();

        assert_eq!(result.emission_estimate, 150.0);
        assert_eq!(result.cluster_label, Some(0));
        assert_eq!(
            result.cluster_summary,
            Some(ClusterSummary {
                average_emission: 140.0,
                sample_size: 120
            })
        );
        assert_eq!(result.cluster_name.as_deref(), Some("Low"));
        assert_eq!(result.tier, Some(Tier::Low));
    }

    #[test]
    fn test_label_without_summary_falls_back() {
        let result = engine(TierPolicy::Cluster)
            .predict(&record("Omnivore", 100.0))
            .unwrap();

        assert_eq!(result.cluster_label, Some(2));
        assert_eq!(result.cluster_summary, None);
        assert_eq!(result.cluster_name.as_deref(), Some("Cluster 3"));
    }

    #[test]
    fn test_threshold_policy() {
        let result = engine(TierPolicy::Threshold)
            .predict(&record("Vegan", 20.0))
            .unwrap();
        assert_eq!(result.tier, Some(Tier::Low));

        let result = engine(TierPolicy::Threshold)
            .predict(&record("Omnivore", 100.0))
            .unwrap();
        assert_eq!(result.emission_estimate, 380.0);
        assert_eq!(result.tier, Some(Tier::Medium));
    }

    #[test]
    fn test_no_clustering_model() {
        let regression = LinearRegressor::new(vec!["Diet".to_string(), "DistanceKm".to_string()], 100.0)
            .with_category("Diet", "Vegan", 10.0)
            .with_numeric("DistanceKm", 2.0);
        let engine = InferenceEngine::with_bundle(
            ModelBundle::regression_only(Box::new(regression)),
            TierPolicy::Cluster,
            TierThresholds::default(),
        );

        let result = engine.predict(&record("Vegan", 20.0)).unwrap();
        assert_eq!(result.emission_estimate, 150.0);
        assert_eq!(result.cluster_label, None);
        assert_eq!(result.cluster_summary, None);
        assert_eq!(result.cluster_name, None);
        assert_eq!(result.tier, None);
    }

    #[test]
    fn test_regression_failure_is_returned() {
        let engine = InferenceEngine::with_bundle(
            ModelBundle::regression_only(Box::new(FailingRegressor {
                columns: vec!["Diet".to_string(), "DistanceKm".to_string()],
            })),
            TierPolicy::Cluster,
            TierThresholds::default(),
        );

        let err = engine.predict(&record("Vegan", 20.0)).unwrap_err();
        assert_eq!(err.kind(), "prediction");
    }

    #[test]
    fn test_missing_and_extra_columns() {
        let mut bad = FeatureRecord::new();
        bad.push("Diet", FeatureValue::Text("Vegan".to_string()));
        bad.push("Pets", FeatureValue::Text("dog".to_string()));

        let err = engine(TierPolicy::Cluster).predict(&bad).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Mapping(FeatureMappingError::ColumnMismatch {
                missing: vec!["DistanceKm".to_string()],
                unexpected: vec!["Pets".to_string()],
            })
        );
    }

    #[test]
    fn test_preprocessor_columns_checked() {
        let json = r#"{
            "regression": {
                "columns": ["Diet", "DistanceKm"],
                "intercept": 100.0,
                "numeric": {"DistanceKm": 2.0},
                "categorical": {"Diet": {"Omnivore": 80.0, "Vegan": 10.0}}
            },
            "preprocessor": {
                "columns": ["DistanceKm"],
                "steps": [{"type": "standard_scale", "column": "DistanceKm", "mean": 50.0, "scale": 25.0}]
            },
            "clustering": {"centroids": [[-1.0], [1.0]]}
        }"#;
        let bundle = ModelLoader::bundle_from_reader(json.as_bytes()).unwrap();
        let engine =
            InferenceEngine::with_bundle(bundle, TierPolicy::Cluster, TierThresholds::default());

        let err = engine.predict(&record("Vegan", 20.0)).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Mapping(FeatureMappingError::ColumnMismatch {
                missing: vec![],
                unexpected: vec!["Diet".to_string()],
            })
        );
    }

    #[test]
    fn test_reordered_columns() {
        let mut swapped = FeatureRecord::new();
        swapped.push("DistanceKm", FeatureValue::Number(20.0));
        swapped.push("Diet", FeatureValue::Text("Vegan".to_string()));

        let err = engine(TierPolicy::Cluster).predict(&swapped).unwrap_err();
        assert_eq!(err, DispatchError::Mapping(FeatureMappingError::ColumnOrder));
    }
}
