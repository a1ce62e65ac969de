//! Prediction results, cluster summaries and emission tiers

use crate::error::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Emission tier shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Fixed mapping from k-means label to tier; other labels have no tier
    pub fn from_cluster_label(label: u32) -> Option<Self> {
        match label {
            0 => Some(Tier::Low),
            1 => Some(Tier::Medium),
            2 => Some(Tier::High),
            _ => None,
        }
    }

    /// Classify an emission estimate against thresholds
    pub fn from_emission(emission: f64, thresholds: &TierThresholds) -> Self {
        if emission < thresholds.low_below {
            Tier::Low
        } else if emission < thresholds.medium_below {
            Tier::Medium
        } else {
            Tier::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Low => "Low",
            Tier::Medium => "Medium",
            Tier::High => "High",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emission thresholds (kg CO₂) for the threshold tier policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThresholds {
    pub low_below: f64,
    pub medium_below: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            low_below: 200.0,
            medium_below: 400.0,
        }
    }
}

/// Precomputed statistics for one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    #[serde(alias = "Average Carbon Emission")]
    pub average_emission: f64,
    #[serde(alias = "Sample Size")]
    pub sample_size: u64,
}

/// Cluster label to summary
pub type ClusterSummaryTable = BTreeMap<u32, ClusterSummary>;

/// Display name for a cluster.
///
/// Labels with a summary and a fixed tier use the tier name; everything else
/// gets the one-based "Cluster N" fallback.
pub fn cluster_display_name(label: u32, has_summary: bool) -> String {
    match Tier::from_cluster_label(label) {
        Some(tier) if has_summary => tier.to_string(),
        _ => format!("Cluster {}", u64::from(label) + 1),
    }
}

/// Outcome of one successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted emission (kg CO₂)
    pub emission_estimate: f64,
    /// Cluster assigned by the clustering model, when one is loaded
    pub cluster_label: Option<u32>,
    /// Summary of the assigned cluster, when the label is in the table
    pub cluster_summary: Option<ClusterSummary>,
    /// Human-readable cluster name
    pub cluster_name: Option<String>,
    /// Tier under the configured policy
    pub tier: Option<Tier>,
}

/// Reply envelope for the submission service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub submission_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionStatus {
    Ok { result: PredictionResult },
    Error { kind: String, message: String },
}

impl SubmissionOutcome {
    pub fn from_result(result: &Result<PredictionResult, DispatchError>) -> Self {
        let status = match result {
            Ok(prediction) => SubmissionStatus::Ok {
                result: prediction.clone(),
            },
            Err(e) => SubmissionStatus::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        };

        Self {
            submission_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            status,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, SubmissionStatus::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictionError;

    #[test]
    fn test_tier_from_cluster_label() {
        assert_eq!(Tier::from_cluster_label(0), Some(Tier::Low));
        assert_eq!(Tier::from_cluster_label(1), Some(Tier::Medium));
        assert_eq!(Tier::from_cluster_label(2), Some(Tier::High));
        assert_eq!(Tier::from_cluster_label(3), None);
    }

    #[test]
    fn test_tier_from_emission() {
        let thresholds = TierThresholds::default();
        assert_eq!(Tier::from_emission(150.0, &thresholds), Tier::Low);
        assert_eq!(Tier::from_emission(200.0, &thresholds), Tier::Medium);
        assert_eq!(Tier::from_emission(399.9, &thresholds), Tier::Medium);
        assert_eq!(Tier::from_emission(1200.0, &thresholds), Tier::High);
    }

    #[test]
    fn test_cluster_display_name() {
        assert_eq!(cluster_display_name(1, true), "Medium");
        assert_eq!(cluster_display_name(1, false), "Cluster 2");
        assert_eq!(cluster_display_name(7, true), "Cluster 8");
    }

    #[test]
    fn test_summary_accepts_training_column_names() {
        let json = r#"{"Average Carbon Emission": 2269.15, "Sample Size": 3412}"#;
        let summary: ClusterSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.average_emission, 2269.15);
        assert_eq!(summary.sample_size, 3412);
    }

    #[test]
    fn test_summary_table_integer_keys() {
        let json = r#"{"0": {"average_emission": 1500.0, "sample_size": 10}}"#;
        let table: ClusterSummaryTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.get(&0).map(|s| s.sample_size), Some(10));
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = SubmissionOutcome::from_result(&Ok(PredictionResult {
            emission_estimate: 150.0,
            cluster_label: None,
            cluster_summary: None,
            cluster_name: None,
            tier: Some(Tier::Low),
        }));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["result"]["tier"], "low");
        assert!(ok.is_ok());

        let err = SubmissionOutcome::from_result(&Err(DispatchError::Prediction(
            PredictionError::EmptyOutput("regression"),
        )));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "prediction");

        let parsed: SubmissionOutcome = serde_json::from_value(json).unwrap();
        assert!(!parsed.is_ok());
    }
}
