//! Type definitions for form submissions and predictions

pub mod input;
pub mod prediction;
pub mod record;

pub use input::{RawValue, UserInput};
pub use prediction::{
    cluster_display_name, ClusterSummary, ClusterSummaryTable, PredictionResult,
    SubmissionOutcome, SubmissionStatus, Tier, TierThresholds,
};
pub use record::{FeatureColumn, FeatureRecord, FeatureValue};
