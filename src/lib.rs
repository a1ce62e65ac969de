//! Carbon Footprint Estimator Library
//!
//! Turns lifestyle form answers into a carbon emission estimate, an
//! optional consumption-pattern cluster with its summary, and an emission
//! tier, using pre-trained model artifacts loaded at startup.

pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod feature_extractor;
pub mod form;
pub mod metrics;
pub mod models;
pub mod presenter;
pub mod producer;
pub mod schema;
pub mod types;

pub use config::AppConfig;
pub use consumer::SubmissionConsumer;
pub use context::AppContext;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use presenter::ResultPresenter;
pub use producer::OutcomeProducer;
pub use schema::FeatureSchema;
pub use types::{PredictionResult, SubmissionOutcome, UserInput};
