//! Application context: everything loaded once at startup

use crate::config::{AppConfig, SchemaConfig, SchemaSource};
use crate::error::{DispatchError, SchemaLoadError};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::SubmissionMetrics;
use crate::models::inference::InferenceEngine;
use crate::presenter::ResultPresenter;
use crate::schema::FeatureSchema;
use crate::types::{PredictionResult, SubmissionOutcome, UserInput};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Schema, models, presenter and metrics shared by every submission
pub struct AppContext {
    extractor: FeatureExtractor,
    engine: InferenceEngine,
    presenter: ResultPresenter,
    metrics: Arc<SubmissionMetrics>,
}

/// Load the field schema from the configured source
pub fn load_schema(config: &SchemaConfig) -> Result<FeatureSchema, SchemaLoadError> {
    match config.source {
        SchemaSource::Dataset => {
            FeatureSchema::from_dataset(&config.dataset_path, &config.target_column)
        }
        SchemaSource::Metadata => FeatureSchema::from_metadata(&config.metadata_path),
    }
}

impl AppContext {
    /// Load schema and models, failing fast if either is unusable
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let schema = load_schema(&config.schema).context("Failed to load input schema")?;
        info!(
            source = ?config.schema.source,
            fields = schema.len(),
            categorical = schema.categorical_fields().count(),
            numeric = schema.numeric_fields().count(),
            "Input schema loaded"
        );

        let engine = InferenceEngine::new(config)?;
        let presenter = ResultPresenter::new(&config.presentation);

        Ok(Self::new(schema, engine, presenter))
    }

    /// Assemble a context from already loaded parts
    pub fn new(schema: FeatureSchema, engine: InferenceEngine, presenter: ResultPresenter) -> Self {
        let extractor = FeatureExtractor::new(schema);
        let field_names = extractor.feature_names();
        if engine.expected_columns().iter().map(String::as_str).ne(field_names.iter().copied()) {
            warn!(
                schema = ?field_names,
                model = ?engine.expected_columns(),
                "Schema fields do not match the model columns, submissions will be rejected"
            );
        }
        info!(
            features = extractor.feature_count(),
            clustering = engine.has_clustering(),
            policy = ?engine.policy(),
            "Application context assembled"
        );

        Self {
            extractor,
            engine,
            presenter,
            metrics: Arc::new(SubmissionMetrics::new()),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.extractor.schema()
    }

    pub fn presenter(&self) -> &ResultPresenter {
        &self.presenter
    }

    pub fn metrics(&self) -> Arc<SubmissionMetrics> {
        self.metrics.clone()
    }

    /// Map, predict and record one submission
    pub fn submit(&self, input: &UserInput) -> Result<PredictionResult, DispatchError> {
        let start_time = Instant::now();

        let result = self
            .extractor
            .extract(input)
            .map_err(DispatchError::from)
            .and_then(|record| self.engine.predict(&record));

        let processing_time = start_time.elapsed();
        match &result {
            Ok(prediction) => {
                self.metrics.record_success(processing_time, prediction);
                debug!(
                    emission = prediction.emission_estimate,
                    cluster = ?prediction.cluster_label,
                    processing_time_us = processing_time.as_micros(),
                    "Submission processed"
                );
            }
            Err(e) => {
                self.metrics.record_failure(processing_time, e.kind());
                warn!(kind = e.kind(), error = %e, "Submission rejected");
            }
        }

        result
    }

    /// Decode a JSON submission and wrap the result in a reply envelope
    pub fn submit_json(&self, payload: &[u8]) -> SubmissionOutcome {
        let start_time = Instant::now();
        let result = match UserInput::from_json(self.schema(), payload) {
            Ok(input) => self.submit(&input),
            Err(e) => {
                let e = DispatchError::from(e);
                self.metrics.record_failure(start_time.elapsed(), e.kind());
                warn!(kind = e.kind(), error = %e, "Malformed submission");
                Err(e)
            }
        };
        SubmissionOutcome::from_result(&result)
    }
}
