//! Column preprocessing applied before clustering

use super::Preprocessor;
use crate::error::{ModelLoadError, PredictionError};
use crate::types::{FeatureRecord, FeatureValue};
use serde::{Deserialize, Serialize};

const MODEL: &str = "preprocessor";

/// One fitted encoding step; steps emit their outputs in declaration order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EncodingStep {
    /// `(value - mean) / scale`
    StandardScale { column: String, mean: f64, scale: f64 },
    /// One output per category; an unseen category encodes as all zeros
    OneHot {
        column: String,
        categories: Vec<String>,
    },
}

impl EncodingStep {
    fn column(&self) -> &str {
        match self {
            EncodingStep::StandardScale { column, .. } | EncodingStep::OneHot { column, .. } => {
                column
            }
        }
    }

    fn width(&self) -> usize {
        match self {
            EncodingStep::StandardScale { .. } => 1,
            EncodingStep::OneHot { categories, .. } => categories.len(),
        }
    }
}

/// Fitted column transformer: scales numeric columns and one-hot encodes
/// categorical ones into a flat vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    columns: Vec<String>,
    steps: Vec<EncodingStep>,
}

impl ColumnPreprocessor {
    pub fn new(columns: Vec<String>, steps: Vec<EncodingStep>) -> Self {
        Self { columns, steps }
    }

    /// Length of the transformed vector
    pub fn output_width(&self) -> usize {
        self.steps.iter().map(EncodingStep::width).sum()
    }

    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.steps.is_empty() {
            return Err(ModelLoadError::Inconsistent(
                "preprocessor has no encoding steps".to_string(),
            ));
        }
        for step in &self.steps {
            if !self.columns.iter().any(|c| c == step.column()) {
                return Err(ModelLoadError::Inconsistent(format!(
                    "preprocessor step for undeclared column '{}'",
                    step.column()
                )));
            }
        }
        Ok(())
    }

    fn column_value<'a>(
        &self,
        record: &'a FeatureRecord,
        column: &str,
    ) -> Result<&'a FeatureValue, PredictionError> {
        record.get(column).ok_or_else(|| PredictionError::MissingColumn {
            model: MODEL,
            column: column.to_string(),
        })
    }
}

impl Preprocessor for ColumnPreprocessor {
    fn expected_columns(&self) -> &[String] {
        &self.columns
    }

    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictionError> {
        let mut output = Vec::with_capacity(self.output_width());

        for step in &self.steps {
            let value = self.column_value(record, step.column())?;
            let type_error = || PredictionError::ColumnType {
                model: MODEL,
                column: step.column().to_string(),
            };

            match step {
                EncodingStep::StandardScale { mean, scale, .. } => {
                    let n = value.as_number().ok_or_else(type_error)?;
                    // zero-variance columns were fit with unit scale
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    output.push((n - mean) / scale);
                }
                EncodingStep::OneHot { categories, .. } => {
                    let text = value.as_text().ok_or_else(type_error)?;
                    output.extend(
                        categories
                            .iter()
                            .map(|c| if c == text { 1.0 } else { 0.0 }),
                    );
                }
            }
        }

        Ok(output)
    }
}
