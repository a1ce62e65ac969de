//! Linear regression over numeric and one-hot encoded categorical columns

use super::Regressor;
use crate::error::{ModelLoadError, PredictionError};
use crate::types::{FeatureRecord, FeatureValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MODEL: &str = "regression";

/// Fitted linear model.
///
/// Numeric columns contribute `coefficient * value`; categorical columns
/// contribute the coefficient of the observed category, or nothing for a
/// category unseen during fitting. Columns with no coefficient are still
/// required in the record but do not contribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    columns: Vec<String>,
    intercept: f64,
    #[serde(default)]
    numeric: BTreeMap<String, f64>,
    #[serde(default)]
    categorical: BTreeMap<String, BTreeMap<String, f64>>,
}

impl LinearRegressor {
    pub fn new(columns: Vec<String>, intercept: f64) -> Self {
        Self {
            columns,
            intercept,
            numeric: BTreeMap::new(),
            categorical: BTreeMap::new(),
        }
    }

    pub fn with_numeric(mut self, column: &str, coefficient: f64) -> Self {
        self.numeric.insert(column.to_string(), coefficient);
        self
    }

    pub fn with_category(mut self, column: &str, category: &str, coefficient: f64) -> Self {
        self.categorical
            .entry(column.to_string())
            .or_default()
            .insert(category.to_string(), coefficient);
        self
    }

    /// Check that every coefficient refers to a declared column, once
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.columns.is_empty() {
            return Err(ModelLoadError::Inconsistent(
                "regression model declares no columns".to_string(),
            ));
        }
        for column in self.numeric.keys().chain(self.categorical.keys()) {
            if !self.columns.contains(column) {
                return Err(ModelLoadError::Inconsistent(format!(
                    "regression coefficient for undeclared column '{}'",
                    column
                )));
            }
        }
        if let Some(column) = self.numeric.keys().find(|c| self.categorical.contains_key(*c)) {
            return Err(ModelLoadError::Inconsistent(format!(
                "column '{}' is both numeric and categorical",
                column
            )));
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn expected_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictionError> {
        let mut estimate = self.intercept;

        for column in &self.columns {
            let value = record
                .get(column)
                .ok_or_else(|| PredictionError::MissingColumn {
                    model: MODEL,
                    column: column.clone(),
                })?;

            if let Some(coef) = self.numeric.get(column) {
                match value {
                    FeatureValue::Number(n) => estimate += coef * n,
                    FeatureValue::Text(_) => {
                        return Err(PredictionError::ColumnType {
                            model: MODEL,
                            column: column.clone(),
                        })
                    }
                }
            } else if let Some(categories) = self.categorical.get(column) {
                match value {
                    FeatureValue::Text(category) => {
                        estimate += categories.get(category).copied().unwrap_or(0.0)
                    }
                    FeatureValue::Number(_) => {
                        return Err(PredictionError::ColumnType {
                            model: MODEL,
                            column: column.clone(),
                        })
                    }
                }
            }
        }

        Ok(vec![estimate])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinearRegressor {
        LinearRegressor::new(vec!["Diet".to_string(), "DistanceKm".to_string()], 100.0)
            .with_category("Diet", "Omnivore", 80.0)
            .with_category("Diet", "Vegan", 10.0)
            .with_numeric("DistanceKm", 2.0)
    }

    fn record(diet: &str, km: f64) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        record.push("Diet", FeatureValue::Text(diet.to_string()));
        record.push("DistanceKm", FeatureValue::Number(km));
        record
    }

    #[test]
    fn test_linear_prediction() {
        let prediction = model().predict(&record("Vegan", 20.0)).unwrap();
        assert_eq!(prediction, vec![150.0]);
    }

    #[test]
    fn test_unseen_category_contributes_nothing() {
        let prediction = model().predict(&record("Pescatarian", 0.0)).unwrap();
        assert_eq!(prediction, vec![100.0]);
    }

    #[test]
    fn test_wrong_column_type() {
        let mut bad = FeatureRecord::new();
        bad.push("Diet", FeatureValue::Text("Vegan".to_string()));
        bad.push("DistanceKm", FeatureValue::Text("20".to_string()));

        assert_eq!(
            model().predict(&bad).unwrap_err(),
            PredictionError::ColumnType {
                model: "regression",
                column: "DistanceKm".to_string()
            }
        );
    }

    #[test]
    fn test_missing_column() {
        let mut partial = FeatureRecord::new();
        partial.push("Diet", FeatureValue::Text("Vegan".to_string()));
        assert!(matches!(
            model().predict(&partial),
            Err(PredictionError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_undeclared_coefficient() {
        let model = LinearRegressor::new(vec!["Diet".to_string()], 0.0).with_numeric("Km", 1.0);
        assert!(model.validate().is_err());
        assert!(self::model().validate().is_ok());
    }
}
