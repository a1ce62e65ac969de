//! Single-row feature table handed to the predictors

use serde::Serialize;

/// A coerced column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Text(String),
    Number(f64),
}

impl FeatureValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            FeatureValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(_) => None,
        }
    }
}

/// One named column of a [`FeatureRecord`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureColumn {
    pub name: String,
    pub value: FeatureValue,
}

/// Single-record feature table with columns in model order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureRecord {
    columns: Vec<FeatureColumn>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.columns.push(FeatureColumn {
            name: name.into(),
            value,
        });
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
