//! Raw form values for one submission

use crate::error::FeatureMappingError;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A value exactly as the widget or the submitter produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Missing,
            Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Missing),
            Value::String(s) => RawValue::Text(s.clone()),
            Value::Bool(b) => RawValue::Text(b.to_string()),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// User-supplied values keyed by the schema's field names.
///
/// Entries are always in schema order and only schema fields can be set;
/// fields that were never set stay [`RawValue::Missing`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInput {
    entries: Vec<(String, RawValue)>,
}

impl UserInput {
    /// Empty input with one missing entry per schema field
    pub fn new(schema: &FeatureSchema) -> Self {
        Self {
            entries: schema
                .fields()
                .iter()
                .map(|f| (f.name.clone(), RawValue::Missing))
                .collect(),
        }
    }

    /// Build from a JSON object such as `{"Diet": "vegan", "Vehicle Monthly Distance Km": 20}`
    pub fn from_json(schema: &FeatureSchema, payload: &[u8]) -> Result<Self, FeatureMappingError> {
        let object: Map<String, Value> = serde_json::from_slice(payload)
            .map_err(|e| FeatureMappingError::MalformedPayload(e.to_string()))?;

        let mut input = Self::new(schema);
        for (name, value) in &object {
            input.set(name, RawValue::from(value))?;
        }
        Ok(input)
    }

    /// Set one field. Fails for names the schema does not declare.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<RawValue>,
    ) -> Result<(), FeatureMappingError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(field, _)| field == name)
            .ok_or_else(|| FeatureMappingError::UnknownField(name.to_string()))?;
        entry.1 = value.into();
        Ok(())
    }

    /// Builder form of [`UserInput::set`]
    pub fn with(
        mut self,
        name: &str,
        value: impl Into<RawValue>,
    ) -> Result<Self, FeatureMappingError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, RawValue)] {
        &self.entries
    }

    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }
}
