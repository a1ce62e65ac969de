//! Input field schema
//!
//! The schema lists every field the form asks for, in the order the trained
//! pipeline expects its columns. It is derived either from a reference
//! dataset or from a metadata document, and is read-only once loaded.

pub mod dataset;
pub mod metadata;

use crate::error::SchemaLoadError;
use serde::Serialize;
use std::path::Path;

pub use dataset::DatasetSchemaLoader;
pub use metadata::MetadataSchemaLoader;

/// Kind of a single input field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    /// Enumerated text values
    Categorical { options: Vec<String> },
    /// Bounded number with a default
    Numeric { min: f64, max: f64, default: f64 },
}

/// A named input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn categorical(name: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Categorical { options },
        }
    }

    pub fn numeric(name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric { min, max, default },
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FieldKind::Categorical { .. })
    }
}

/// Ordered set of input fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    fields: Vec<FieldSpec>,
}

impl FeatureSchema {
    /// Build a schema from fields in column order.
    ///
    /// Field names must be unique and at least one field is required.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaLoadError> {
        if fields.is_empty() {
            return Err(SchemaLoadError::NoFields);
        }

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaLoadError::InvalidField {
                    field: field.name.clone(),
                    reason: "declared more than once".to_string(),
                });
            }
            match &field.kind {
                FieldKind::Categorical { options } if options.is_empty() => {
                    return Err(SchemaLoadError::InvalidField {
                        field: field.name.clone(),
                        reason: "no allowed values".to_string(),
                    });
                }
                FieldKind::Numeric { min, max, default }
                    if !(min.is_finite() && max.is_finite() && default.is_finite()) =>
                {
                    return Err(SchemaLoadError::InvalidField {
                        field: field.name.clone(),
                        reason: "bounds and default must be finite".to_string(),
                    });
                }
                FieldKind::Numeric { min, max, .. } if min > max => {
                    return Err(SchemaLoadError::InvalidField {
                        field: field.name.clone(),
                        reason: format!("min {} is greater than max {}", min, max),
                    });
                }
                FieldKind::Numeric { min, max, default } if default < min || default > max => {
                    return Err(SchemaLoadError::InvalidField {
                        field: field.name.clone(),
                        reason: format!("default {} is outside [{}, {}]", default, min, max),
                    });
                }
                _ => {}
            }
        }

        Ok(Self { fields })
    }

    /// Derive the schema from a reference CSV dataset.
    pub fn from_dataset<P: AsRef<Path>>(
        path: P,
        target_column: &str,
    ) -> Result<Self, SchemaLoadError> {
        DatasetSchemaLoader::new(target_column).load(path)
    }

    /// Read the schema from a JSON metadata document.
    pub fn from_metadata<P: AsRef<Path>>(path: P) -> Result<Self, SchemaLoadError> {
        MetadataSchemaLoader::load(path)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn categorical_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_categorical())
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.is_categorical())
    }
}

#[cfg(test)]
pub(crate) fn diet_distance_schema() -> FeatureSchema {
    FeatureSchema::new(vec![
        FieldSpec::categorical("Diet", vec!["Omnivore".to_string(), "Vegan".to_string()]),
        FieldSpec::numeric("DistanceKm", 0.0, 100.0, 50.0),
    ])
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = diet_distance_schema();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.field_names(), vec!["Diet", "DistanceKm"]);
        assert_eq!(schema.position("DistanceKm"), Some(1));
        assert!(schema.field("Diet").unwrap().is_categorical());
        assert_eq!(schema.categorical_fields().count(), 1);
        assert_eq!(schema.numeric_fields().count(), 1);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = FeatureSchema::new(vec![
            FieldSpec::numeric("Km", 0.0, 1.0, 0.5),
            FieldSpec::numeric("Km", 0.0, 1.0, 0.5),
        ]);
        assert!(matches!(result, Err(SchemaLoadError::InvalidField { .. })));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(matches!(
            FeatureSchema::new(Vec::new()),
            Err(SchemaLoadError::NoFields)
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = FeatureSchema::new(vec![FieldSpec::numeric("Km", 10.0, 1.0, 5.0)]);
        assert!(matches!(result, Err(SchemaLoadError::InvalidField { .. })));
    }

    #[test]
    fn test_default_outside_bounds_rejected() {
        let result = FeatureSchema::new(vec![FieldSpec::numeric("Km", 0.0, 100.0, 500.0)]);
        assert!(matches!(
            result,
            Err(SchemaLoadError::InvalidField { ref field, .. }) if field == "Km"
        ));

        let result = FeatureSchema::new(vec![FieldSpec::numeric("Km", 0.0, 100.0, -1.0)]);
        assert!(matches!(result, Err(SchemaLoadError::InvalidField { .. })));

        let result = FeatureSchema::new(vec![FieldSpec::numeric("Km", 0.0, f64::INFINITY, 5.0)]);
        assert!(matches!(result, Err(SchemaLoadError::InvalidField { .. })));

        assert!(FeatureSchema::new(vec![FieldSpec::numeric("Km", 0.0, 100.0, 100.0)]).is_ok());
    }
}
