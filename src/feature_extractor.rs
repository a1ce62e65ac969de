//! Form-to-record mapping for model inference.
//!
//! Turns raw form values into the single-row table the trained pipeline
//! expects: categorical fields as text, numeric fields as numbers, columns
//! in schema order.

use crate::error::FeatureMappingError;
use crate::schema::{FeatureSchema, FieldKind};
use crate::types::{FeatureRecord, FeatureValue, RawValue, UserInput};
use tracing::debug;

/// Feature extractor that maps a [`UserInput`] onto a [`FeatureRecord`].
///
/// Numeric coercion is lenient: anything that does not read as a finite
/// number becomes 0.0. Categorical values must be one of the allowed options.
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Map one submission onto a feature record
    pub fn extract(&self, input: &UserInput) -> Result<FeatureRecord, FeatureMappingError> {
        let entries = input.entries();
        let fields = self.schema.fields();

        if entries.len() != fields.len()
            || entries.iter().zip(fields).any(|((name, _), f)| *name != f.name)
        {
            return Err(FeatureMappingError::SchemaMismatch {
                expected: fields.iter().map(|f| f.name.clone()).collect(),
                actual: input.field_names(),
            });
        }

        let mut record = FeatureRecord::new();

        for (field, (_, raw)) in fields.iter().zip(entries) {
            let value = match &field.kind {
                FieldKind::Categorical { options } => {
                    let text = categorical_text(raw)
                        .ok_or_else(|| FeatureMappingError::MissingField(field.name.clone()))?;
                    if !options.iter().any(|o| *o == text) {
                        return Err(FeatureMappingError::UnknownCategory {
                            field: field.name.clone(),
                            value: text,
                        });
                    }
                    FeatureValue::Text(text)
                }
                FieldKind::Numeric { .. } => {
                    let number = numeric_value(raw).unwrap_or_else(|| {
                        debug!(field = %field.name, raw = ?raw, "Numeric coercion failed, using 0");
                        0.0
                    });
                    FeatureValue::Number(number)
                }
            };
            record.push(field.name.clone(), value);
        }

        Ok(record)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Get feature names in column order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.schema.field_names()
    }
}

/// Text form of a categorical value; numbers use their shortest decimal form
fn categorical_text(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::Text(s) => Some(s.trim().to_string()),
        RawValue::Number(n) => Some(n.to_string()),
        RawValue::Missing => None,
    }
}

fn numeric_value(raw: &RawValue) -> Option<f64> {
    let n = match raw {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        RawValue::Missing => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{diet_distance_schema, FieldSpec};

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(diet_distance_schema())
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = extractor();
        let input = UserInput::new(extractor.schema())
            .with("Diet", "Vegan")
            .unwrap()
            .with("DistanceKm", 20.0)
            .unwrap();

        let record = extractor.extract(&input).unwrap();

        assert_eq!(record.column_names(), vec!["Diet", "DistanceKm"]);
        assert_eq!(record.get("Diet"), Some(&FeatureValue::Text("Vegan".to_string())));
        assert_eq!(record.get("DistanceKm"), Some(&FeatureValue::Number(20.0)));
    }

    #[test]
    fn test_feature_count() {
        let extractor = extractor();
        assert_eq!(extractor.feature_count(), 2);
        assert_eq!(extractor.feature_names(), vec!["Diet", "DistanceKm"]);
    }

    #[test]
    fn test_numeric_coercion_failures_become_zero() {
        let extractor = extractor();
        for raw in [
            RawValue::Text("".to_string()),
            RawValue::Text("twenty".to_string()),
            RawValue::Text("NaN".to_string()),
            RawValue::Number(f64::INFINITY),
            RawValue::Missing,
        ] {
            let input = UserInput::new(extractor.schema())
                .with("Diet", "Omnivore")
                .unwrap()
                .with("DistanceKm", raw.clone())
                .unwrap();
            let record = extractor.extract(&input).unwrap();
            assert_eq!(
                record.get("DistanceKm"),
                Some(&FeatureValue::Number(0.0)),
                "raw value {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        let extractor = extractor();
        let input = UserInput::new(extractor.schema())
            .with("Diet", "Omnivore")
            .unwrap()
            .with("DistanceKm", " 42.5 ")
            .unwrap();
        let record = extractor.extract(&input).unwrap();
        assert_eq!(record.get("DistanceKm"), Some(&FeatureValue::Number(42.5)));
    }

    #[test]
    fn test_out_of_range_number_is_not_clamped() {
        let extractor = extractor();
        let input = UserInput::new(extractor.schema())
            .with("Diet", "Omnivore")
            .unwrap()
            .with("DistanceKm", 250.0)
            .unwrap();
        let record = extractor.extract(&input).unwrap();
        assert_eq!(record.get("DistanceKm"), Some(&FeatureValue::Number(250.0)));
    }

    #[test]
    fn test_categorical_number_becomes_text() {
        let schema = FeatureSchema::new(vec![FieldSpec::categorical(
            "Household Size",
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        )])
        .unwrap();
        let extractor = FeatureExtractor::new(schema);
        let input = UserInput::new(extractor.schema())
            .with("Household Size", 3.0)
            .unwrap();

        let record = extractor.extract(&input).unwrap();
        assert_eq!(
            record.get("Household Size"),
            Some(&FeatureValue::Text("3".to_string()))
        );
    }

    #[test]
    fn test_unknown_category_rejected() {
        let extractor = extractor();
        let input = UserInput::new(extractor.schema())
            .with("Diet", "Carnivore")
            .unwrap();
        let err = extractor.extract(&input).unwrap_err();
        assert_eq!(
            err,
            FeatureMappingError::UnknownCategory {
                field: "Diet".to_string(),
                value: "Carnivore".to_string()
            }
        );
    }

    #[test]
    fn test_missing_categorical_rejected() {
        let extractor = extractor();
        let input = UserInput::new(extractor.schema())
            .with("DistanceKm", 10.0)
            .unwrap();
        assert_eq!(
            extractor.extract(&input).unwrap_err(),
            FeatureMappingError::MissingField("Diet".to_string())
        );
    }

    #[test]
    fn test_input_from_other_schema_rejected() {
        let extractor = extractor();
        let other = FeatureSchema::new(vec![FieldSpec::numeric("DistanceKm", 0.0, 1.0, 0.5)])
            .unwrap();
        let input = UserInput::new(&other);
        assert!(matches!(
            extractor.extract(&input),
            Err(FeatureMappingError::SchemaMismatch { .. })
        ));
    }
}
