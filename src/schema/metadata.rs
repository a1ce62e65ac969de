//! Schema read from a JSON metadata document
//!
//! ```json
//! {
//!   "categorical": { "Diet": ["omnivore", "vegan"] },
//!   "numeric": { "Vehicle Monthly Distance Km": { "min": 0, "max": 9999, "default": 800 } }
//! }
//! ```

use super::{FeatureSchema, FieldSpec};
use crate::error::SchemaLoadError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    categorical: Map<String, Value>,
    #[serde(default)]
    numeric: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct NumericBounds {
    min: f64,
    max: f64,
    #[serde(default)]
    default: Option<f64>,
}

/// Loader for metadata-described schemas.
///
/// Field order follows the document: categorical keys, then numeric keys.
pub struct MetadataSchemaLoader;

impl MetadataSchemaLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FeatureSchema, SchemaLoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading schema from metadata");

        let file = File::open(path).map_err(|source| SchemaLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<FeatureSchema, SchemaLoadError> {
        let doc: MetadataDocument = serde_json::from_reader(reader)?;
        let mut fields = Vec::with_capacity(doc.categorical.len() + doc.numeric.len());

        for (name, value) in doc.categorical {
            let options: Vec<String> =
                serde_json::from_value(value).map_err(|e| SchemaLoadError::InvalidField {
                    field: name.clone(),
                    reason: format!("expected a list of strings: {}", e),
                })?;
            fields.push(FieldSpec::categorical(name, options));
        }

        for (name, value) in doc.numeric {
            let bounds: NumericBounds =
                serde_json::from_value(value).map_err(|e| SchemaLoadError::InvalidField {
                    field: name.clone(),
                    reason: format!("expected {{min, max[, default]}}: {}", e),
                })?;
            let default = bounds
                .default
                .unwrap_or((bounds.min + bounds.max) / 2.0);
            fields.push(FieldSpec::numeric(name, bounds.min, bounds.max, default));
        }

        FeatureSchema::new(fields)
    }
}
