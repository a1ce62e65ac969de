//! Schema derivation from a reference CSV dataset

use super::{FeatureSchema, FieldSpec};
use crate::error::SchemaLoadError;
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Derives a [`FeatureSchema`] from the columns of a dataset.
///
/// A column holding at least one non-empty value that does not parse as a
/// number is categorical; every other column except the target is numeric.
/// Categorical columns come first, then numeric ones, each in dataset order.
pub struct DatasetSchemaLoader {
    target_column: String,
}

/// Per-column accumulator while scanning rows
#[derive(Default)]
struct ColumnScan {
    distinct: Vec<String>,
    numbers: Vec<f64>,
    non_numeric: bool,
}

impl ColumnScan {
    fn observe(&mut self, raw: &str) {
        let value = raw.trim();
        if value.is_empty() {
            return;
        }

        match value.parse::<f64>() {
            Ok(n) if n.is_finite() => self.numbers.push(n),
            Ok(_) => {}
            Err(_) => self.non_numeric = true,
        }

        if !self.distinct.iter().any(|v| v == value) {
            self.distinct.push(value.to_string());
        }
    }

    fn numeric_stats(&self) -> (f64, f64, f64) {
        if self.numbers.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let min = self.numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = self.numbers.iter().sum::<f64>() / self.numbers.len() as f64;
        (min, max, mean)
    }
}

impl DatasetSchemaLoader {
    pub fn new(target_column: &str) -> Self {
        Self {
            target_column: target_column.to_string(),
        }
    }

    /// Load the dataset at `path` and derive its schema
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<FeatureSchema, SchemaLoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), target = %self.target_column, "Deriving schema from dataset");

        let file = File::open(path).map_err(|source| SchemaLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_reader(file)
    }

    /// Derive the schema from CSV content with a header row
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<FeatureSchema, SchemaLoadError> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let mut scans: Vec<ColumnScan> = headers.iter().map(|_| ColumnScan::default()).collect();
        let mut rows = 0usize;

        for result in rdr.records() {
            let record = result?;
            for (scan, value) in scans.iter_mut().zip(record.iter()) {
                scan.observe(value);
            }
            rows += 1;
        }

        if rows == 0 {
            return Err(SchemaLoadError::EmptyDataset);
        }

        let mut categorical = Vec::new();
        let mut numeric = Vec::new();

        for (name, scan) in headers.into_iter().zip(scans) {
            if name == self.target_column {
                continue;
            }
            if scan.non_numeric {
                categorical.push(FieldSpec::categorical(name, scan.distinct));
            } else {
                let (min, max, mean) = scan.numeric_stats();
                numeric.push(FieldSpec::numeric(name, min, max, mean));
            }
        }

        debug!(
            rows,
            categorical = categorical.len(),
            numeric = numeric.len(),
            "Dataset scanned"
        );

        categorical.extend(numeric);
        FeatureSchema::new(categorical)
    }
}
