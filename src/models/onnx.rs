//! ONNX-exported model artifacts
//!
//! Expected directory layout:
//!
//! - `regression.onnx`: one input per feature column, first output is the estimate
//! - `preprocessor.onnx` (optional): one input per column, first output is the
//!   transformed float vector
//! - `clustering.onnx` (optional): float input, `label` output
//! - `cluster_summary.json` (optional): cluster label to summary

use super::{Clusterer, ModelBundle, Preprocessor, Regressor};
use crate::error::{ModelLoadError, PredictionError};
use crate::types::{ClusterSummaryTable, FeatureRecord, FeatureValue};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputValue};
use ort::value::Tensor;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Loaded ONNX graph with its input/output names
struct LoadedModel {
    name: &'static str,
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_name: String,
}

impl LoadedModel {
    fn runtime_error(&self, e: impl std::fmt::Display) -> PredictionError {
        PredictionError::Runtime {
            model: self.name,
            message: e.to_string(),
        }
    }

    /// Feed every record column to the input of the same name
    fn record_inputs(
        &self,
        record: &FeatureRecord,
    ) -> Result<Vec<(String, SessionInputValue<'static>)>, PredictionError> {
        let mut inputs = Vec::with_capacity(self.input_names.len());

        for name in &self.input_names {
            let value = record
                .get(name)
                .ok_or_else(|| PredictionError::MissingColumn {
                    model: self.name,
                    column: name.clone(),
                })?;

            let tensor = match value {
                FeatureValue::Number(n) => Tensor::from_array((vec![1_i64, 1], vec![*n as f32]))
                    .map_err(|e| self.runtime_error(e))?
                    .into_dyn(),
                FeatureValue::Text(s) => {
                    Tensor::from_string_array((vec![1_i64, 1], vec![s.clone()]))
                        .map_err(|e| self.runtime_error(e))?
                        .into_dyn()
                }
            };
            inputs.push((name.clone(), SessionInputValue::from(tensor)));
        }

        Ok(inputs)
    }

    fn run_f32(
        &self,
        inputs: Vec<(String, SessionInputValue<'static>)>,
    ) -> Result<Vec<f64>, PredictionError> {
        let mut session = self.session.lock().map_err(|e| self.runtime_error(e))?;
        let outputs = session.run(inputs).map_err(|e| self.runtime_error(e))?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or(PredictionError::EmptyOutput(self.name))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| self.runtime_error(e))?;
        Ok(data.iter().map(|&v| v as f64).collect())
    }
}

/// Regression graph
pub struct OnnxRegressor(LoadedModel);

impl Regressor for OnnxRegressor {
    fn expected_columns(&self) -> &[String] {
        &self.0.input_names
    }

    fn predict(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictionError> {
        let inputs = self.0.record_inputs(record)?;
        self.0.run_f32(inputs)
    }
}

/// Column transformer graph
pub struct OnnxPreprocessor(LoadedModel);

impl Preprocessor for OnnxPreprocessor {
    fn expected_columns(&self) -> &[String] {
        &self.0.input_names
    }

    fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictionError> {
        let inputs = self.0.record_inputs(record)?;
        self.0.run_f32(inputs)
    }
}

/// K-means graph
pub struct OnnxClusterer(LoadedModel);

impl Clusterer for OnnxClusterer {
    fn predict(&self, transformed: &[f64]) -> Result<Vec<u32>, PredictionError> {
        let model = &self.0;
        let input_name = model
            .input_names
            .first()
            .cloned()
            .ok_or(PredictionError::EmptyOutput(model.name))?;

        let data: Vec<f32> = transformed.iter().map(|&v| v as f32).collect();
        let tensor = Tensor::from_array((vec![1_i64, data.len() as i64], data))
            .map_err(|e| model.runtime_error(e))?;

        let mut session = model.session.lock().map_err(|e| model.runtime_error(e))?;
        let outputs = session
            .run(vec![(input_name, SessionInputValue::from(tensor.into_dyn()))])
            .map_err(|e| model.runtime_error(e))?;
        let output = outputs
            .get(model.output_name.as_str())
            .ok_or(PredictionError::EmptyOutput(model.name))?;
        let (_, labels) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| model.runtime_error(e))?;

        labels
            .iter()
            .map(|&label| u32::try_from(label).map_err(|e| model.runtime_error(e)))
            .collect()
    }
}

/// Loader for ONNX model directories
pub struct OnnxModelLoader {
    onnx_threads: usize,
}

fn onnx_error(e: impl std::fmt::Display) -> ModelLoadError {
    ModelLoadError::Onnx(e.to_string())
}

impl OnnxModelLoader {
    pub fn new(onnx_threads: usize) -> Result<Self, ModelLoadError> {
        info!(onnx_threads = onnx_threads, "ONNX model loader initialized");
        Ok(Self { onnx_threads })
    }

    fn load_model(
        &self,
        path: &Path,
        name: &'static str,
        output_hint: &str,
    ) -> Result<LoadedModel, ModelLoadError> {
        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(onnx_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(onnx_error)?
            .with_intra_threads(self.onnx_threads)
            .map_err(onnx_error)?
            .commit_from_file(path)
            .map_err(|e| ModelLoadError::Onnx(format!("{}: {}", path.display(), e)))?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        if input_names.is_empty() {
            return Err(ModelLoadError::Inconsistent(format!("{} has no inputs", name)));
        }

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains(output_hint))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelLoadError::Inconsistent(format!("{} has no outputs", name)))?;

        info!(
            model = %name,
            inputs = input_names.len(),
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            session: Mutex::new(session),
            input_names,
            output_name,
        })
    }

    /// Load every artifact found in `models_dir`; only the regression graph is required
    pub fn load_bundle<P: AsRef<Path>>(&self, models_dir: P) -> Result<ModelBundle, ModelLoadError> {
        let models_dir = models_dir.as_ref();

        let regression = self.load_model(&models_dir.join("regression.onnx"), "regression", "variable")?;

        let optional = |file: &str, name: &'static str, hint: &str| {
            let path = models_dir.join(file);
            if path.exists() {
                self.load_model(&path, name, hint).map(Some)
            } else {
                warn!(model = %name, path = %path.display(), "Model file not found");
                Ok(None)
            }
        };
        let preprocessor = optional("preprocessor.onnx", "preprocessor", "variable")?;
        let clustering = optional("clustering.onnx", "clustering", "label")?;

        let summary_path = models_dir.join("cluster_summary.json");
        let cluster_summary: ClusterSummaryTable = if summary_path.exists() {
            let file = File::open(&summary_path).map_err(|source| ModelLoadError::Io {
                path: summary_path.clone(),
                source,
            })?;
            serde_json::from_reader(BufReader::new(file))?
        } else {
            ClusterSummaryTable::new()
        };

        info!(
            clustering = preprocessor.is_some() && clustering.is_some(),
            summaries = cluster_summary.len(),
            "Loaded ONNX models from {}",
            models_dir.display()
        );

        Ok(ModelBundle {
            regression: Box::new(OnnxRegressor(regression)),
            preprocessor: preprocessor.map(|m| Box::new(OnnxPreprocessor(m)) as Box<dyn Preprocessor>),
            clustering: clustering.map(|m| Box::new(OnnxClusterer(m)) as Box<dyn Clusterer>),
            cluster_summary,
        })
    }
}
