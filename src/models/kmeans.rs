//! Nearest-centroid cluster assignment with fitted k-means centroids

use super::Clusterer;
use crate::error::{ModelLoadError, PredictionError};
use serde::{Deserialize, Serialize};

const MODEL: &str = "kmeans";

/// Fitted k-means model; label `i` is the row index of centroid `i`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansClusterer {
    centroids: Vec<Vec<f64>>,
}

impl KMeansClusterer {
    pub fn new(centroids: Vec<Vec<f64>>) -> Self {
        Self { centroids }
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Width of every centroid
    pub fn n_features(&self) -> usize {
        self.centroids.first().map(Vec::len).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.centroids.is_empty() || self.n_features() == 0 {
            return Err(ModelLoadError::Inconsistent(
                "k-means model has no centroids".to_string(),
            ));
        }
        if self.centroids.iter().any(|c| c.len() != self.n_features()) {
            return Err(ModelLoadError::Inconsistent(
                "k-means centroids have different widths".to_string(),
            ));
        }
        Ok(())
    }
}

impl Clusterer for KMeansClusterer {
    fn predict(&self, transformed: &[f64]) -> Result<Vec<u32>, PredictionError> {
        if transformed.len() != self.n_features() {
            return Err(PredictionError::DimensionMismatch {
                model: MODEL,
                expected: self.n_features(),
                actual: transformed.len(),
            });
        }

        let nearest = self
            .centroids
            .iter()
            .map(|centroid| {
                centroid
                    .iter()
                    .zip(transformed)
                    .map(|(c, x)| (c - x).powi(2))
                    .sum::<f64>()
            })
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index)
            .ok_or(PredictionError::EmptyOutput(MODEL))?;

        let label = u32::try_from(nearest).map_err(|_| PredictionError::Runtime {
            model: MODEL,
            message: format!("cluster index {} out of range", nearest),
        })?;

        Ok(vec![label])
    }
}
