//! Submission statistics for the estimator.

use crate::types::PredictionResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for form and service submissions
pub struct SubmissionMetrics {
    /// Submissions that produced a prediction
    pub submissions_succeeded: AtomicU64,
    /// Submissions rejected or failed
    pub submissions_failed: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// Predictions by tier (or "none")
    predictions_by_tier: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Sum of all emission estimates, for the mean
    emission_total: RwLock<f64>,
    start_time: Instant,
}

impl SubmissionMetrics {
    pub fn new() -> Self {
        Self {
            submissions_succeeded: AtomicU64::new(0),
            submissions_failed: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            predictions_by_tier: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            emission_total: RwLock::new(0.0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful submission
    pub fn record_success(&self, processing_time: Duration, result: &PredictionResult) {
        self.submissions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        let tier = result
            .tier
            .map(|t| t.as_str().to_lowercase())
            .unwrap_or_else(|| "none".to_string());
        if let Ok(mut by_tier) = self.predictions_by_tier.write() {
            *by_tier.entry(tier).or_insert(0) += 1;
        }
        if let Ok(mut total) = self.emission_total.write() {
            *total += result.emission_estimate;
        }
    }

    /// Record a failed submission
    pub fn record_failure(&self, processing_time: Duration, kind: &str) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.submissions_succeeded.load(Ordering::Relaxed)
            + self.submissions_failed.load(Ordering::Relaxed)
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => {
                let mut sorted = times.clone();
                sorted.sort_unstable();
                sorted
            }
            _ => return ProcessingStats::default(),
        };

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            max_us: sorted[count - 1],
        }
    }

    /// Mean emission over successful submissions
    pub fn mean_emission(&self) -> f64 {
        let succeeded = self.submissions_succeeded.load(Ordering::Relaxed);
        if succeeded == 0 {
            return 0.0;
        }
        self.emission_total.read().map(|t| *t).unwrap_or(0.0) / succeeded as f64
    }

    pub fn get_failures_by_kind(&self) -> HashMap<String, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_predictions_by_tier(&self) -> HashMap<String, u64> {
        self.predictions_by_tier
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let succeeded = self.submissions_succeeded.load(Ordering::Relaxed);
        let failed = self.submissions_failed.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            succeeded,
            failed,
            uptime_secs = self.start_time.elapsed().as_secs(),
            mean_emission = format!("{:.2}", self.mean_emission()),
            "Submission summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            max_us = processing.max_us,
            "Processing time"
        );
        for (tier, count) in &self.get_predictions_by_tier() {
            info!(tier = %tier, count, "Predictions by tier");
        }
        for (kind, count) in &self.get_failures_by_kind() {
            info!(kind = %kind, count, "Failures by kind");
        }
    }
}

impl Default for SubmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, PartialEq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}

/// Periodic summary logger for service mode
pub struct MetricsReporter {
    metrics: Arc<SubmissionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<SubmissionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if self.metrics.total() > 0 {
                self.metrics.print_summary();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tier;

    fn result(emission: f64, tier: Option<Tier>) -> PredictionResult {
        PredictionResult {
            emission_estimate: emission,
            cluster_label: None,
            cluster_summary: None,
            cluster_name: None,
            tier,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = SubmissionMetrics::new();

        metrics.record_success(Duration::from_micros(100), &result(100.0, Some(Tier::Low)));
        metrics.record_success(Duration::from_micros(300), &result(300.0, None));
        metrics.record_failure(Duration::from_micros(200), "feature_mapping");

        assert_eq!(metrics.submissions_succeeded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.submissions_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total(), 3);
        assert_eq!(metrics.mean_emission(), 200.0);
        assert_eq!(metrics.get_predictions_by_tier().get("low"), Some(&1));
        assert_eq!(metrics.get_predictions_by_tier().get("none"), Some(&1));
        assert_eq!(metrics.get_failures_by_kind().get("feature_mapping"), Some(&1));
    }

    #[test]
    fn test_processing_stats() {
        let metrics = SubmissionMetrics::new();
        assert_eq!(metrics.get_processing_stats(), ProcessingStats::default());

        for us in [100, 200, 300, 400] {
            metrics.record_failure(Duration::from_micros(us), "prediction");
        }
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }
}
