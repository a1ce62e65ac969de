//! Test Submission Sender
//!
//! Generates random form submissions that follow the configured schema and
//! sends them to the estimator service as NATS requests.

use carbon_footprint_estimator::config::AppConfig;
use carbon_footprint_estimator::context::load_schema;
use carbon_footprint_estimator::schema::{FeatureSchema, FieldKind};
use carbon_footprint_estimator::types::{SubmissionOutcome, SubmissionStatus};
use rand::Rng;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Random submission generator for a schema
struct SubmissionGenerator<'a> {
    schema: &'a FeatureSchema,
    rng: rand::rngs::ThreadRng,
}

impl<'a> SubmissionGenerator<'a> {
    fn new(schema: &'a FeatureSchema) -> Self {
        Self {
            schema,
            rng: rand::thread_rng(),
        }
    }

    /// Every field filled with an allowed value
    fn generate_valid(&mut self) -> Map<String, Value> {
        let mut submission = Map::new();
        for field in self.schema.fields() {
            let value = match &field.kind {
                FieldKind::Categorical { options } => {
                    Value::from(options[self.rng.gen_range(0..options.len())].clone())
                }
                FieldKind::Numeric { min, max, .. } => {
                    let value = if max > min {
                        self.rng.gen_range(*min..=*max)
                    } else {
                        *min
                    };
                    Value::from((value * 100.0).round() / 100.0)
                }
            };
            submission.insert(field.name.clone(), value);
        }
        submission
    }

    /// A valid submission with one categorical answer the schema does not allow
    fn generate_invalid(&mut self) -> Map<String, Value> {
        let mut submission = self.generate_valid();
        if let Some(field) = self.schema.categorical_fields().next() {
            submission.insert(field.name.clone(), Value::from("not-an-option"));
        }
        submission
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_submitter=info".parse()?),
        )
        .init();

    info!("Starting Test Submission Sender");

    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).map(|s| s.as_str()).unwrap_or("config/config.toml");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let invalid_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    let config = AppConfig::load_from_path(config_path)?;
    let schema = load_schema(&config.schema)?;
    let subject = config.frontend.submission_subject.clone();

    info!(
        nats_url = %config.frontend.nats_url,
        subject = %subject,
        fields = schema.len(),
        count = count,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(&config.frontend.nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&schema, count, delay_ms).await;
        }
    };

    let mut generator = SubmissionGenerator::new(&schema);
    let mut rng = rand::thread_rng();
    let (mut succeeded, mut failed) = (0u64, 0u64);

    for i in 0..count {
        let submission = if rng.gen_bool(invalid_rate.clamp(0.0, 1.0)) {
            generator.generate_invalid()
        } else {
            generator.generate_valid()
        };
        let payload = serde_json::to_vec(&submission)?;

        let reply = match client.request(subject.clone(), payload.into()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Request failed");
                failed += 1;
                continue;
            }
        };

        match serde_json::from_slice::<SubmissionOutcome>(&reply.payload)?.status {
            SubmissionStatus::Ok { result } => {
                succeeded += 1;
                info!(
                    submission = i + 1,
                    emission = format!("{:.2}", result.emission_estimate),
                    cluster = ?result.cluster_name,
                    tier = ?result.tier,
                    "Prediction received"
                );
            }
            SubmissionStatus::Error { kind, message } => {
                failed += 1;
                info!(submission = i + 1, kind = %kind, message = %message, "Submission rejected");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} submissions ({} predicted, {} rejected)",
        count, succeeded, failed
    );

    Ok(())
}

async fn run_dry_mode(schema: &FeatureSchema, count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = SubmissionGenerator::new(schema);

    for i in 0..count {
        let json = serde_json::to_string_pretty(&generator.generate_valid())?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample submission {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
