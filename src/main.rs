//! Carbon Footprint Estimator - Main Entry Point
//!
//! Loads the schema and models once, then serves submissions either from an
//! interactive terminal form or as a NATS request/reply service.

use anyhow::Result;
use carbon_footprint_estimator::{
    config::{AppConfig, FrontendMode, LoggingConfig},
    consumer::SubmissionConsumer,
    context::AppContext,
    form,
    metrics::MetricsReporter,
    producer::OutcomeProducer,
};
use futures::StreamExt;
use std::io;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_from_path(&config_path)?;

    init_logging(&config.logging)?;
    info!(path = %config_path, "Configuration loaded successfully");

    let ctx = AppContext::from_config(&config)?;
    info!(fields = ctx.schema().len(), "Application context ready");

    match config.frontend.mode {
        FrontendMode::Form => {
            let stdin = io::stdin();
            form::run(&ctx, stdin.lock(), io::stdout())?;
        }
        FrontendMode::Nats => {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(serve(&ctx, &config))?;
        }
    }

    info!("Shutting down...");
    ctx.metrics().print_summary();

    Ok(())
}

/// Logs go to stderr so the form keeps stdout to itself
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("carbon_footprint_estimator={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Answer submissions one at a time until the subscription ends or Ctrl-C
async fn serve(ctx: &AppContext, config: &AppConfig) -> Result<()> {
    let client = async_nats::connect(&config.frontend.nats_url).await?;
    info!("Connected to NATS at {}", config.frontend.nats_url);

    let consumer = SubmissionConsumer::new(client.clone(), &config.frontend.submission_subject);
    let producer = OutcomeProducer::new(client.clone(), &config.frontend.result_subject);
    info!("Publishing unaddressed outcomes to: {}", producer.subject());

    let reporter = MetricsReporter::new(ctx.metrics(), config.frontend.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            message = subscription.next() => {
                let Some(message) = message else {
                    info!("Subscription closed");
                    break;
                };

                let outcome = ctx.submit_json(&message.payload);
                if let Err(e) = producer.publish(message.reply, &outcome).await {
                    error!(
                        submission_id = %outcome.submission_id,
                        error = %e,
                        "Failed to publish submission outcome"
                    );
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    client.flush().await?;
    Ok(())
}
