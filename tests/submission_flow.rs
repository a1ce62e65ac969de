//! End-to-end submissions against the shipped dataset, metadata and model bundle

use carbon_footprint_estimator::config::{AppConfig, SchemaSource, TierPolicy};
use carbon_footprint_estimator::error::{DispatchError, FeatureMappingError};
use carbon_footprint_estimator::schema::FieldKind;
use carbon_footprint_estimator::types::{SubmissionStatus, Tier};
use carbon_footprint_estimator::{AppContext, UserInput};

fn config(source: SchemaSource, policy: TierPolicy) -> AppConfig {
    let mut config = AppConfig::load_from_path("config/config.toml").unwrap();
    config.schema.source = source;
    config.tiers.policy = policy;
    config.presentation.charts = false;
    config
}

fn sample_input(ctx: &AppContext) -> UserInput {
    UserInput::new(ctx.schema())
        .with("Body Type", "obese")
        .unwrap()
        .with("Sex", "female")
        .unwrap()
        .with("Diet", "pescatarian")
        .unwrap()
        .with("Transport", "walk/bicycle")
        .unwrap()
        .with("Monthly Grocery Bill", 62.0)
        .unwrap()
        .with("Vehicle Monthly Distance Km", 37.0)
        .unwrap()
        .with("How Many New Clothes Monthly", 34.0)
        .unwrap()
}

#[test]
fn dataset_schema_orders_categorical_fields_first() {
    let ctx = AppContext::from_config(&config(SchemaSource::Dataset, TierPolicy::Cluster)).unwrap();
    let schema = ctx.schema();

    assert_eq!(
        schema.field_names(),
        vec![
            "Body Type",
            "Sex",
            "Diet",
            "Transport",
            "Monthly Grocery Bill",
            "Vehicle Monthly Distance Km",
            "How Many New Clothes Monthly",
        ]
    );
    assert!(schema.field("CarbonEmission").is_none());
    match &schema.field("Monthly Grocery Bill").unwrap().kind {
        FieldKind::Numeric { min, max, default } => {
            assert!(min <= default && default <= max);
        }
        other => panic!("unexpected kind: {:?}", other),
    }
}

#[test]
fn dataset_submission_gets_cluster_and_summary() {
    let ctx = AppContext::from_config(&config(SchemaSource::Dataset, TierPolicy::Cluster)).unwrap();

    let result = ctx.submit(&sample_input(&ctx)).unwrap();
    assert!((result.emission_estimate - 1541.25).abs() < 1e-9);

    let label = result.cluster_label.unwrap();
    assert!(label < 3);
    assert!(result.cluster_summary.is_some());
    assert_eq!(result.tier, Tier::from_cluster_label(label));
    assert_eq!(
        result.cluster_name.as_deref(),
        result.tier.map(|t| t.as_str())
    );

    let presentation = ctx.presenter().present(&result);
    assert_eq!(
        presentation.lines()[0],
        "Predicted Carbon Emission: 1541.25 kg CO₂"
    );
    assert!(presentation.chart.is_some());
}

#[test]
fn metadata_schema_with_threshold_tiers() {
    let ctx =
        AppContext::from_config(&config(SchemaSource::Metadata, TierPolicy::Threshold)).unwrap();

    let result = ctx.submit(&sample_input(&ctx)).unwrap();
    assert_eq!(result.tier, Some(Tier::High));
    assert!(result.cluster_label.is_some());
}

#[test]
fn json_submissions_report_mapping_errors() {
    let ctx = AppContext::from_config(&config(SchemaSource::Dataset, TierPolicy::Cluster)).unwrap();

    let unknown = ctx.submit(
        &sample_input(&ctx).with("Diet", "carnivore").unwrap(),
    );
    assert_eq!(
        unknown.unwrap_err(),
        DispatchError::Mapping(FeatureMappingError::UnknownCategory {
            field: "Diet".to_string(),
            value: "carnivore".to_string(),
        })
    );

    let outcome = ctx.submit_json(br#"{"Diet": "vegan", "Pets": "dog"}"#);
    match outcome.status {
        SubmissionStatus::Error { kind, message } => {
            assert_eq!(kind, "feature_mapping");
            assert!(message.contains("Pets"));
        }
        other => panic!("unexpected status: {:?}", other),
    }

    assert_eq!(ctx.metrics().total(), 2);
}
