//! Result presentation: user-facing messages and the comparison chart

use crate::config::PresentationConfig;
use crate::error::DispatchError;
use crate::types::PredictionResult;
use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Severity of a message line, mirrors how the form colours it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Info,
    Plain,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    fn new(kind: MessageKind, text: String) -> Self {
        Self { kind, text }
    }
}

/// Two bars: cluster average vs this prediction
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonChart {
    pub title: String,
    pub bars: [(&'static str, f64); 2],
}

/// Everything shown for one submission
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Presentation {
    pub messages: Vec<Message>,
    pub chart: Option<ComparisonChart>,
}

impl Presentation {
    /// Plain text lines, in display order
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.text.clone()).collect()
    }
}

/// Formats results and renders comparison charts
pub struct ResultPresenter {
    chart_dir: Option<PathBuf>,
}

impl ResultPresenter {
    pub fn new(config: &PresentationConfig) -> Self {
        Self {
            chart_dir: config.charts.then(|| PathBuf::from(&config.chart_dir)),
        }
    }

    /// Presenter that never writes chart files
    pub fn text_only() -> Self {
        Self { chart_dir: None }
    }

    /// Build the messages and chart for a successful prediction
    pub fn present(&self, result: &PredictionResult) -> Presentation {
        let mut messages = vec![Message::new(
            MessageKind::Success,
            format!(
                "Predicted Carbon Emission: {:.2} kg CO₂",
                result.emission_estimate
            ),
        )];

        if let Some(name) = &result.cluster_name {
            messages.push(Message::new(
                MessageKind::Info,
                format!("Cluster Assignment: {}", name),
            ));
        }
        if let Some(tier) = result
            .tier
            .filter(|t| result.cluster_name.as_deref() != Some(t.as_str()))
        {
            messages.push(Message::new(
                MessageKind::Info,
                format!("Emission Tier: {}", tier),
            ));
        }

        let chart = result.cluster_summary.as_ref().map(|summary| {
            messages.push(Message::new(MessageKind::Plain, "Cluster Summary:".to_string()));
            messages.push(Message::new(
                MessageKind::Plain,
                format!(
                    "- Average Carbon Emission in Cluster: {:.2} kg CO₂",
                    summary.average_emission
                ),
            ));
            messages.push(Message::new(
                MessageKind::Plain,
                format!("- Number of People in Cluster: {}", summary.sample_size),
            ));

            let name = result.cluster_name.as_deref().unwrap_or("Cluster");
            ComparisonChart {
                title: format!("Your Carbon Emission vs {} Average", name),
                bars: [
                    ("Cluster Average", summary.average_emission),
                    ("Your Prediction", result.emission_estimate),
                ],
            }
        });

        Presentation { messages, chart }
    }

    /// Messages for a failed submission; never carries a chart
    pub fn present_error(&self, error: &DispatchError) -> Presentation {
        let text = match error {
            DispatchError::Mapping(e) => format!("Invalid input: {}", e),
            DispatchError::Prediction(e) => format!("Prediction failed: {}", e),
        };
        Presentation {
            messages: vec![Message::new(MessageKind::Error, text)],
            chart: None,
        }
    }

    /// Render the chart into the chart directory, returning the file written.
    ///
    /// Chart failures are logged and swallowed; the text result still stands.
    pub fn render_chart(&self, chart: &ComparisonChart, file_stem: &str) -> Option<PathBuf> {
        let dir = self.chart_dir.as_ref()?;
        let path = dir.join(format!("{}.svg", file_stem));

        match fs::create_dir_all(dir)
            .map_err(|e| Box::new(e) as Box<dyn Error>)
            .and_then(|_| draw_comparison(chart, &path))
        {
            Ok(()) => {
                debug!(path = %path.display(), "Comparison chart written");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to render comparison chart");
                None
            }
        }
    }
}

/// Draw a two-bar chart as SVG
pub fn draw_comparison(chart: &ComparisonChart, path: &Path) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_value = chart
        .bars
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0_f64, f64::max);
    let y_max = if max_value > 0.0 { max_value * 1.15 } else { 1.0 };

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..1u32).into_segmented(), 0f64..y_max)?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc("Type")
        .y_desc("CarbonEmission")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => chart
                .bars
                .get(*i as usize)
                .map(|(label, _)| label.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    let steelblue = RGBColor(70, 130, 180);
    ctx.draw_series(
        Histogram::vertical(&ctx)
            .style(steelblue.filled())
            .margin(30)
            .data(
                chart
                    .bars
                    .iter()
                    .enumerate()
                    .map(|(i, (_, value))| (i as u32, value.max(0.0))),
            ),
    )?;

    root.present()?;
    Ok(())
}
