//! Interactive terminal form
//!
//! Asks for every schema field in order, then shows the prediction. Input
//! and output are generic so the form can be driven from tests.

use crate::context::AppContext;
use crate::presenter::{MessageKind, Presentation};
use crate::schema::{FeatureSchema, FieldKind};
use crate::types::UserInput;
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

pub struct TerminalForm<'a, R, W> {
    schema: &'a FeatureSchema,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> TerminalForm<'a, R, W> {
    pub fn new(schema: &'a FeatureSchema, input: R, output: W) -> Self {
        Self {
            schema,
            input,
            output,
        }
    }

    /// Next trimmed line, or `None` at end of input
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        self.read_line()
    }

    /// Ask for every field; `None` if the input ends first
    pub fn fill(&mut self) -> io::Result<Option<UserInput>> {
        let schema = self.schema;
        let mut input = UserInput::new(schema);

        for field in schema.fields() {
            let set = match &field.kind {
                FieldKind::Categorical { options } => match self.ask_categorical(&field.name, options)? {
                    Some(choice) => input.set(&field.name, choice),
                    None => return Ok(None),
                },
                FieldKind::Numeric { min, max, default } => {
                    match self.ask_numeric(&field.name, *min, *max, *default)? {
                        Some(value) => input.set(&field.name, value),
                        None => return Ok(None),
                    }
                }
            };
            set.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }

        Ok(Some(input))
    }

    /// Pick by name or by number; empty input picks the first option
    fn ask_categorical(&mut self, name: &str, options: &[String]) -> io::Result<Option<String>> {
        writeln!(self.output, "{}:", name)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, option)?;
        }

        loop {
            let Some(answer) = self.prompt(&format!("Select [1-{}] (default 1): ", options.len()))? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(options.first().cloned());
            }
            // an exact option value wins over an index
            if let Some(option) = options.iter().find(|o| **o == answer) {
                return Ok(Some(option.clone()));
            }
            if let Some(option) = answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| options.get(i))
            {
                return Ok(Some(option.clone()));
            }
            writeln!(self.output, "Please choose one of the listed options.")?;
        }
    }

    /// Number within `[min, max]`; empty input takes the default
    fn ask_numeric(&mut self, name: &str, min: f64, max: f64, default: f64) -> io::Result<Option<f64>> {
        loop {
            let Some(answer) =
                self.prompt(&format!("{} [{} - {}] (default {}): ", name, min, max, default))?
            else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(Some(default));
            }
            match answer.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= min && value <= max => {
                    return Ok(Some(value))
                }
                Ok(_) => writeln!(self.output, "Value must be between {} and {}.", min, max)?,
                Err(_) => writeln!(self.output, "Please enter a number.")?,
            }
        }
    }

    /// Print a presentation and, if one was written, the chart location
    pub fn show(&mut self, presentation: &Presentation, chart: Option<&Path>) -> io::Result<()> {
        writeln!(self.output)?;
        for message in &presentation.messages {
            let marker = match message.kind {
                MessageKind::Success => "✔ ",
                MessageKind::Info => "ℹ ",
                MessageKind::Error => "✖ ",
                MessageKind::Plain => "",
            };
            writeln!(self.output, "{}{}", marker, message.text)?;
        }
        if let Some(path) = chart {
            writeln!(self.output, "Chart saved to {}", path.display())?;
        }
        writeln!(self.output)
    }

    /// Yes/no question, defaulting to no
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.prompt(&format!("{} [y/N]: ", question))?;
        Ok(matches!(
            answer.as_deref().map(str::to_lowercase).as_deref(),
            Some("y") | Some("yes")
        ))
    }
}

/// Run the form until the user stops or input ends
pub fn run<R: BufRead, W: Write>(ctx: &AppContext, input: R, output: W) -> Result<()> {
    let mut form = TerminalForm::new(ctx.schema(), input, output);
    let mut submissions = 0u64;

    loop {
        writeln!(form.output, "Carbon Footprint Predictor")?;
        writeln!(form.output, "Fill in your lifestyle details.\n")?;

        let Some(input) = form.fill()? else {
            break;
        };
        submissions += 1;

        let (presentation, chart) = match ctx.submit(&input) {
            Ok(result) => {
                let presentation = ctx.presenter().present(&result);
                let chart = presentation.chart.as_ref().and_then(|chart| {
                    ctx.presenter()
                        .render_chart(chart, &format!("comparison-{}", uuid::Uuid::new_v4()))
                });
                (presentation, chart)
            }
            Err(e) => (ctx.presenter().present_error(&e), None),
        };
        form.show(&presentation, chart.as_deref())?;

        if !form.confirm("Submit another?")? {
            break;
        }
    }

    info!(submissions, "Form session finished");
    Ok(())
}
