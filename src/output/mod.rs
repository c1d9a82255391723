mod csv;
mod json;
mod text;

use chrono::Utc;
use serde::Serialize;

use crate::analysis::{AccumulationResult, SplitResult};
use crate::error::ProcessException;
use crate::spectrum::Spectrum;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Printable digest of one processed record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub record: usize,
    pub success: bool,
    /// Pulses in the record spectrum (gas family for split records)
    pub pulse_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_pulse_count: Option<usize>,
    pub exception: Option<ProcessException>,
    pub exception_count: usize,
    /// Strongest bin of the averaged magnitude
    pub peak_bin: Option<usize>,
    pub peak_magnitude: Option<f64>,
}

impl RecordSummary {
    pub fn from_accumulation(record: usize, result: &AccumulationResult) -> Self {
        let peak = result.spectrum.as_ref().and_then(peak_of);
        Self {
            record,
            success: result.has_spectrum(),
            pulse_count: result.pulse_count(),
            reference_pulse_count: None,
            exception: result.exception,
            exception_count: result.exception_count,
            peak_bin: peak.map(|(bin, _)| bin),
            peak_magnitude: peak.map(|(_, magnitude)| magnitude),
        }
    }

    pub fn from_split(record: usize, result: &SplitResult) -> Self {
        let peak = result.pair.as_ref().and_then(|pair| peak_of(&pair.source));
        Self {
            record,
            success: result.has_spectrum(),
            pulse_count: result.pair.as_ref().map_or(0, |p| p.source.pulse_count()),
            reference_pulse_count: Some(
                result.pair.as_ref().map_or(0, |p| p.reference.pulse_count()),
            ),
            exception: result.exception,
            exception_count: result.exception_count,
            peak_bin: peak.map(|(bin, _)| bin),
            peak_magnitude: peak.map(|(_, magnitude)| magnitude),
        }
    }

    pub(crate) fn exception_label(&self) -> &'static str {
        match self.exception {
            None => "",
            Some(ProcessException::NoPeakFound) => "no-peak-found",
            Some(ProcessException::NoSliceValid) => "no-slice-valid",
            Some(ProcessException::NoFlatPhaseIntervalFound) => "no-flat-phase-interval",
        }
    }
}

/// Bin and magnitude of the largest averaged bin.
fn peak_of(spectrum: &Spectrum) -> Option<(usize, f64)> {
    spectrum
        .average()?
        .iter()
        .map(|z| z.norm())
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

pub trait Formatter: Send {
    fn format(&self, summary: &RecordSummary) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
