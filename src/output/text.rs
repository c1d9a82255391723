use super::{Formatter, RecordSummary};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, summary: &RecordSummary) -> String {
        let status = if summary.success { "ok" } else { "FAILED" };
        let pulses = match summary.reference_pulse_count {
            Some(reference) => format!("{} gas / {} ref", summary.pulse_count, reference),
            None => format!("{}", summary.pulse_count),
        };
        let exception = match summary.exception {
            Some(e) => format!(" ({}, {} rejected)", e, summary.exception_count),
            None => String::new(),
        };

        if self.verbose {
            let peak = match (summary.peak_bin, summary.peak_magnitude) {
                (Some(bin), Some(magnitude)) => format!("bin {} |z| {:.4e}", bin, magnitude),
                _ => "-".to_string(),
            };
            format!(
                "Record {:>5}: {:<6} pulses: {:<14} peak: {}{}",
                summary.record, status, pulses, peak, exception
            )
        } else {
            format!(
                "Record {:>5}: {:<6} pulses: {}{}",
                summary.record, status, pulses, exception
            )
        }
    }
}
