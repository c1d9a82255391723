use super::{Formatter, RecordSummary, iso8601_timestamp};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, summary: &RecordSummary) -> String {
        let reference = summary
            .reference_pulse_count
            .map_or(String::new(), |r| r.to_string());
        let peak_bin = summary.peak_bin.map_or(String::new(), |b| b.to_string());
        let peak_magnitude = summary
            .peak_magnitude
            .map_or(String::new(), |m| format!("{:.6e}", m));
        format!(
            "{},{},{},{},{},{},{},{},{}",
            iso8601_timestamp(),
            summary.record,
            summary.success,
            summary.pulse_count,
            reference,
            summary.exception_label(),
            summary.exception_count,
            peak_bin,
            peak_magnitude
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some(
            "ts,record,success,pulse_count,reference_pulse_count,exception,exception_count,peak_bin,peak_magnitude",
        )
    }
}
