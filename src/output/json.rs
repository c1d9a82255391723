use serde::Serialize;

use super::{Formatter, RecordSummary, iso8601_timestamp};

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonLine<'a> {
    ts: String,
    #[serde(flatten)]
    summary: &'a RecordSummary,
}

impl Formatter for JsonFormatter {
    fn format(&self, summary: &RecordSummary) -> String {
        let line = JsonLine {
            ts: iso8601_timestamp(),
            summary,
        };
        serde_json::to_string(&line).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
    }
}
