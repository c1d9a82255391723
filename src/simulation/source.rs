use super::signal::{InterferogramConfig, generate_interferogram};
use crate::source::RecordSource;

/// Endless or bounded stream of synthetic records.
///
/// Each record draws fresh noise: with a base seed `s`, record `k` uses seed
/// `s + k`, so a run is reproducible record by record.
pub struct SyntheticRecordSource {
    config: InterferogramConfig,
    remaining: Option<usize>,
    produced: u64,
}

impl SyntheticRecordSource {
    pub fn new(config: InterferogramConfig, records: Option<usize>) -> Self {
        Self {
            config,
            remaining: records,
            produced: 0,
        }
    }
}

impl RecordSource for SyntheticRecordSource {
    fn next_record(&mut self) -> anyhow::Result<Option<Vec<f64>>> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }

        let mut config = self.config.clone();
        config.seed = self.config.seed.map(|s| s.wrapping_add(self.produced));
        self.produced += 1;
        Ok(Some(generate_interferogram(&config)))
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }
}
