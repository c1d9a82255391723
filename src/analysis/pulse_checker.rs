use super::accumulator::locate_slices;
use crate::config::PipelineConfig;
use crate::correction::Corrector;
use crate::error::{CorrectFailure, ProcessException};
use crate::slicing::{CrestLocator, SliceInfo, Slicer};

/// Per-pulse report of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseInfo {
    pub slice: SliceInfo,
    /// Mean `|z|^2` of the corrected pulse, or why it was rejected
    pub outcome: Result<f64, CorrectFailure>,
}

impl PulseInfo {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Corrects every pulse of a record on its own, to locate bad bursts.
pub struct PulseChecker {
    locator: CrestLocator,
    slicer: Slicer,
    corrector: Corrector,
}

impl PulseChecker {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            locator: CrestLocator::new(config),
            slicer: Slicer::from_config(&config.slice, &config.crest),
            corrector: Corrector::from_config(config),
        }
    }

    pub fn check(&mut self, waveform: &[f64]) -> Result<Vec<PulseInfo>, ProcessException> {
        let slices = locate_slices(&mut self.locator, &self.slicer, waveform)?;
        let report = slices
            .into_iter()
            .map(|slice| {
                let outcome = self.corrector.correct_slice(waveform, &slice).map(|pulse| {
                    pulse.iter().map(|z| z.norm_sqr()).sum::<f64>() / pulse.len().max(1) as f64
                });
                if let Err(failure) = &outcome {
                    log::debug!("Pulse at {}: {}", slice.start_index, failure);
                }
                PulseInfo { slice, outcome }
            })
            .collect();
        Ok(report)
    }
}
