use super::accumulator::locate_slices;
use crate::config::PipelineConfig;
use crate::correction::Corrector;
use crate::error::ProcessException;
use crate::signal_processing::{LEAP_THRESHOLD, unwrap_phase_in_place};
use crate::slicing::{CrestLocator, SliceInfo, Slicer};

/// Unwrapped phase curve of one pulse.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PhaseResult {
    pub phase: Vec<f64>,
    /// The slice the curve was taken from
    pub slice: SliceInfo,
}

/// Reads the phase of the first valid pulse of a record, for diagnostics.
pub struct PhaseReader {
    locator: CrestLocator,
    slicer: Slicer,
    corrector: Corrector,
}

impl PhaseReader {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            locator: CrestLocator::new(config),
            slicer: Slicer::from_config(&config.slice, &config.crest),
            corrector: Corrector::from_config(config),
        }
    }

    pub fn read(&mut self, waveform: &[f64]) -> Result<PhaseResult, ProcessException> {
        let slices = locate_slices(&mut self.locator, &self.slicer, waveform)?;
        let slice = slices[0];
        let phase = self
            .corrector
            .extract_phase(waveform, &slice)
            .map_err(|failure| {
                log::debug!("Phase of pulse at {} unavailable: {}", slice.start_index, failure);
                ProcessException::NoFlatPhaseIntervalFound
            })?;

        let mut phase = phase.to_vec();
        unwrap_phase_in_place(&mut phase, LEAP_THRESHOLD);
        Ok(PhaseResult { phase, slice })
    }
}
