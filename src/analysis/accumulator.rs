use super::result::AccumulationResult;
use crate::config::PipelineConfig;
use crate::correction::Corrector;
use crate::error::ProcessException;
use crate::slicing::{CrestLocator, SliceInfo, Slicer};
use crate::spectrum::Spectrum;

/// Crest finding and slicing shared by every record-level processor.
pub(crate) fn locate_slices(
    locator: &mut CrestLocator,
    slicer: &Slicer,
    waveform: &[f64],
) -> Result<Vec<SliceInfo>, ProcessException> {
    let crests = locator.find(waveform);
    if crests.is_empty() {
        return Err(ProcessException::NoPeakFound);
    }
    let slices = slicer.slice(waveform.len(), &crests);
    if slices.is_empty() {
        return Err(ProcessException::NoSliceValid);
    }
    log::trace!("{} crests, {} slices", crests.len(), slices.len());
    Ok(slices)
}

/// Correct `slices` one after another and sum the survivors.
///
/// Returns the summed spectrum (zero pulses if nothing survived) and the
/// number of rejected pulses.
pub(crate) fn accumulate_slices<'a, I>(
    corrector: &mut Corrector,
    waveform: &[f64],
    slices: I,
) -> (Spectrum, usize)
where
    I: IntoIterator<Item = &'a SliceInfo>,
{
    let mut sum = Spectrum::zeros(corrector.output_len(), corrector.output_kind());
    let mut failures = 0;
    for slice in slices {
        match corrector.correct_slice(waveform, slice) {
            Ok(pulse) => {
                if let Err(e) = sum.absorb_pulse(pulse) {
                    log::warn!("Dropping pulse at {}: {}", slice.start_index, e);
                    failures += 1;
                }
            }
            Err(_) => failures += 1,
        }
    }
    (sum, failures)
}

/// Single-channel record processor
///
/// Finds crests, slices, corrects every slice and sums the survivors. Each
/// successful record is also added to a running total that lives until
/// [`reset`](Accumulator::reset).
pub struct Accumulator {
    locator: CrestLocator,
    slicer: Slicer,
    corrector: Corrector,
    total: Spectrum,
}

impl Accumulator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_parts(
            CrestLocator::new(config),
            Slicer::from_config(&config.slice, &config.crest),
            Corrector::from_config(config),
        )
    }

    pub fn with_parts(locator: CrestLocator, slicer: Slicer, corrector: Corrector) -> Self {
        let total = Spectrum::zeros(corrector.output_len(), corrector.output_kind());
        Self {
            locator,
            slicer,
            corrector,
            total,
        }
    }

    pub fn process(&mut self, waveform: &[f64]) -> AccumulationResult {
        let slices = match locate_slices(&mut self.locator, &self.slicer, waveform) {
            Ok(slices) => slices,
            Err(exception) => {
                log::debug!("Record of {} samples rejected: {}", waveform.len(), exception);
                return AccumulationResult::failure(exception, 0);
            }
        };

        let (spectrum, failures) = accumulate_slices(&mut self.corrector, waveform, &slices);
        if spectrum.pulse_count() == 0 {
            log::debug!("All {} pulses of record rejected", failures);
            return AccumulationResult::failure(ProcessException::NoFlatPhaseIntervalFound, failures);
        }

        log::debug!(
            "Record accumulated: {} pulses, {} rejected",
            spectrum.pulse_count(),
            failures
        );
        if let Err(e) = self.total.try_absorb(&spectrum) {
            log::warn!("Running total not updated: {}", e);
        }
        AccumulationResult::success(spectrum, failures)
    }

    /// Everything accumulated since construction or the last reset.
    pub fn accumulated(&self) -> &Spectrum {
        &self.total
    }

    pub fn reset(&mut self) {
        self.total.clear();
    }
}

/// Sum the running totals of several accumulators (one per worker).
pub fn merge_totals<'a, I>(accumulators: I) -> Option<Spectrum>
where
    I: IntoIterator<Item = &'a Accumulator>,
{
    let mut merged: Option<Spectrum> = None;
    for accumulator in accumulators {
        let total = accumulator.accumulated();
        match merged.as_mut() {
            Some(sum) => {
                if let Err(e) = sum.try_absorb(total) {
                    log::warn!("Skipping worker total: {}", e);
                }
            }
            None => merged = Some(total.clone()),
        }
    }
    merged
}
