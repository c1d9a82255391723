use super::accumulator::accumulate_slices;
use super::result::{GasRefPair, ProcessOutcome, SplitResult};
use crate::config::PipelineConfig;
use crate::correction::Corrector;
use crate::error::ProcessException;
use crate::slicing::{CrestLocator, RefSlicer, Slicer};
use crate::spectrum::Spectrum;

/// Dual-channel record processor
///
/// Gas and reference bursts alternate in one record. Both families go through
/// the same corrector; the family with the larger lower-half magnitude is
/// reported as the gas (`source`) spectrum.
pub struct Splitter {
    locator: CrestLocator,
    slicer: RefSlicer,
    corrector: Corrector,
    total: Option<GasRefPair>,
}

impl Splitter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_parts(
            CrestLocator::new(config),
            RefSlicer::new(Slicer::from_config(&config.slice, &config.crest)),
            Corrector::from_config(config),
        )
    }

    pub fn with_parts(locator: CrestLocator, slicer: RefSlicer, corrector: Corrector) -> Self {
        Self {
            locator,
            slicer,
            corrector,
            total: None,
        }
    }

    pub fn process(&mut self, waveform: &[f64]) -> SplitResult {
        let crests = self.locator.find(waveform);
        if crests.is_empty() {
            return SplitResult::failure(ProcessException::NoPeakFound, 0);
        }

        let pair = match self.slicer.slice(waveform.len(), &crests) {
            Ok(pair) if !pair.first.is_empty() && !pair.second.is_empty() => pair,
            Ok(_) => {
                log::debug!("One pulse family has no valid slice");
                return SplitResult::failure(ProcessException::NoSliceValid, 0);
            }
            Err(e) => {
                log::debug!("{}", e);
                return SplitResult::failure(ProcessException::NoSliceValid, 0);
            }
        };

        let (first, first_failures) = accumulate_slices(&mut self.corrector, waveform, &pair.first);
        let (second, second_failures) =
            accumulate_slices(&mut self.corrector, waveform, &pair.second);
        let failures = first_failures + second_failures;

        if first.pulse_count() == 0 || second.pulse_count() == 0 {
            log::debug!(
                "Pulse family emptied by correction ({} + {} survivors)",
                first.pulse_count(),
                second.pulse_count()
            );
            return SplitResult::failure(ProcessException::NoFlatPhaseIntervalFound, failures);
        }

        let labelled = GasRefPair::from_families(first, second);
        log::debug!(
            "Record split: {} gas / {} reference pulses, {} rejected",
            labelled.source.pulse_count(),
            labelled.reference.pulse_count(),
            failures
        );
        let result = SplitResult::success(labelled, failures);
        result.absorb_into(&mut self.total);
        result
    }

    /// Gas and reference totals since construction or the last reset.
    pub fn accumulated(&self) -> Option<&GasRefPair> {
        self.total.as_ref()
    }

    pub fn accumulated_source(&self) -> Option<&Spectrum> {
        self.total.as_ref().map(|pair| &pair.source)
    }

    pub fn reset(&mut self) {
        self.total = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApodizerKind, RepetitionRate, RulerKind};
    use std::f64::consts::PI;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.sampling.sample_rate = 1e6;
        // one family every 1000 samples, two families interleaved
        config.sampling.repetition_rate = RepetitionRate::from_hz(2000.0);
        config.crest.min_points_before_crest = 150;
        config.crest.auto_adjust = false;
        config.crest.margin_hz = 600.0;
        config.slice.ruler = RulerKind::Fixed;
        config.slice.fixed_length = Some(500);
        config.correction.apodizer = ApodizerKind::None;
        config.correction.center_span_length = 64;
        config
    }

    fn burst_train(len: usize, crests: &[(usize, f64)]) -> Vec<f64> {
        let mut signal = vec![0.0; len];
        for &(c, amplitude) in crests {
            for (i, s) in signal.iter_mut().enumerate() {
                let t = i as f64 - c as f64;
                *s += amplitude * (-t * t / 288.0).exp() * (0.2 * PI * t).cos();
            }
        }
        signal
    }

    #[test]
    fn test_labels_stronger_family_as_source() {
        let crests = [
            (1000, 0.6),
            (1500, 1.0),
            (2000, 0.6),
            (2500, 1.0),
            (3000, 0.6),
            (3500, 1.0),
            (4000, 0.6),
            (4500, 1.0),
        ];
        let record = burst_train(6000, &crests);
        let mut splitter = Splitter::new(&config());
        let result = splitter.process(&record);
        let pair = result.pair.expect("split should succeed");
        assert!(pair.source.lower_half_magnitude() > pair.reference.lower_half_magnitude());
        assert!(pair.source.pulse_count() > 0);
        assert!(pair.reference.pulse_count() > 0);
        assert_eq!(result.exception_count, 0);
        assert!(splitter.accumulated().is_some());

        splitter.reset();
        assert!(splitter.accumulated().is_none());
    }

    #[test]
    fn test_too_few_crests_is_no_valid_slice() {
        let record = burst_train(3000, &[(1000, 1.0), (1500, 1.0)]);
        let mut splitter = Splitter::new(&config());
        let result = splitter.process(&record);
        assert_eq!(result.exception, Some(ProcessException::NoSliceValid));
        assert!(!result.has_spectrum());
    }

    #[test]
    fn test_silent_record_has_no_peak() {
        let mut splitter = Splitter::new(&config());
        let result = splitter.process(&vec![0.0; 4000]);
        assert_eq!(result.exception, Some(ProcessException::NoPeakFound));
    }
}
