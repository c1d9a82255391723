use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::unbounded;

use super::accumulator::locate_slices;
use super::result::AccumulationResult;
use crate::config::PipelineConfig;
use crate::correction::Corrector;
use crate::error::ProcessException;
use crate::slicing::{CrestLocator, SliceInfo, Slicer};
use crate::spectrum::Spectrum;

/// Accumulator that spreads the slices of one record over worker threads.
///
/// Each worker owns its own [`Corrector`], so scratch buffers are never
/// shared. Workers sum their survivors locally and merge once under a single
/// lock. The result matches [`Accumulator`](super::Accumulator) up to
/// floating-point summation order.
pub struct ParallelAccumulator {
    locator: CrestLocator,
    slicer: Slicer,
    correctors: Vec<Corrector>,
    total: Spectrum,
    stop: Arc<AtomicBool>,
}

impl ParallelAccumulator {
    /// `threads` workers, at least one.
    pub fn new(config: &PipelineConfig, threads: usize) -> Self {
        let correctors = (0..threads.max(1))
            .map(|_| Corrector::from_config(config))
            .collect();
        Self::with_parts(
            CrestLocator::new(config),
            Slicer::from_config(&config.slice, &config.crest),
            correctors,
        )
    }

    /// Build from prepared correctors; an empty list gets one default corrector.
    pub fn with_parts(locator: CrestLocator, slicer: Slicer, mut correctors: Vec<Corrector>) -> Self {
        if correctors.is_empty() {
            correctors.push(Corrector::from_config(&PipelineConfig::default()));
        }
        let total = Spectrum::zeros(correctors[0].output_len(), correctors[0].output_kind());
        Self {
            locator,
            slicer,
            correctors,
            total,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn threads(&self) -> usize {
        self.correctors.len()
    }

    /// Flag checked by every worker before it takes the next slice.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn process(&mut self, waveform: &[f64]) -> AccumulationResult {
        let slices = match locate_slices(&mut self.locator, &self.slicer, waveform) {
            Ok(slices) => slices,
            Err(exception) => return AccumulationResult::failure(exception, 0),
        };

        let (spectrum, failures) = self.correct_all(waveform, &slices);
        let spectrum = match spectrum {
            Some(spectrum) if spectrum.pulse_count() > 0 => spectrum,
            _ if self.stop.load(Ordering::Relaxed) => {
                log::debug!("Record abandoned after {} rejected pulses", failures);
                return AccumulationResult::cancelled();
            }
            _ => {
                return AccumulationResult::failure(
                    ProcessException::NoFlatPhaseIntervalFound,
                    failures,
                );
            }
        };

        if let Err(e) = self.total.try_absorb(&spectrum) {
            log::warn!("Running total not updated: {}", e);
        }
        AccumulationResult::success(spectrum, failures)
    }

    fn correct_all(&mut self, waveform: &[f64], slices: &[SliceInfo]) -> (Option<Spectrum>, usize) {
        let (tx, rx) = unbounded();
        for slice in slices {
            // receiver is alive for the whole call
            let _ = tx.send(*slice);
        }
        drop(tx);

        let merged: Mutex<Option<Spectrum>> = Mutex::new(None);
        let failures = AtomicUsize::new(0);
        let stop = self.stop.as_ref();

        thread::scope(|scope| {
            for corrector in self.correctors.iter_mut() {
                let rx = rx.clone();
                let merged = &merged;
                let failures = &failures;
                scope.spawn(move || {
                    let mut partial =
                        Spectrum::zeros(corrector.output_len(), corrector.output_kind());
                    let mut failed = 0;
                    while !stop.load(Ordering::Relaxed) {
                        let Ok(slice) = rx.try_recv() else {
                            break;
                        };
                        match corrector.correct_slice(waveform, &slice) {
                            Ok(pulse) => {
                                if partial.absorb_pulse(pulse).is_err() {
                                    failed += 1;
                                }
                            }
                            Err(_) => failed += 1,
                        }
                    }
                    failures.fetch_add(failed, Ordering::Relaxed);

                    if partial.pulse_count() == 0 {
                        return;
                    }
                    let mut guard = merged.lock().unwrap_or_else(PoisonError::into_inner);
                    match guard.as_mut() {
                        Some(sum) => {
                            if let Err(e) = sum.try_absorb(&partial) {
                                log::warn!("Worker spectrum dropped: {}", e);
                            }
                        }
                        None => *guard = Some(partial),
                    }
                });
            }
        });

        if self.stop.load(Ordering::Relaxed) {
            log::debug!("Parallel accumulation stopped early");
        }
        let spectrum = merged.into_inner().unwrap_or_else(PoisonError::into_inner);
        (spectrum, failures.into_inner())
    }

    pub fn accumulated(&self) -> &Spectrum {
        &self.total
    }

    /// Clear the running total and the stop flag.
    pub fn reset(&mut self) {
        self.total.clear();
        self.stop.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Accumulator;
    use crate::config::{ApodizerKind, RepetitionRate};

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.sampling.sample_rate = 1e6;
        config.sampling.repetition_rate = RepetitionRate::from_hz(1000.0);
        config.crest.min_points_before_crest = 300;
        config.crest.auto_adjust = false;
        config.correction.apodizer = ApodizerKind::Hann;
        config.correction.center_span_length = 64;
        config
    }

    fn bursts(len: usize, period: usize) -> Vec<f64> {
        let mut signal = vec![0.0; len];
        let mut crest = period;
        while crest + period <= len {
            for (i, s) in signal.iter_mut().enumerate() {
                let t = i as f64 - crest as f64;
                *s += (-t * t / 288.0).exp() * (0.2 * std::f64::consts::PI * t).cos();
            }
            crest += period;
        }
        signal
    }

    #[test]
    fn test_matches_serial_accumulation() {
        let record = bursts(12_000, 1000);
        let mut serial = Accumulator::new(&config());
        let mut parallel = ParallelAccumulator::new(&config(), 3);
        assert_eq!(parallel.threads(), 3);

        let a = serial.process(&record);
        let b = parallel.process(&record);
        let a = a.spectrum.unwrap();
        let b = b.spectrum.unwrap();
        assert_eq!(a.pulse_count(), 11);
        assert_eq!(a.pulse_count(), b.pulse_count());
        for (x, y) in a.data().iter().zip(b.data()) {
            assert!((x - y).norm() <= 1e-9 * (1.0 + x.norm()));
        }
        assert_eq!(parallel.accumulated().pulse_count(), 11);
    }

    #[test]
    fn test_stopped_accumulator_processes_nothing() {
        let record = bursts(6000, 1000);
        let mut parallel = ParallelAccumulator::new(&config(), 2);
        parallel.stop();
        let result = parallel.process(&record);
        assert!(result.is_cancelled());
        assert!(!result.has_spectrum());
        assert_eq!(result.exception, None);
        assert_eq!(result.exception_count, 0);
        assert_eq!(parallel.accumulated().pulse_count(), 0);

        parallel.reset();
        assert!(parallel.process(&record).has_spectrum());
    }
}
