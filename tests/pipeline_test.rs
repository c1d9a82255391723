mod test_signals;

use approx::assert_relative_eq;
use phasesonar::analysis::{PhaseReader, PulseChecker};
use phasesonar::config::{ApodizerKind, CorrectorKind};
use phasesonar::simulation::{InterferogramConfig, add_white_noise, generate_interferogram};
use phasesonar::{Accumulator, ParallelAccumulator, ProcessException};

#[test]
fn test_clean_record_accumulates_every_pulse() {
    let config = test_signals::pipeline_config();
    let mut accumulator = Accumulator::new(&config);

    let result = accumulator.process(&test_signals::clean_record());

    assert!(result.has_spectrum());
    assert!(!result.has_exception());
    assert_eq!(result.exception_count, 0);
    assert_eq!(result.pulse_count(), 4);

    let spectrum = result.spectrum.unwrap();
    assert_eq!(spectrum.len(), config.zero_filled_length() / 2);
    assert_eq!(accumulator.accumulated().pulse_count(), 4);

    // carrier at 0.1 cycles/sample lands on bin 102 of the 1024-point buffer
    let magnitude = spectrum.magnitude();
    let peak = magnitude
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(bin, _)| bin)
        .unwrap();
    assert!((100..=104).contains(&peak), "peak at bin {}", peak);
    // Mertz correction leaves a positive real spectrum around the carrier
    assert!(spectrum.real()[peak] > 0.0);
}

#[test]
fn test_corrupted_burst_is_skipped_and_counted() {
    let config = test_signals::pipeline_config();
    let mut accumulator = Accumulator::new(&config);

    let result = accumulator.process(&test_signals::record_with_corrupted_burst(3000));

    assert!(result.has_spectrum());
    assert_eq!(result.pulse_count(), 3);
    assert_eq!(result.exception_count, 1);
    assert_eq!(result.exception, Some(ProcessException::NoFlatPhaseIntervalFound));
}

#[test]
fn test_silent_record_has_no_peak() {
    let config = test_signals::pipeline_config();
    let mut accumulator = Accumulator::new(&config);

    let result = accumulator.process(&vec![0.0; 5000]);

    assert!(!result.has_spectrum());
    assert_eq!(result.exception, Some(ProcessException::NoPeakFound));
    assert_eq!(accumulator.accumulated().pulse_count(), 0);
}

#[test]
fn test_totals_grow_across_records() {
    let config = test_signals::pipeline_config();
    let mut accumulator = Accumulator::new(&config);

    accumulator.process(&test_signals::clean_record());
    accumulator.process(&vec![0.0; 5000]);
    accumulator.process(&test_signals::record_with_corrupted_burst(2000));

    assert_eq!(accumulator.accumulated().pulse_count(), 7);

    accumulator.reset();
    assert_eq!(accumulator.accumulated().pulse_count(), 0);
}

#[test]
fn test_inverted_bursts_correct_to_the_same_spectrum() {
    let config = test_signals::pipeline_config();
    let inverted = generate_interferogram(&InterferogramConfig {
        inverted: true,
        ..test_signals::interferogram()
    });

    let upright = Accumulator::new(&config)
        .process(&test_signals::clean_record())
        .spectrum
        .unwrap();
    let flipped = Accumulator::new(&config).process(&inverted).spectrum.unwrap();

    assert_eq!(flipped.pulse_count(), 4);
    let (a, b) = (upright.real(), flipped.real());
    for bin in 90..115 {
        assert_relative_eq!(a[bin], b[bin], epsilon = 1e-9, max_relative = 1e-6);
    }
}

#[test]
fn test_auto_adjust_recovers_from_high_threshold() {
    let mut config = test_signals::pipeline_config();
    config.crest.auto_adjust = true;
    config.crest.vertical_threshold = 5.0;

    let record = generate_interferogram(&InterferogramConfig {
        record_len: 20_000,
        ..test_signals::interferogram()
    });
    let result = Accumulator::new(&config).process(&record);

    assert!(result.has_spectrum());
    assert_eq!(result.pulse_count(), 19);
}

#[test]
fn test_default_extractor_on_noisy_record() {
    let mut config = test_signals::pipeline_config();
    config.correction = Default::default();
    config.correction.center_span_length = 64;
    config.correction.apodizer = ApodizerKind::Hann;

    let mut record = test_signals::clean_record();
    add_white_noise(&mut record, 0.01, Some(7));
    let result = Accumulator::new(&config).process(&record);

    assert!(result.has_spectrum());
    assert_eq!(result.pulse_count(), 4);
}

#[test]
fn test_parallel_matches_serial() {
    let mut config = test_signals::pipeline_config();
    config.correction.apodizer = ApodizerKind::Hann;

    let mut record = generate_interferogram(&InterferogramConfig {
        record_len: 12_000,
        ..test_signals::interferogram()
    });
    add_white_noise(&mut record, 0.002, Some(11));

    let serial = Accumulator::new(&config).process(&record);
    let parallel = ParallelAccumulator::new(&config, 4).process(&record);

    assert_eq!(serial.pulse_count(), 11);
    assert_eq!(parallel.pulse_count(), serial.pulse_count());
    assert_eq!(parallel.exception_count, serial.exception_count);

    let serial = serial.spectrum.unwrap();
    let parallel = parallel.spectrum.unwrap();
    for (s, p) in serial.data().iter().zip(parallel.data()) {
        assert_relative_eq!(s.re, p.re, epsilon = 1e-9, max_relative = 1e-9);
        assert_relative_eq!(s.im, p.im, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_phase_reader_sees_flat_phase() {
    let mut config = test_signals::pipeline_config();
    config.correction.corrector = CorrectorKind::Fake;

    let phase = PhaseReader::new(&config)
        .read(&test_signals::clean_record())
        .unwrap();

    assert_eq!(phase.slice.start_index, 700);
    assert_eq!(phase.phase.len(), config.zero_filled_length() / 2);
    // the first burst is symmetric about its crest
    let band = &phase.phase[95..110];
    let lowest = band.iter().cloned().fold(f64::INFINITY, f64::min);
    let highest = band.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(highest - lowest < 0.1, "phase spread {}", highest - lowest);
}

#[test]
fn test_pulse_checker_flags_corrupted_burst() {
    let config = test_signals::pipeline_config();

    let pulses = PulseChecker::new(&config)
        .check(&test_signals::record_with_corrupted_burst(2000))
        .unwrap();

    assert_eq!(pulses.len(), 4);
    let good: Vec<bool> = pulses.iter().map(|p| p.is_ok()).collect();
    assert_eq!(good, vec![true, false, true, true]);
}
