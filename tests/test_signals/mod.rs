//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use phasesonar::config::{
    AlignerKind, ApodizerKind, PhaseExtractorKind, PipelineConfig, RangeUnit, RepetitionRate,
    RulerKind,
};
use phasesonar::simulation::{InterferogramConfig, ReferenceFamily, corrupt_burst, generate_interferogram};

/// 1 MHz sampling, one burst every 1000 samples, 1024-point buffers.
pub fn pipeline_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.sampling.sample_rate = 1e6;
    config.sampling.repetition_rate = RepetitionRate::from_hz(1000.0);
    config.crest.vertical_threshold = 0.5;
    config.crest.min_points_before_crest = 300;
    config.crest.auto_adjust = false;
    config.slice.ruler = RulerKind::Min;
    config.slice.aligner = AlignerKind::Left;
    config.correction.apodizer = ApodizerKind::None;
    config.correction.phase_extractor = PhaseExtractorKind::SpecifiedRange;
    config.correction.range_unit = RangeUnit::Bins;
    // carrier sits on bin 102 of 1024
    config.correction.range_start = 70.0;
    config.correction.range_end = 135.0;
    config.correction.min_flat_phase_points = 30;
    config
}

/// Gas bursts every 1000 samples with weaker reference bursts halfway between.
pub fn dual_channel_config() -> PipelineConfig {
    let mut config = pipeline_config();
    config.sampling.repetition_rate = RepetitionRate::from_hz(2000.0);
    config.crest.vertical_threshold = 0.3;
    config.crest.min_points_before_crest = 150;
    config.crest.margin_hz = 600.0;
    config.slice.ruler = RulerKind::Fixed;
    config.slice.fixed_length = Some(500);
    // carrier sits on bin 51 of 512
    config.correction.range_start = 35.0;
    config.correction.range_end = 67.0;
    config.correction.min_flat_phase_points = 15;
    config
}

pub fn interferogram() -> InterferogramConfig {
    InterferogramConfig::default()
}

pub fn dual_channel_interferogram(reference_amplitude: f64) -> InterferogramConfig {
    InterferogramConfig {
        reference: Some(ReferenceFamily {
            offset: 500,
            amplitude: reference_amplitude,
        }),
        ..InterferogramConfig::default()
    }
}

/// Four clean bursts at 1000, 2000, 3000 and 4000.
pub fn clean_record() -> Vec<f64> {
    generate_interferogram(&interferogram())
}

/// Clean record with the burst at `crest` replaced by noise.
pub fn record_with_corrupted_burst(crest: usize) -> Vec<f64> {
    let mut record = clean_record();
    corrupt_burst(&mut record, crest, 150, 0.9, 42);
    record
}
