mod test_signals;

use phasesonar::config::{PhaseExtractorKind, PipelineConfig, RangeUnit, RulerKind};
use phasesonar::{Accumulator, PipelineError};

const STATION_CONFIG: &str = r#"
[sampling]
sample_rate = 1e6
repetition_rate = "1000us"

[crest]
vertical_threshold = 0.5
min_points_before_crest = 300
auto_adjust = false

[slice]
ruler = "average"

[correction]
apodizer = "none"
phase_extractor = "specified-range"
range_unit = "hertz"
range_start = 68400
range_end = 131800
min_flat_phase_points = 30

[consumer]
threads = 2
target_count = 10
"#;

#[test]
fn test_station_config_drives_the_pipeline() {
    let config = PipelineConfig::from_toml_str(STATION_CONFIG).unwrap();

    assert!((config.sampling.repetition_rate.as_hz() - 1000.0).abs() < 1e-9);
    assert_eq!(config.slice.ruler, RulerKind::Average);
    assert_eq!(config.correction.phase_extractor, PhaseExtractorKind::SpecifiedRange);
    assert_eq!(config.correction.range_unit, RangeUnit::Hertz);
    assert_eq!(config.consumer.target_count, Some(10));
    assert_eq!(config.zero_filled_length(), 1024);

    let result = Accumulator::new(&config).process(&test_signals::clean_record());
    assert!(result.has_spectrum());
    assert_eq!(result.pulse_count(), 4);
    assert_eq!(result.exception_count, 0);
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join("phasesonar_station_config.toml");
    std::fs::write(&path, STATION_CONFIG).unwrap();

    let config = PipelineConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.consumer.threads, 2);
    assert_eq!(config.crest.min_points_before_crest, 300);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_zero_fill_factor_zero_is_rejected_before_processing() {
    let text = STATION_CONFIG.replace("[correction]\n", "[correction]\nzero_fill_factor = 0\n");
    let err = PipelineConfig::from_toml_str(&text).unwrap_err();
    assert!(err.to_string().contains("zero fill factor"), "{}", err);
}

#[test]
fn test_missing_config_file() {
    let err = PipelineConfig::from_toml_file("/nonexistent/phasesonar.toml").unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn test_invalid_configs_are_rejected() {
    for text in [
        "[sampling]\nrepetition_rate = \"fast\"\n",
        "[sampling]\nsample_rate = -1.0\n",
        "[slice]\nruler = \"fixed\"\n",
        "[correction]\nphase_extractor = \"specified-range\"\nrange_start = 50\nrange_end = 40\n",
        "[consumer]\nthreads = 0\n",
        "[correction]\napodizer = \"kaiser\"\n",
        "[correction]\nzero_fill_factor = 0\n",
        "[correction]\nzero_fill_factor = 60\n",
        "[crest]\nmin_points_before_crest = 70000\n",
    ] {
        let result = PipelineConfig::from_toml_str(text);
        assert!(
            matches!(result, Err(PipelineError::Config(_))),
            "accepted: {}",
            text
        );
    }
}
