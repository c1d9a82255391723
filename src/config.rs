//! Configuration for the phasesonar pipeline.
//!
//! Every component takes the slice of configuration it needs at construction
//! time. There is no global settings object; a run is described by one
//! [`PipelineConfig`], usually loaded from TOML:
//!
//! ```toml
//! [sampling]
//! sample_rate = 100e6
//! repetition_rate = "1.5khz"
//!
//! [correction]
//! phase_extractor = "specified-range"
//! range_start = 150
//! range_end = 420
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Pulse repetition rate of the interferogram train.
///
/// Can be specified either as a frequency or as a period, which is handy when
/// the comb detuning is known as a period.
///
/// # Parsing formats
/// - `1000` - frequency in Hz (no suffix)
/// - `1000hz` or `1000Hz` - frequency in Hz (explicit)
/// - `1.5khz` or `1.5kHz` - frequency in kHz
/// - `665us` or `665μs` - period in microseconds
///
/// # Example
/// ```
/// use phasesonar::config::RepetitionRate;
///
/// let rate: RepetitionRate = "500us".parse().unwrap();
/// assert!((rate.as_hz() - 2000.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RateValue")]
pub struct RepetitionRate(f64);

impl RepetitionRate {
    pub fn from_hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn from_interval_us(us: f64) -> Self {
        Self(1_000_000.0 / us)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }

    pub fn as_interval_us(&self) -> f64 {
        1_000_000.0 / self.0
    }
}

impl Default for RepetitionRate {
    fn default() -> Self {
        Self::from_hz(1000.0)
    }
}

impl fmt::Display for RepetitionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}hz", self.0)
    }
}

impl FromStr for RepetitionRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(num) = s.strip_suffix("us").or_else(|| s.strip_suffix("μs")) {
            let us: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid interval: {}", s))?;
            if us <= 0.0 {
                return Err("interval must be positive".to_string());
            }
            return Ok(Self::from_interval_us(us));
        }

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("khz") {
            (num, 1_000.0)
        } else if let Some(num) = lower.strip_suffix("hz") {
            (num, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let hz: f64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid frequency: {}", s))?;
        if hz <= 0.0 {
            return Err("frequency must be positive".to_string());
        }
        Ok(Self::from_hz(hz * scale))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RateValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RateValue> for RepetitionRate {
    type Error = String;

    fn try_from(value: RateValue) -> std::result::Result<Self, Self::Error> {
        match value {
            RateValue::Number(hz) if hz > 0.0 => Ok(Self::from_hz(hz)),
            RateValue::Number(_) => Err("frequency must be positive".to_string()),
            RateValue::Text(s) => s.parse(),
        }
    }
}

/// Whole-pipeline configuration
///
/// # Example
/// ```
/// use phasesonar::config::PipelineConfig;
///
/// let mut config = PipelineConfig::default();
/// config.consumer.threads = 2;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Acquisition timing
    pub sampling: SamplingConfig,
    /// Crest detection
    pub crest: CrestConfig,
    /// Period estimation and window alignment
    pub slice: SliceConfig,
    /// Per-pulse correction chain
    pub correction: CorrectionConfig,
    /// Record queue and worker pool
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Digitizer sample rate in Hz
    pub sample_rate: f64,
    /// Expected pulse repetition rate
    pub repetition_rate: RepetitionRate,
}

impl SamplingConfig {
    /// Nominal period in samples, `sample_rate / repetition_rate`.
    pub fn fuzzy_period_length(&self) -> f64 {
        self.sample_rate / self.repetition_rate.as_hz()
    }
}

/// How a crest candidate's height is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrestPolarity {
    /// Compare raw sample values (positive-going bursts only)
    Positive,
    /// Compare absolute values
    #[default]
    Absolute,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrestConfig {
    /// Minimum crest height; adjusted in place when `auto_adjust` is set
    pub vertical_threshold: f64,
    /// Crests at or before this index are ignored; also the left alignment offset
    pub min_points_before_crest: usize,
    /// Added to the repetition rate when deriving the confirmation window
    pub margin_hz: f64,
    pub polarity: CrestPolarity,
    /// Tune `vertical_threshold` until the crest rate matches the repetition rate
    pub auto_adjust: bool,
    /// Accepted deviation of the measured crest rate, in Hz
    pub rate_tolerance_hz: f64,
    /// Auto adjustment stops once the threshold falls to this value
    pub threshold_floor: f64,
    /// Upper bound on auto adjustment rounds per record
    pub max_adjust_iterations: usize,
}

/// Period estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RulerKind {
    /// Shortest crest-to-crest gap
    #[default]
    Min,
    /// Integer mean of the crest-to-crest gaps
    Average,
    /// `SliceConfig::fixed_length`
    Fixed,
}

/// Where the crest sits inside its slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignerKind {
    /// Crest `min_points_before_crest` samples into the slice
    #[default]
    Left,
    /// Crest in the middle of the slice
    Center,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    pub ruler: RulerKind,
    /// Period length used by `RulerKind::Fixed`
    pub fixed_length: Option<usize>,
    pub aligner: AlignerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectorKind {
    /// Transform only, no phase correction
    Fake,
    /// Mertz phase correction
    #[default]
    Mertz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApodizerKind {
    None,
    #[default]
    Triangular,
    Hann,
    Hamming,
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseExtractorKind {
    /// Phase of every bin of the full transform
    FullSpectrum,
    /// Phase of a short central window, interpolated to full length
    #[default]
    CentralInterpolation,
    /// Linear fit over the flattest part of a configured range
    SpecifiedRange,
}

/// Phase function used by the central-interpolation extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseFunction {
    /// Four-quadrant `atan2(im, re)`
    #[default]
    Atan2,
    /// `atan(im / re)`, folded into ±π/2
    Atan,
}

/// Unit of `range_start` / `range_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RangeUnit {
    #[default]
    Bins,
    Hertz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesizerKind {
    /// `re·cos(φ) + im·sin(φ)`
    #[default]
    Real,
    /// `z·exp(-iφ)`
    Complex,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub corrector: CorrectorKind,
    /// Extra powers of two of zero padding
    pub zero_fill_factor: u32,
    pub apodizer: ApodizerKind,
    pub phase_extractor: PhaseExtractorKind,
    /// Width of the central window used for phase interpolation
    pub center_span_length: usize,
    pub phase_function: PhaseFunction,
    /// First bin (or Hz) of the phase fit range, inclusive
    pub range_start: f64,
    /// Last bin (or Hz) of the phase fit range, inclusive
    pub range_end: f64,
    pub range_unit: RangeUnit,
    /// Leap-free intervals must be longer than this to be fitted
    pub min_flat_phase_points: usize,
    /// Ceiling on the standard deviation of the fitted interval
    pub max_phase_std: f64,
    pub synthesizer: SynthesizerKind,
    /// Negate pulses whose lower half sums negative
    pub auto_flip: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Worker threads (and correctors) per pool
    pub threads: usize,
    /// Capacity of the bounded record queue
    pub queue_capacity: usize,
    /// Consumers give up on an idle producer after this long
    pub wait_timeout_ms: u64,
    /// Consecutive failed records before the source is declared invalid
    pub max_consecutive_failures: usize,
    /// Stop after this many successfully processed records
    pub target_count: Option<usize>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 100e6,
            repetition_rate: RepetitionRate::default(),
        }
    }
}

impl Default for CrestConfig {
    fn default() -> Self {
        Self {
            vertical_threshold: 0.5,
            min_points_before_crest: 1000,
            margin_hz: 300.0,
            polarity: CrestPolarity::Absolute,
            auto_adjust: true,
            rate_tolerance_hz: 250.0,
            threshold_floor: 0.055,
            max_adjust_iterations: 200,
        }
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            corrector: CorrectorKind::Mertz,
            zero_fill_factor: 1,
            apodizer: ApodizerKind::Triangular,
            phase_extractor: PhaseExtractorKind::CentralInterpolation,
            center_span_length: 512,
            phase_function: PhaseFunction::Atan2,
            range_start: 0.0,
            range_end: 0.0,
            range_unit: RangeUnit::Bins,
            min_flat_phase_points: 200,
            max_phase_std: 0.34,
            synthesizer: SynthesizerKind::Real,
            auto_flip: false,
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            queue_capacity: 16,
            wait_timeout_ms: 5000,
            max_consecutive_failures: 10,
            target_count: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Length of every pulse buffer: `2^(floor(log2(period)) + zero_fill_factor)`.
    ///
    /// Zero when that length overflows a `usize`; [`validate`](Self::validate)
    /// rejects such configurations.
    pub fn zero_filled_length(&self) -> usize {
        self.checked_zero_filled_length().unwrap_or(0)
    }

    pub fn checked_zero_filled_length(&self) -> Option<usize> {
        crate::signal_processing::zero_filled_length(
            self.sampling.fuzzy_period_length(),
            self.correction.zero_fill_factor,
        )
    }

    /// Reject combinations no component can work with.
    pub fn validate(&self) -> Result<()> {
        let sampling = &self.sampling;
        if !(sampling.sample_rate > 0.0) {
            return Err(PipelineError::Config(format!(
                "sample rate must be positive, got {}",
                sampling.sample_rate
            )));
        }
        if sampling.fuzzy_period_length() < 2.0 {
            return Err(PipelineError::Config(format!(
                "repetition rate {} leaves fewer than 2 samples per period",
                sampling.repetition_rate
            )));
        }
        if self.crest.threshold_floor <= 0.0 {
            return Err(PipelineError::Config(
                "threshold floor must be positive".to_string(),
            ));
        }
        if self.slice.ruler == RulerKind::Fixed && self.slice.fixed_length.unwrap_or(0) == 0 {
            return Err(PipelineError::Config(
                "fixed ruler needs a non-zero fixed_length".to_string(),
            ));
        }

        let correction = &self.correction;
        if correction.zero_fill_factor == 0 {
            return Err(PipelineError::Config(
                "zero fill factor must be at least 1".to_string(),
            ));
        }
        let buffer_len = self.checked_zero_filled_length().ok_or_else(|| {
            PipelineError::Config(format!(
                "zero fill factor {} overflows the pulse buffer length",
                correction.zero_fill_factor
            ))
        })?;
        if self.slice.aligner == AlignerKind::Left
            && self.crest.min_points_before_crest > buffer_len / 2
        {
            return Err(PipelineError::Config(format!(
                "{} points before the crest do not fit in half of a {}-sample buffer",
                self.crest.min_points_before_crest, buffer_len
            )));
        }
        if correction.phase_extractor == PhaseExtractorKind::CentralInterpolation
            && (correction.center_span_length < 2 || correction.center_span_length > buffer_len)
        {
            return Err(PipelineError::Config(format!(
                "center span {} must lie in 2..={}",
                correction.center_span_length, buffer_len
            )));
        }
        if correction.phase_extractor == PhaseExtractorKind::SpecifiedRange
            && !(correction.range_end > correction.range_start && correction.range_start >= 0.0)
        {
            return Err(PipelineError::Config(format!(
                "phase range {}..={} is empty",
                correction.range_start, correction.range_end
            )));
        }

        if self.consumer.threads == 0 || self.consumer.queue_capacity == 0 {
            return Err(PipelineError::Config(
                "consumer needs at least one thread and one queue slot".to_string(),
            ));
        }
        Ok(())
    }
}
