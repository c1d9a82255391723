use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spectrum length mismatch: expected {expected} bins, got {actual}")]
    SpectrumLengthMismatch { expected: usize, actual: usize },

    #[error("Cannot absorb a {actual:?} spectrum into a {expected:?} spectrum")]
    SpectrumKindMismatch {
        expected: crate::spectrum::SpectrumKind,
        actual: crate::spectrum::SpectrumKind,
    },

    #[error("Slicing failed: {0}")]
    Slicing(String),

    #[error("Record source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Record-level outcome kinds.
///
/// These are carried inside [`AccumulationResult`](crate::analysis::AccumulationResult)
/// and [`SplitResult`](crate::analysis::SplitResult) rather than returned as
/// errors: a record that fails is still a processed record.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ProcessException {
    #[error("no crest found in record")]
    NoPeakFound,

    #[error("no valid slice in record")]
    NoSliceValid,

    #[error("no flat phase interval found")]
    NoFlatPhaseIntervalFound,
}

/// Reasons the flat-phase fit can reject a pulse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhaseFitError {
    #[error("every leap-free phase interval is {min_points} points or shorter")]
    AllIntervalsTooShort { min_points: usize },

    #[error("phase std {std:.3} exceeds ceiling {max:.3}")]
    StdTooLarge { std: f64, max: f64 },

    #[error("phase range {start}..={end} outside spectrum of {len} bins")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
}

/// Per-pulse failure. Recovered locally by skipping the slice.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectFailure {
    #[error("crest at offset {crest_offset} lies right of buffer center {center}")]
    Symmetrize { crest_offset: usize, center: usize },

    #[error("phase extraction failed: {0}")]
    PhaseFit(#[from] PhaseFitError),
}
