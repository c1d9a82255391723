pub mod corrector;
pub mod phase_extractor;
pub mod synthesizer;

pub use corrector::{CorrectStage, CorrectionObserver, Corrector, CorrectorBuilder};
pub use phase_extractor::{
    CentralInterpolation, FlatPhaseParams, PhaseExtractor, PhaseRange, SpecifiedRange,
    fit_flat_phase,
};
pub use synthesizer::PhaseSynthesizer;
