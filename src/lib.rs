pub mod analysis;
pub mod config;
pub mod consumer;
pub mod correction;
pub mod error;
pub mod output;
pub mod signal_processing;
pub mod slicing;
pub mod source;
pub mod spectrum;
pub mod wav;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use analysis::{AccumulationResult, Accumulator, ParallelAccumulator, SplitResult, Splitter};
pub use config::PipelineConfig;
pub use error::{PipelineError, ProcessException, Result};
pub use spectrum::{Spectrum, SpectrumKind};
pub use wav::save_record_wav;
