//! Record-level processing: crest finding, slicing and correction combined
//! into per-record results.

pub mod accumulator;
pub mod parallel;
pub mod phase_reader;
pub mod pulse_checker;
pub mod result;
pub mod splitter;

pub use accumulator::{Accumulator, merge_totals};
pub use parallel::ParallelAccumulator;
pub use phase_reader::{PhaseReader, PhaseResult};
pub use pulse_checker::{PulseChecker, PulseInfo};
pub use result::{AccumulationResult, GasRefPair, ProcessOutcome, SplitResult};
pub use splitter::Splitter;
