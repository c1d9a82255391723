pub mod crest_finder;
pub mod ref_slicer;
pub mod slicer;

pub use crest_finder::{AutoAdjustCrestFinder, CrestFinder, CrestLocator};
pub use ref_slicer::{RefSlicer, SlicePair};
pub use slicer::{Aligner, Ruler, SliceInfo, Slicer};
