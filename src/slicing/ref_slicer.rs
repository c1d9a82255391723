use super::slicer::{SliceInfo, Slicer};
use crate::error::{PipelineError, Result};

/// Slices of the two interleaved pulse families of a dual-channel record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlicePair {
    pub first: Vec<SliceInfo>,
    pub second: Vec<SliceInfo>,
}

/// Dual-channel slicer
///
/// Gas and reference pulses alternate in one record. The first three crests
/// seed the grouping: `crests[0]` and `crests[1]` start the two families and
/// `crests[2] - crests[0]` is the family period. A crest joins a family when
/// its distance from the family seed is within 10% of a whole number of
/// periods, and when it lies more than `period / 1.7` after the family's last
/// member (which rejects doubled detections of one burst).
#[derive(Debug, Clone, Copy)]
pub struct RefSlicer {
    slicer: Slicer,
}

impl RefSlicer {
    pub fn new(slicer: Slicer) -> Self {
        Self { slicer }
    }

    /// Split `crests` into the two families.
    pub fn group(crests: &[usize]) -> Result<(Vec<usize>, Vec<usize>)> {
        if crests.len() < 3 {
            return Err(PipelineError::Slicing(format!(
                "need at least 3 crests to group pulse families, found {}",
                crests.len()
            )));
        }
        let period = (crests[2] - crests[0]) as f64;
        let first_seed = crests[0];
        let second_seed = crests[1];
        let min_spacing = period / 1.7;

        let mut first = Vec::new();
        let mut second = Vec::new();
        for &crest in crests {
            if is_near(crest, first_seed, period) {
                push_spaced(&mut first, crest, min_spacing);
            } else if is_near(crest, second_seed, period) {
                push_spaced(&mut second, crest, min_spacing);
            }
        }
        Ok((first, second))
    }

    /// Group and slice each family with its own period.
    pub fn slice(&self, waveform_len: usize, crests: &[usize]) -> Result<SlicePair> {
        let (first, second) = Self::group(crests)?;
        Ok(SlicePair {
            first: self.slicer.slice(waveform_len, &first),
            second: self.slicer.slice(waveform_len, &second),
        })
    }
}

fn is_near(crest: usize, seed: usize, period: f64) -> bool {
    let ratio = (crest as f64 - seed as f64) / period;
    (ratio - ratio.round()).abs() < 0.1
}

fn push_spaced(family: &mut Vec<usize>, crest: usize, min_spacing: f64) {
    match family.last() {
        Some(&last) if crest.saturating_sub(last) as f64 <= min_spacing => {}
        _ => family.push(crest),
    }
}
