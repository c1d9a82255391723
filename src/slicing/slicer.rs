use crate::config::{AlignerKind, CrestConfig, RulerKind, SliceConfig};

/// One pulse window inside a record.
///
/// `start_index + length` never exceeds the record length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SliceInfo {
    pub start_index: usize,
    pub length: usize,
    /// Position of the crest relative to `start_index`
    pub crest_offset: usize,
}

impl SliceInfo {
    pub fn new(start_index: usize, length: usize, crest_offset: usize) -> Self {
        Self {
            start_index,
            length,
            crest_offset,
        }
    }

    pub fn end_index(&self) -> usize {
        self.start_index + self.length
    }
}

/// Estimates one period length from a crest list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruler {
    /// Shortest gap between neighbouring crests
    Min,
    /// Integer mean gap
    Average,
    Fixed(usize),
}

impl Ruler {
    pub fn from_config(config: &SliceConfig) -> Self {
        match config.ruler {
            RulerKind::Min => Self::Min,
            RulerKind::Average => Self::Average,
            RulerKind::Fixed => Self::Fixed(config.fixed_length.unwrap_or(0)),
        }
    }

    /// Period length in samples. With fewer than two crests the measured
    /// rulers fall back to `full_length`.
    pub fn measure(&self, crests: &[usize], full_length: usize) -> usize {
        if let Self::Fixed(length) = self {
            return *length;
        }
        if crests.len() < 2 {
            return full_length;
        }
        match self {
            Self::Min => crests
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .min()
                .unwrap_or(full_length),
            Self::Average => (crests[crests.len() - 1] - crests[0]) / (crests.len() - 1),
            Self::Fixed(length) => *length,
        }
    }
}

/// Decides where the crest sits inside its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aligner {
    /// Fixed number of samples before the crest
    Left(usize),
    /// Crest in the middle of the window
    Center,
}

impl Aligner {
    pub fn from_config(slice: &SliceConfig, crest: &CrestConfig) -> Self {
        match slice.aligner {
            AlignerKind::Left => Self::Left(crest.min_points_before_crest),
            AlignerKind::Center => Self::Center,
        }
    }

    pub fn crest_offset(&self, period_length: usize) -> usize {
        match self {
            Self::Left(points_before) => *points_before,
            Self::Center => period_length / 2,
        }
    }
}

/// Single-channel slicer: one window per crest, all of one common length.
#[derive(Debug, Clone, Copy)]
pub struct Slicer {
    ruler: Ruler,
    aligner: Aligner,
}

impl Slicer {
    pub fn new(ruler: Ruler, aligner: Aligner) -> Self {
        Self { ruler, aligner }
    }

    pub fn from_config(slice: &SliceConfig, crest: &CrestConfig) -> Self {
        Self::new(Ruler::from_config(slice), Aligner::from_config(slice, crest))
    }

    pub fn ruler(&self) -> Ruler {
        self.ruler
    }

    /// Slice a record of `waveform_len` samples around `crests`.
    ///
    /// Windows that would start before zero or run past the record are
    /// dropped; an empty result is not an error.
    pub fn slice(&self, waveform_len: usize, crests: &[usize]) -> Vec<SliceInfo> {
        if crests.is_empty() {
            return Vec::new();
        }
        let period = self.ruler.measure(crests, waveform_len);
        self.slice_with_period(waveform_len, crests, period)
    }

    pub fn slice_with_period(
        &self,
        waveform_len: usize,
        crests: &[usize],
        period: usize,
    ) -> Vec<SliceInfo> {
        if period == 0 {
            return Vec::new();
        }
        let offset = self.aligner.crest_offset(period);
        let slices: Vec<SliceInfo> = crests
            .iter()
            .filter_map(|&crest| crest.checked_sub(offset))
            .filter(|&start| start + period <= waveform_len)
            .map(|start| SliceInfo::new(start, period, offset))
            .collect();

        if slices.len() < crests.len() {
            log::trace!(
                "Dropped {} of {} slices at record edges",
                crests.len() - slices.len(),
                crests.len()
            );
        }
        slices
    }
}
