use crate::config::{CrestConfig, CrestPolarity, PipelineConfig, SamplingConfig};

/// Crest detector for periodic interferogram bursts
///
/// Scans a record for the running maximum. A candidate is confirmed once the
/// scan has moved more than `right_threshold` samples past it without finding
/// anything larger, where
///
/// ```text
/// right_threshold = sample_rate / (repetition_rate + margin_hz)
/// ```
///
/// is a little shorter than one period. Confirmed candidates are kept when they
/// exceed the vertical threshold and lie beyond `min_points_before_crest`.
#[derive(Debug, Clone)]
pub struct CrestFinder {
    right_threshold: usize,
    vertical_threshold: f64,
    min_points_before_crest: usize,
    polarity: CrestPolarity,
}

impl CrestFinder {
    pub fn new(sampling: &SamplingConfig, crest: &CrestConfig) -> Self {
        let window = sampling.sample_rate / (sampling.repetition_rate.as_hz() + crest.margin_hz);
        Self {
            right_threshold: window.max(1.0) as usize,
            vertical_threshold: crest.vertical_threshold,
            min_points_before_crest: crest.min_points_before_crest,
            polarity: crest.polarity,
        }
    }

    pub fn right_threshold(&self) -> usize {
        self.right_threshold
    }

    pub fn vertical_threshold(&self) -> f64 {
        self.vertical_threshold
    }

    pub fn set_vertical_threshold(&mut self, threshold: f64) {
        self.vertical_threshold = threshold;
    }

    /// Find all crests in `waveform`, in increasing order.
    pub fn find(&self, waveform: &[f64]) -> Vec<usize> {
        let mut crests = Vec::new();
        let mut max_value = 0.0;
        let mut max_index = 0;

        for (i, &sample) in waveform.iter().enumerate() {
            let value = match self.polarity {
                CrestPolarity::Absolute => sample.abs(),
                CrestPolarity::Positive => sample,
            };
            if value > max_value {
                max_value = value;
                max_index = i;
            }
            if i - max_index > self.right_threshold {
                if max_value > self.vertical_threshold && max_index > self.min_points_before_crest
                {
                    crests.push(max_index);
                }
                max_value = 0.0;
                max_index = i;
            }
        }
        crests
    }
}

/// Crest finder that tunes its vertical threshold per record
///
/// Each round compares the measured crest rate against the expected
/// repetition rate: too many crests raise the threshold by 20%, too few lower
/// it by 10%. Tuning stops when the rate falls inside the tolerance band, when
/// the threshold reaches its floor, or after `max_adjust_iterations` rounds;
/// the last two return one more plain find. The tuned threshold carries over
/// to the next record.
#[derive(Debug, Clone)]
pub struct AutoAdjustCrestFinder {
    finder: CrestFinder,
    sample_rate: f64,
    repetition_rate: f64,
    rate_tolerance: f64,
    threshold_floor: f64,
    max_iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateVerdict {
    TooHigh,
    TooLow,
    InBand,
}

impl AutoAdjustCrestFinder {
    pub fn new(sampling: &SamplingConfig, crest: &CrestConfig) -> Self {
        Self {
            finder: CrestFinder::new(sampling, crest),
            sample_rate: sampling.sample_rate,
            repetition_rate: sampling.repetition_rate.as_hz(),
            rate_tolerance: crest.rate_tolerance_hz,
            threshold_floor: crest.threshold_floor,
            max_iterations: crest.max_adjust_iterations,
        }
    }

    pub fn vertical_threshold(&self) -> f64 {
        self.finder.vertical_threshold()
    }

    /// Crests per second for a record of `len` samples.
    pub fn crest_rate(&self, count: usize, len: usize) -> f64 {
        count as f64 / (len as f64 / self.sample_rate)
    }

    fn verdict(&self, count: usize, len: usize) -> RateVerdict {
        let rate = self.crest_rate(count, len);
        if rate > self.repetition_rate + self.rate_tolerance {
            RateVerdict::TooHigh
        } else if rate < self.repetition_rate - self.rate_tolerance {
            RateVerdict::TooLow
        } else {
            RateVerdict::InBand
        }
    }

    pub fn find(&mut self, waveform: &[f64]) -> Vec<usize> {
        if waveform.is_empty() {
            return Vec::new();
        }

        for _ in 0..self.max_iterations {
            let crests = self.finder.find(waveform);
            let threshold = self.finder.vertical_threshold();
            match self.verdict(crests.len(), waveform.len()) {
                RateVerdict::InBand => return crests,
                RateVerdict::TooHigh => self.finder.set_vertical_threshold(threshold * 1.2),
                RateVerdict::TooLow => {
                    if threshold <= self.threshold_floor {
                        break;
                    }
                    self.finder
                        .set_vertical_threshold((threshold * 0.9).max(self.threshold_floor));
                }
            }
        }

        log::debug!(
            "Crest threshold settled at {:.4} without matching {:.1} Hz",
            self.finder.vertical_threshold(),
            self.repetition_rate
        );
        self.finder.find(waveform)
    }
}

/// Crest detection strategy selected by configuration.
#[derive(Debug, Clone)]
pub enum CrestLocator {
    Fixed(CrestFinder),
    AutoAdjust(AutoAdjustCrestFinder),
}

impl CrestLocator {
    pub fn new(config: &PipelineConfig) -> Self {
        if config.crest.auto_adjust {
            Self::AutoAdjust(AutoAdjustCrestFinder::new(&config.sampling, &config.crest))
        } else {
            Self::Fixed(CrestFinder::new(&config.sampling, &config.crest))
        }
    }

    pub fn find(&mut self, waveform: &[f64]) -> Vec<usize> {
        match self {
            Self::Fixed(finder) => finder.find(waveform),
            Self::AutoAdjust(finder) => finder.find(waveform),
        }
    }

    pub fn vertical_threshold(&self) -> f64 {
        match self {
            Self::Fixed(finder) => finder.vertical_threshold(),
            Self::AutoAdjust(finder) => finder.vertical_threshold(),
        }
    }
}
