//! Phase curves for Mertz correction.
//!
//! Every extractor returns one phase value per bin of the half spectrum. The
//! raw phase of a full-resolution transform is only trustworthy where the
//! signal is strong, so the useful extractors derive the curve from a region
//! they can trust and stretch it over the whole axis:
//!
//! - [`CentralInterpolation`] transforms only the central `±half_width` samples
//!   of the pulse (a low resolution, high SNR phase) and interpolates it up.
//! - [`SpecifiedRange`] fits a straight line to the flattest leap-free part of
//!   a configured frequency band and extrapolates it.

use num_complex::Complex64;

use crate::config::{CorrectionConfig, PhaseExtractorKind, PhaseFunction, RangeUnit};
use crate::error::PhaseFitError;
use crate::signal_processing::{
    Apodizer, FourierTransform, LEAP_THRESHOLD, LineFit, LinearInterpolator, linear_fit, rotate,
    std_dev, unwrap_phase_in_place,
};

/// Thresholds for the flat-interval search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPhaseParams {
    /// Intervals must span more than this many points
    pub min_flat_points: usize,
    /// Ceiling on the selected interval's standard deviation
    pub max_phase_std: f64,
}

impl Default for FlatPhaseParams {
    fn default() -> Self {
        Self {
            min_flat_points: 200,
            max_phase_std: 0.34,
        }
    }
}

/// Fit a line to the smoothest stretch of an unwrapped phase curve.
///
/// `phase[i]` belongs to bin `first_bin + i`. Adjacent jumps larger than
/// [`LEAP_THRESHOLD`] split the curve into intervals; intervals not longer than
/// `min_flat_points` are discarded and the one with the lowest standard
/// deviation is fitted (the first one wins a tie). Without any leap the whole
/// curve is fitted. The returned line is in absolute bin coordinates.
pub fn fit_flat_phase(
    phase: &[f64],
    first_bin: usize,
    params: &FlatPhaseParams,
) -> Result<LineFit, PhaseFitError> {
    let leaps: Vec<usize> = (1..phase.len())
        .filter(|&i| (phase[i] - phase[i - 1]).abs() > LEAP_THRESHOLD)
        .collect();

    if leaps.is_empty() {
        let std = std_dev(phase);
        if std > params.max_phase_std {
            return Err(PhaseFitError::StdTooLarge {
                std,
                max: params.max_phase_std,
            });
        }
        return Ok(linear_fit(first_bin as f64, phase));
    }

    let mut bounds = Vec::with_capacity(leaps.len() + 2);
    bounds.push(0);
    bounds.extend_from_slice(&leaps);
    bounds.push(phase.len());

    let mut best: Option<(usize, usize, f64)> = None;
    for pair in bounds.windows(2) {
        let (start, end) = (pair[0], pair[1] - 1);
        if end - start <= params.min_flat_points {
            continue;
        }
        let std = std_dev(&phase[start..=end]);
        match best {
            Some((_, _, best_std)) if std >= best_std => {}
            _ => best = Some((start, end, std)),
        }
    }

    let (start, end, std) = best.ok_or(PhaseFitError::AllIntervalsTooShort {
        min_points: params.min_flat_points,
    })?;
    if std > params.max_phase_std {
        return Err(PhaseFitError::StdTooLarge {
            std,
            max: params.max_phase_std,
        });
    }
    log::trace!(
        "Flat phase interval bins {}..={} (std {:.4})",
        first_bin + start,
        first_bin + end,
        std
    );
    Ok(linear_fit((first_bin + start) as f64, &phase[start..=end]))
}

fn atan_phase(z: &Complex64) -> f64 {
    if z.re == 0.0 {
        if z.im > 0.0 {
            std::f64::consts::FRAC_PI_2
        } else if z.im < 0.0 {
            -std::f64::consts::FRAC_PI_2
        } else {
            0.0
        }
    } else {
        (z.im / z.re).atan()
    }
}

fn bin_phase(function: PhaseFunction, z: &Complex64) -> f64 {
    match function {
        PhaseFunction::Atan2 => z.arg(),
        PhaseFunction::Atan => atan_phase(z),
    }
}

/// Phase from a short central window, interpolated to full length.
#[derive(Debug)]
pub struct CentralInterpolation {
    half_width: usize,
    phase_function: PhaseFunction,
    apodizer: Apodizer,
    fft: FourierTransform,
    window: Vec<f64>,
    short_phase: Vec<f64>,
    full_phase: Vec<f64>,
    interpolator: Option<((usize, usize), LinearInterpolator)>,
}

impl CentralInterpolation {
    pub fn new(half_width: usize, apodizer: Apodizer, phase_function: PhaseFunction) -> Self {
        let half_width = half_width.max(1);
        Self {
            half_width,
            phase_function,
            apodizer,
            fft: FourierTransform::new(2 * half_width),
            window: Vec::new(),
            short_phase: Vec::new(),
            full_phase: Vec::new(),
            interpolator: None,
        }
    }

    fn extract(&mut self, symmetric: &[f64], out: &mut [f64]) {
        let n = symmetric.len();
        let center = n / 2;
        let half_width = self.half_width.min(center);
        let width = 2 * half_width;

        self.window.clear();
        self.window
            .extend_from_slice(&symmetric[center - half_width..center + half_width]);
        self.apodizer.apodize(&mut self.window);
        rotate(&mut self.window);

        let spectrum = self.fft.forward_real(&self.window);
        self.short_phase.clear();
        self.short_phase
            .extend(spectrum.iter().map(|z| bin_phase(self.phase_function, z)));

        let key = (width, n);
        if self.interpolator.as_ref().map(|(cached, _)| *cached) != Some(key) {
            self.interpolator = Some((key, LinearInterpolator::new(width, n)));
        }
        self.full_phase.resize(n, 0.0);
        if let Some((_, interpolator)) = &self.interpolator {
            interpolator.interpolate_into(&self.short_phase, &mut self.full_phase);
        }
        out.copy_from_slice(&self.full_phase[..out.len()]);
    }
}

/// Bin range of the flat-phase search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseRange {
    /// Inclusive bin indices
    Bins { start: usize, end: usize },
    /// Inclusive frequency band, mapped to bins of the full transform
    Frequency {
        start_hz: f64,
        end_hz: f64,
        sample_rate: f64,
    },
}

impl PhaseRange {
    /// Bin indices for a transform of `full_len` points, checked against the
    /// half spectrum.
    pub fn resolve(&self, full_len: usize) -> Result<(usize, usize), PhaseFitError> {
        let (start, end) = match *self {
            Self::Bins { start, end } => (start, end),
            Self::Frequency {
                start_hz,
                end_hz,
                sample_rate,
            } => {
                let factor = full_len as f64 / sample_rate;
                ((start_hz * factor) as usize, (end_hz * factor) as usize)
            }
        };
        let half = full_len / 2;
        if start > end || end >= half {
            return Err(PhaseFitError::RangeOutOfBounds {
                start,
                end,
                len: half,
            });
        }
        Ok((start, end))
    }
}

/// Linear phase fitted over the flattest part of a fixed band.
#[derive(Debug, Clone)]
pub struct SpecifiedRange {
    range: PhaseRange,
    params: FlatPhaseParams,
    range_phase: Vec<f64>,
}

impl SpecifiedRange {
    pub fn new(range: PhaseRange, params: FlatPhaseParams) -> Self {
        Self {
            range,
            params,
            range_phase: Vec::new(),
        }
    }

    fn extract(&mut self, spectrum: &[Complex64], out: &mut [f64]) -> Result<(), PhaseFitError> {
        let (start, end) = self.range.resolve(spectrum.len())?;
        self.range_phase.clear();
        self.range_phase
            .extend(spectrum[start..=end].iter().map(|z| z.arg()));
        unwrap_phase_in_place(&mut self.range_phase, LEAP_THRESHOLD);

        let fit = fit_flat_phase(&self.range_phase, start, &self.params)?;
        for (i, p) in out.iter_mut().enumerate() {
            *p = fit.at(i as f64);
        }
        Ok(())
    }
}

/// Phase extraction strategy of a Mertz corrector.
#[derive(Debug)]
pub enum PhaseExtractor {
    /// Raw per-bin phase of the full transform
    FullSpectrum,
    CentralInterpolation(CentralInterpolation),
    SpecifiedRange(SpecifiedRange),
}

impl PhaseExtractor {
    pub fn from_config(config: &CorrectionConfig, sample_rate: f64) -> Self {
        match config.phase_extractor {
            PhaseExtractorKind::FullSpectrum => Self::FullSpectrum,
            PhaseExtractorKind::CentralInterpolation => {
                Self::CentralInterpolation(CentralInterpolation::new(
                    config.center_span_length / 2,
                    Apodizer::new(config.apodizer),
                    config.phase_function,
                ))
            }
            PhaseExtractorKind::SpecifiedRange => {
                let range = match config.range_unit {
                    RangeUnit::Bins => PhaseRange::Bins {
                        start: config.range_start as usize,
                        end: config.range_end as usize,
                    },
                    RangeUnit::Hertz => PhaseRange::Frequency {
                        start_hz: config.range_start,
                        end_hz: config.range_end,
                        sample_rate,
                    },
                };
                Self::SpecifiedRange(SpecifiedRange::new(
                    range,
                    FlatPhaseParams {
                        min_flat_points: config.min_flat_phase_points,
                        max_phase_std: config.max_phase_std,
                    },
                ))
            }
        }
    }

    /// Write the phase of every half-spectrum bin into `out`.
    ///
    /// `symmetric` is the pulse with its crest on the center, before
    /// apodization; `spectrum` is the full transform of the apodized, rotated
    /// pulse. `out` must hold `spectrum.len() / 2` values.
    pub fn extract(
        &mut self,
        symmetric: &[f64],
        spectrum: &[Complex64],
        out: &mut [f64],
    ) -> Result<(), PhaseFitError> {
        match self {
            Self::FullSpectrum => {
                for (p, z) in out.iter_mut().zip(spectrum) {
                    *p = z.arg();
                }
                Ok(())
            }
            Self::CentralInterpolation(extractor) => {
                extractor.extract(symmetric, out);
                Ok(())
            }
            Self::SpecifiedRange(extractor) => extractor.extract(spectrum, out),
        }
    }
}
