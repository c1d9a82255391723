use num_complex::Complex64;

use crate::config::SynthesizerKind;
use crate::spectrum::SpectrumKind;

/// Applies a phase curve to a raw spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSynthesizer {
    /// `re·cos(φ) + im·sin(φ)`, the in-phase projection
    Real,
    /// `z·exp(-iφ)`
    Complex,
}

impl PhaseSynthesizer {
    pub fn from_kind(kind: SynthesizerKind) -> Self {
        match kind {
            SynthesizerKind::Real => Self::Real,
            SynthesizerKind::Complex => Self::Complex,
        }
    }

    pub fn output_kind(&self) -> SpectrumKind {
        match self {
            Self::Real => SpectrumKind::Real,
            Self::Complex => SpectrumKind::Complex,
        }
    }

    /// Fill `out[i]` from `spectrum[i]` and `phase[i]` over the shortest of the three.
    pub fn synthesize(&self, spectrum: &[Complex64], phase: &[f64], out: &mut [Complex64]) {
        let bins = out.iter_mut().zip(spectrum).zip(phase);
        match self {
            Self::Real => {
                for ((dst, z), &p) in bins {
                    *dst = Complex64::new(z.re * p.cos() + z.im * p.sin(), 0.0);
                }
            }
            Self::Complex => {
                for ((dst, z), &p) in bins {
                    *dst = z * Complex64::from_polar(1.0, -p);
                }
            }
        }
    }
}
