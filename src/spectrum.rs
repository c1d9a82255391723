use num_complex::Complex64;

use crate::error::{PipelineError, Result};

/// Whether a spectrum carries meaningful imaginary parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SpectrumKind {
    Real,
    Complex,
}

/// Sum of one or more corrected pulse spectra.
///
/// The length is fixed at construction. Absorbing another spectrum adds it
/// bin by bin and adds its pulse count.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    data: Vec<Complex64>,
    pulse_count: usize,
    kind: SpectrumKind,
}

impl Spectrum {
    /// An all-zero spectrum holding no pulses.
    pub fn zeros(len: usize, kind: SpectrumKind) -> Self {
        Self {
            data: vec![Complex64::new(0.0, 0.0); len],
            pulse_count: 0,
            kind,
        }
    }

    /// A spectrum of one pulse.
    pub fn from_pulse(data: &[Complex64], kind: SpectrumKind) -> Self {
        Self {
            data: data.to_vec(),
            pulse_count: 1,
            kind,
        }
    }

    pub fn from_parts(data: Vec<Complex64>, pulse_count: usize, kind: SpectrumKind) -> Self {
        Self {
            data,
            pulse_count,
            kind,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pulse_count(&self) -> usize {
        self.pulse_count
    }

    pub fn kind(&self) -> SpectrumKind {
        self.kind
    }

    pub fn has_imag(&self) -> bool {
        self.kind == SpectrumKind::Complex
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// Add `other` bin by bin. Nothing changes on a length or kind mismatch.
    pub fn try_absorb(&mut self, other: &Spectrum) -> Result<()> {
        if other.kind != self.kind {
            return Err(PipelineError::SpectrumKindMismatch {
                expected: self.kind,
                actual: other.kind,
            });
        }
        if other.len() != self.len() {
            return Err(PipelineError::SpectrumLengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        for (acc, &z) in self.data.iter_mut().zip(&other.data) {
            *acc += z;
        }
        self.pulse_count += other.pulse_count;
        Ok(())
    }

    /// Add one corrected pulse.
    pub fn absorb_pulse(&mut self, pulse: &[Complex64]) -> Result<()> {
        if pulse.len() != self.len() {
            return Err(PipelineError::SpectrumLengthMismatch {
                expected: self.len(),
                actual: pulse.len(),
            });
        }
        for (acc, &z) in self.data.iter_mut().zip(pulse) {
            *acc += z;
        }
        self.pulse_count += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(Complex64::new(0.0, 0.0));
        self.pulse_count = 0;
    }

    pub fn real(&self) -> Vec<f64> {
        self.data.iter().map(|z| z.re).collect()
    }

    pub fn imag(&self) -> Vec<f64> {
        self.data.iter().map(|z| z.im).collect()
    }

    /// `|z|^2` per bin.
    pub fn intensity(&self) -> Vec<f64> {
        self.data.iter().map(|z| z.norm_sqr()).collect()
    }

    pub fn magnitude(&self) -> Vec<f64> {
        self.data.iter().map(|z| z.norm()).collect()
    }

    pub fn phase(&self) -> Vec<f64> {
        self.data.iter().map(|z| z.arg()).collect()
    }

    /// Per-pulse mean, or `None` for an empty accumulator.
    pub fn average(&self) -> Option<Vec<Complex64>> {
        if self.pulse_count == 0 {
            return None;
        }
        let n = self.pulse_count as f64;
        Some(self.data.iter().map(|z| *z / n).collect())
    }

    /// Sum of magnitudes over the lower half of the bins.
    pub fn lower_half_magnitude(&self) -> f64 {
        self.data[..self.len() / 2].iter().map(|z| z.norm()).sum()
    }

    pub fn total_intensity(&self) -> f64 {
        self.data.iter().map(|z| z.norm_sqr()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(offset: f64, len: usize, count: usize) -> Spectrum {
        let data = (0..len)
            .map(|i| Complex64::new(offset + i as f64 * 0.1, (i as f64 * 0.7 + offset).sin()))
            .collect();
        Spectrum::from_parts(data, count, SpectrumKind::Complex)
    }

    #[test]
    fn test_absorb_is_commutative() {
        let a = sample(1.0, 16, 3);
        let b = sample(-2.5, 16, 5);

        let mut ab = a.clone();
        ab.try_absorb(&b).unwrap();
        let mut ba = b.clone();
        ba.try_absorb(&a).unwrap();

        assert_eq!(ab.data(), ba.data());
        assert_eq!(ab.pulse_count(), 8);
        assert_eq!(ba.pulse_count(), 8);
    }

    #[test]
    fn test_clone_is_independent() {
        let a = sample(1.0, 8, 1);
        let mut b = a.clone();
        b.try_absorb(&a).unwrap();
        assert_eq!(a.pulse_count(), 1);
        assert!((b.data()[3].re - 2.0 * a.data()[3].re).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_leaves_receiver_untouched() {
        let mut a = sample(1.0, 8, 1);
        let before = a.clone();
        let err = a.try_absorb(&sample(1.0, 9, 1)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SpectrumLengthMismatch {
                expected: 8,
                actual: 9
            }
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_kind_mismatch() {
        let mut a = Spectrum::zeros(4, SpectrumKind::Real);
        let b = Spectrum::zeros(4, SpectrumKind::Complex);
        assert!(matches!(
            a.try_absorb(&b),
            Err(PipelineError::SpectrumKindMismatch { .. })
        ));
    }

    #[test]
    fn test_views() {
        let s = Spectrum::from_pulse(
            &[Complex64::new(3.0, 4.0), Complex64::new(0.0, -2.0)],
            SpectrumKind::Complex,
        );
        assert_eq!(s.intensity(), vec![25.0, 4.0]);
        assert_eq!(s.magnitude(), vec![5.0, 2.0]);
        assert_eq!(s.real(), vec![3.0, 0.0]);
        assert_eq!(s.imag(), vec![4.0, -2.0]);
        assert!((s.phase()[1] + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((s.lower_half_magnitude() - 5.0).abs() < 1e-12);
        assert!(s.has_imag());
    }

    #[test]
    fn test_average_and_clear() {
        let mut s = Spectrum::zeros(2, SpectrumKind::Real);
        assert!(s.average().is_none());
        s.absorb_pulse(&[Complex64::new(2.0, 0.0), Complex64::new(4.0, 0.0)])
            .unwrap();
        s.absorb_pulse(&[Complex64::new(4.0, 0.0), Complex64::new(8.0, 0.0)])
            .unwrap();
        let avg = s.average().unwrap();
        assert_eq!(avg[0].re, 3.0);
        assert_eq!(avg[1].re, 6.0);
        s.clear();
        assert_eq!(s.pulse_count(), 0);
        assert_eq!(s.total_intensity(), 0.0);
    }
}
