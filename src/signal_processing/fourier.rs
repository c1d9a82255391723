use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// Unnormalized forward transform of real pulses.
///
/// Owns its plan and scratch; the plan is rebuilt only when the input length
/// changes.
pub struct FourierTransform {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
    output: Vec<Complex64>,
}

impl fmt::Debug for FourierTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FourierTransform")
            .field("size", &self.size)
            .finish()
    }
}

impl FourierTransform {
    pub fn new(size: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            size,
            fft,
            scratch,
            output: vec![Complex64::new(0.0, 0.0); size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform `input` and return the full complex spectrum.
    pub fn forward_real(&mut self, input: &[f64]) -> &[Complex64] {
        if input.len() != self.size {
            *self = Self::new(input.len());
        }
        for (out, &x) in self.output.iter_mut().zip(input) {
            *out = Complex64::new(x, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.output, &mut self.scratch);
        &self.output
    }
}
