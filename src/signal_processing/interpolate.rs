use super::math::linspace;

/// Linear resampling of a curve defined on `0..old_len` onto `new_len`
/// evenly spaced points over the same span.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    positions: Vec<f64>,
}

impl LinearInterpolator {
    pub fn new(old_len: usize, new_len: usize) -> Self {
        let last = old_len.saturating_sub(1) as f64;
        Self {
            positions: linspace(0.0, last, new_len),
        }
    }

    pub fn output_len(&self) -> usize {
        self.positions.len()
    }

    /// Resample `values` into `out` (which must be `output_len()` long).
    pub fn interpolate_into(&self, values: &[f64], out: &mut [f64]) {
        let last = values.len().saturating_sub(1);
        for (dst, &x) in out.iter_mut().zip(&self.positions) {
            let lower = (x.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            let frac = x - lower as f64;
            *dst = match values.get(lower) {
                Some(&a) => a + (values[upper] - a) * frac,
                None => 0.0,
            };
        }
    }
}
