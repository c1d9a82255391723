use std::f64::consts::PI;

/// Adjacent phase differences above this are treated as wraps (or leaps).
pub const LEAP_THRESHOLD: f64 = 0.7 * PI;

/// Remove ±2π wraps wherever adjacent samples differ by more than `threshold`.
pub fn unwrap_phase_in_place(phase: &mut [f64], threshold: f64) {
    let mut offset = 0.0;
    let mut previous = match phase.first() {
        Some(&p) => p,
        None => return,
    };
    for p in phase.iter_mut().skip(1) {
        let raw = *p;
        let diff = raw - previous;
        if diff > threshold {
            offset -= 2.0 * PI;
        } else if diff < -threshold {
            offset += 2.0 * PI;
        }
        previous = raw;
        *p = raw + offset;
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). Zero for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Straight line `intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Least-squares line through `(first_x + i, y[i])`.
pub fn linear_fit(first_x: f64, y: &[f64]) -> LineFit {
    let n = y.len() as f64;
    if y.len() < 2 {
        return LineFit {
            intercept: y.first().copied().unwrap_or(0.0),
            slope: 0.0,
        };
    }
    // centred x keeps the normal equations well conditioned for large bin indices
    let x_mean = first_x + (n - 1.0) / 2.0;
    let y_mean = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &v) in y.iter().enumerate() {
        let dx = first_x + i as f64 - x_mean;
        sxy += dx * (v - y_mean);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    LineFit {
        intercept: y_mean - slope * x_mean,
        slope,
    }
}

/// `count` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}
