use std::collections::HashMap;
use std::f64::consts::PI;

use crate::config::ApodizerKind;

/// Multiplies a pulse by a window before transform.
///
/// Windows are built on first use and kept per instance: triangular windows
/// per `(length, peak)`, the spectral windows per length.
#[derive(Debug, Clone)]
pub struct Apodizer {
    kind: ApodizerKind,
    cache: HashMap<(usize, usize), Vec<f64>>,
}

impl Apodizer {
    pub fn new(kind: ApodizerKind) -> Self {
        Self {
            kind,
            cache: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ApodizerKind {
        self.kind
    }

    /// Apply the window centred on `buffer.len() / 2`.
    pub fn apodize(&mut self, buffer: &mut [f64]) {
        self.apodize_at(buffer, buffer.len() / 2);
    }

    /// Apply the window with its peak at `peak` (only triangular windows use it).
    pub fn apodize_at(&mut self, buffer: &mut [f64], peak: usize) {
        let len = buffer.len();
        if self.kind == ApodizerKind::None || len < 2 {
            return;
        }
        let key = match self.kind {
            ApodizerKind::Triangular => (len, peak.min(len - 1)),
            _ => (len, 0),
        };
        let kind = self.kind;
        let window = self
            .cache
            .entry(key)
            .or_insert_with(|| build_window(kind, key.0, key.1));
        for (sample, w) in buffer.iter_mut().zip(window.iter()) {
            *sample *= w;
        }
    }
}

fn build_window(kind: ApodizerKind, len: usize, peak: usize) -> Vec<f64> {
    let last = (len - 1) as f64;
    match kind {
        ApodizerKind::None => vec![1.0; len],
        ApodizerKind::Triangular => triangular_ramp(len, peak),
        ApodizerKind::Hann => (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / last).cos())
            .collect(),
        ApodizerKind::Hamming => (0..len)
            .map(|i| 0.53836 - 0.46164 * (2.0 * PI * i as f64 / last).cos())
            .collect(),
        ApodizerKind::Cosine => (0..len).map(|i| (PI * i as f64 / last).sin()).collect(),
    }
}

/// One at `peak`, zero at index 0. The falling edge mirrors the rising one
/// unless the far end is further away, in which case it reaches zero there.
fn triangular_ramp(len: usize, peak: usize) -> Vec<f64> {
    let falling = peak.max(len - peak - 1);
    (0..len)
        .map(|i| {
            if i <= peak {
                if peak == 0 { 1.0 } else { i as f64 / peak as f64 }
            } else {
                (1.0 - (i - peak) as f64 / falling as f64).max(0.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_identity() {
        let mut apodizer = Apodizer::new(ApodizerKind::None);
        let mut buffer = vec![2.0; 16];
        apodizer.apodize(&mut buffer);
        assert!(buffer.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_triangular_shape() {
        let mut apodizer = Apodizer::new(ApodizerKind::Triangular);
        let mut buffer = vec![1.0; 9];
        apodizer.apodize(&mut buffer);
        // peak at 4, falls to zero at 8
        assert_eq!(buffer[0], 0.0);
        assert!((buffer[2] - 0.5).abs() < 1e-12);
        assert_eq!(buffer[4], 1.0);
        assert!((buffer[6] - 0.5).abs() < 1e-12);
        assert!(buffer[8].abs() < 1e-12);
    }

    #[test]
    fn test_triangular_cached_per_peak() {
        let mut apodizer = Apodizer::new(ApodizerKind::Triangular);
        let mut a = vec![1.0; 10];
        let mut b = vec![1.0; 10];
        apodizer.apodize_at(&mut a, 2);
        apodizer.apodize_at(&mut b, 6);
        assert_eq!(a[2], 1.0);
        assert_eq!(b[6], 1.0);
        assert!(a[6] < 1.0);
        assert_eq!(apodizer.cache.len(), 2);
    }

    #[test]
    fn test_hann_endpoints_and_center() {
        let mut apodizer = Apodizer::new(ApodizerKind::Hann);
        let mut buffer = vec![1.0; 11];
        apodizer.apodize(&mut buffer);
        assert!(buffer[0].abs() < 1e-12);
        assert!(buffer[10].abs() < 1e-12);
        assert!((buffer[5] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hamming_and_cosine_are_symmetric() {
        for kind in [ApodizerKind::Hamming, ApodizerKind::Cosine] {
            let mut apodizer = Apodizer::new(kind);
            let mut buffer = vec![1.0; 32];
            apodizer.apodize(&mut buffer);
            for i in 0..16 {
                assert!(
                    (buffer[i] - buffer[31 - i]).abs() < 1e-12,
                    "{:?} asymmetric at {}",
                    kind,
                    i
                );
            }
        }
    }
}
