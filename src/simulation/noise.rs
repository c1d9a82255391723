use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// Add Gaussian white noise of standard deviation `std_dev`.
pub fn add_white_noise(signal: &mut [f64], std_dev: f64, seed: Option<u64>) {
    let Ok(normal) = Normal::new(0.0, std_dev) else {
        log::warn!("Invalid noise deviation {}, signal left clean", std_dev);
        return;
    };
    let mut rng = create_rng(seed);
    for sample in signal.iter_mut() {
        *sample += normal.sample(&mut rng);
    }
}

/// Replace `±half_width` samples around `crest` with uniform noise in
/// `[-amplitude, amplitude)`, keeping the crest sample itself.
///
/// With `amplitude` below the crest value the burst is still detected but its
/// spectrum no longer carries a usable phase.
pub fn corrupt_burst(signal: &mut [f64], crest: usize, half_width: usize, amplitude: f64, seed: u64) {
    if crest >= signal.len() {
        return;
    }
    let keep = signal[crest];
    let start = crest.saturating_sub(half_width);
    let end = (crest + half_width).min(signal.len());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for sample in &mut signal[start..end] {
        *sample = amplitude * (2.0 * rng.random::<f64>() - 1.0);
    }
    signal[crest] = keep;
}

/// Mean power of a signal.
pub fn signal_power(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x * x).sum::<f64>() / signal.len() as f64
}
