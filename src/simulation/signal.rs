use std::f64::consts::PI;

/// Bursts beyond this many envelope widths from a crest are treated as zero.
const ENVELOPE_SPAN: f64 = 8.0;

/// Second pulse family interleaved with the first, as seen by a
/// dual-channel instrument.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct ReferenceFamily {
    /// Samples between a gas crest and the following reference crest
    pub offset: usize,
    pub amplitude: f64,
}

/// Description of a synthetic interferogram record.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct InterferogramConfig {
    pub sample_rate: f64,
    pub repetition_rate_hz: f64,
    pub record_len: usize,
    /// Position of the first crest
    pub first_crest: usize,
    pub amplitude: f64,
    /// Gaussian envelope standard deviation in samples
    pub envelope_width: f64,
    /// Carrier frequency in cycles per sample
    pub carrier: f64,
    /// Flips every burst, as a reversed detector would
    pub inverted: bool,
    pub reference: Option<ReferenceFamily>,
    /// Standard deviation of added white noise, 0 for none
    pub noise_std: f64,
    pub seed: Option<u64>,
}

impl Default for InterferogramConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1e6,
            repetition_rate_hz: 1000.0,
            record_len: 5000,
            first_crest: 1000,
            amplitude: 1.0,
            envelope_width: 12.0,
            carrier: 0.1,
            inverted: false,
            reference: None,
            noise_std: 0.0,
            seed: None,
        }
    }
}

impl InterferogramConfig {
    pub fn period(&self) -> usize {
        (self.sample_rate / self.repetition_rate_hz).round() as usize
    }

    /// Crest positions of the main family inside the record.
    pub fn crest_positions(&self) -> Vec<usize> {
        let period = self.period().max(1);
        (self.first_crest..self.record_len).step_by(period).collect()
    }

    /// Crest positions of the reference family, if any.
    pub fn reference_positions(&self) -> Vec<usize> {
        match &self.reference {
            Some(reference) => self
                .crest_positions()
                .into_iter()
                .map(|c| c + reference.offset)
                .filter(|&c| c < self.record_len)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Add one Gaussian-enveloped cosine burst centred on `crest`.
pub fn add_burst(signal: &mut [f64], crest: usize, amplitude: f64, width: f64, carrier: f64) {
    let reach = (ENVELOPE_SPAN * width).ceil() as usize;
    let start = crest.saturating_sub(reach);
    let end = (crest + reach + 1).min(signal.len());
    let two_var = 2.0 * width * width;
    for (i, sample) in signal.iter_mut().enumerate().take(end).skip(start) {
        let t = i as f64 - crest as f64;
        *sample += amplitude * (-t * t / two_var).exp() * (2.0 * PI * carrier * t).cos();
    }
}

/// Render one record from `config`, noise included.
pub fn generate_interferogram(config: &InterferogramConfig) -> Vec<f64> {
    let mut signal = vec![0.0; config.record_len];
    let sign = if config.inverted { -1.0 } else { 1.0 };

    for crest in config.crest_positions() {
        add_burst(
            &mut signal,
            crest,
            sign * config.amplitude,
            config.envelope_width,
            config.carrier,
        );
    }
    if let Some(reference) = &config.reference {
        for crest in config.reference_positions() {
            add_burst(
                &mut signal,
                crest,
                sign * reference.amplitude,
                config.envelope_width,
                config.carrier,
            );
        }
    }

    if config.noise_std > 0.0 {
        super::add_white_noise(&mut signal, config.noise_std, config.seed);
    }
    signal
}
