use crate::error::ProcessException;
use crate::spectrum::Spectrum;

/// Common view of per-record outcomes, used by the record consumer.
pub trait ProcessOutcome {
    /// What successful outcomes add up to across records.
    type Total: Clone + Send;

    /// At least one usable spectrum came out of the record.
    fn is_successful(&self) -> bool;

    fn exception(&self) -> Option<ProcessException>;

    /// Processing was stopped before the record could succeed or fail.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Pulses that failed correction while processing the record.
    fn exception_count(&self) -> usize;

    /// Add this outcome to `total`, starting it on the first success.
    fn absorb_into(&self, total: &mut Option<Self::Total>);
}

fn absorb_spectrum(total: &mut Option<Spectrum>, spectrum: &Spectrum) {
    match total.as_mut() {
        Some(sum) => {
            if let Err(e) = sum.try_absorb(spectrum) {
                log::warn!("Total not updated: {}", e);
            }
        }
        None => *total = Some(spectrum.clone()),
    }
}

/// Outcome of accumulating one single-channel record.
///
/// A successful record may still carry an exception kind and count when some
/// of its pulses were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationResult {
    pub spectrum: Option<Spectrum>,
    pub exception: Option<ProcessException>,
    pub exception_count: usize,
}

impl AccumulationResult {
    /// A usable spectrum, with `failed_pulses` rejected along the way.
    pub fn success(spectrum: Spectrum, failed_pulses: usize) -> Self {
        Self {
            spectrum: Some(spectrum),
            exception: (failed_pulses > 0).then_some(ProcessException::NoFlatPhaseIntervalFound),
            exception_count: failed_pulses,
        }
    }

    pub fn failure(exception: ProcessException, count: usize) -> Self {
        Self {
            spectrum: None,
            exception: Some(exception),
            exception_count: count,
        }
    }

    /// A record abandoned on request, with neither spectrum nor exception.
    pub fn cancelled() -> Self {
        Self {
            spectrum: None,
            exception: None,
            exception_count: 0,
        }
    }

    pub fn has_spectrum(&self) -> bool {
        self.spectrum.is_some()
    }

    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.spectrum.is_none() && self.exception.is_none()
    }

    pub fn pulse_count(&self) -> usize {
        self.spectrum.as_ref().map_or(0, Spectrum::pulse_count)
    }
}

impl ProcessOutcome for AccumulationResult {
    type Total = Spectrum;

    fn is_successful(&self) -> bool {
        self.has_spectrum()
    }

    fn exception(&self) -> Option<ProcessException> {
        self.exception
    }

    fn is_cancelled(&self) -> bool {
        AccumulationResult::is_cancelled(self)
    }

    fn exception_count(&self) -> usize {
        self.exception_count
    }

    fn absorb_into(&self, total: &mut Option<Spectrum>) {
        if let Some(spectrum) = &self.spectrum {
            absorb_spectrum(total, spectrum);
        }
    }
}

/// Gas and reference spectra of one dual-channel record.
#[derive(Debug, Clone, PartialEq)]
pub struct GasRefPair {
    /// The family with the larger spectral magnitude
    pub source: Spectrum,
    pub reference: Spectrum,
}

impl GasRefPair {
    /// Label two family spectra by the magnitude of their lower half.
    pub fn from_families(a: Spectrum, b: Spectrum) -> Self {
        if a.lower_half_magnitude() >= b.lower_half_magnitude() {
            Self {
                source: a,
                reference: b,
            }
        } else {
            Self {
                source: b,
                reference: a,
            }
        }
    }
}

/// Outcome of splitting one dual-channel record.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub pair: Option<GasRefPair>,
    pub exception: Option<ProcessException>,
    pub exception_count: usize,
}

impl SplitResult {
    pub fn success(pair: GasRefPair, failed_pulses: usize) -> Self {
        Self {
            pair: Some(pair),
            exception: (failed_pulses > 0).then_some(ProcessException::NoFlatPhaseIntervalFound),
            exception_count: failed_pulses,
        }
    }

    pub fn failure(exception: ProcessException, count: usize) -> Self {
        Self {
            pair: None,
            exception: Some(exception),
            exception_count: count,
        }
    }

    pub fn has_spectrum(&self) -> bool {
        self.pair.is_some()
    }

    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }
}

impl ProcessOutcome for SplitResult {
    type Total = GasRefPair;

    fn is_successful(&self) -> bool {
        self.has_spectrum()
    }

    fn exception(&self) -> Option<ProcessException> {
        self.exception
    }

    fn exception_count(&self) -> usize {
        self.exception_count
    }

    fn absorb_into(&self, total: &mut Option<GasRefPair>) {
        let Some(pair) = &self.pair else {
            return;
        };
        match total.as_mut() {
            Some(sum) => {
                if let Err(e) = sum
                    .source
                    .try_absorb(&pair.source)
                    .and_then(|_| sum.reference.try_absorb(&pair.reference))
                {
                    log::warn!("Total not updated: {}", e);
                }
            }
            None => *total = Some(pair.clone()),
        }
    }
}
