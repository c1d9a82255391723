use num_complex::Complex64;

use super::phase_extractor::PhaseExtractor;
use super::synthesizer::PhaseSynthesizer;
use crate::config::{ApodizerKind, CorrectorKind, PipelineConfig};
use crate::error::CorrectFailure;
use crate::signal_processing::{Apodizer, FourierTransform, PulsePreprocessor, rotate, symmetrize};
use crate::slicing::SliceInfo;
use crate::spectrum::SpectrumKind;

/// Progress of the pulse currently being corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectStage {
    Idle,
    Retrieved,
    Symmetrized,
    PhaseExtracted,
    Synthesized,
    Done,
}

/// Receives intermediate results of each pulse, synchronously.
pub trait CorrectionObserver: Send {
    /// Full transform of the apodized, rotated pulse.
    fn on_raw_spectrum(&mut self, _spectrum: &[Complex64]) {}

    /// Extracted phase curve (half spectrum).
    fn on_phase(&mut self, _phase: &[f64]) {}
}

/// Per-pulse correction chain
///
/// Owns every scratch buffer it needs, so one instance serves one thread. A
/// pulse goes through
///
/// ```text
/// retrieve -> symmetrize -> apodize -> rotate -> transform -> extract phase -> synthesize
/// ```
///
/// Only symmetrization and phase extraction can fail; on failure no output is
/// produced and the previous output stays as it was.
pub struct Corrector {
    buffer_len: usize,
    preprocessor: PulsePreprocessor,
    apodizer: Apodizer,
    fft: FourierTransform,
    extractor: Option<PhaseExtractor>,
    synthesizer: PhaseSynthesizer,
    auto_flip: bool,
    symmetric: Vec<f64>,
    work: Vec<f64>,
    phase: Vec<f64>,
    staged: Vec<Complex64>,
    output: Vec<Complex64>,
    stage: CorrectStage,
    observer: Option<Box<dyn CorrectionObserver>>,
}

impl Corrector {
    pub fn builder(buffer_len: usize) -> CorrectorBuilder {
        CorrectorBuilder::new(buffer_len)
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let correction = &config.correction;
        let builder = Self::builder(config.zero_filled_length())
            .apodizer(correction.apodizer)
            .synthesizer(PhaseSynthesizer::from_kind(correction.synthesizer))
            .auto_flip(correction.auto_flip);
        match correction.corrector {
            CorrectorKind::Fake => builder.build(),
            CorrectorKind::Mertz => builder
                .phase_extractor(PhaseExtractor::from_config(
                    correction,
                    config.sampling.sample_rate,
                ))
                .build(),
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Bins per corrected pulse (half the buffer).
    pub fn output_len(&self) -> usize {
        self.buffer_len / 2
    }

    pub fn output_kind(&self) -> SpectrumKind {
        match self.extractor {
            Some(_) => self.synthesizer.output_kind(),
            None => SpectrumKind::Complex,
        }
    }

    pub fn stage(&self) -> CorrectStage {
        self.stage
    }

    pub fn set_observer(&mut self, observer: Box<dyn CorrectionObserver>) {
        self.observer = Some(observer);
    }

    /// Retrieve, symmetrize and correct one slice of `waveform`.
    pub fn correct_slice(
        &mut self,
        waveform: &[f64],
        slice: &SliceInfo,
    ) -> Result<&[Complex64], CorrectFailure> {
        self.load_slice(waveform, slice)?;
        self.correct_loaded()
    }

    /// Correct a pulse whose crest already sits on `pulse.len() / 2`.
    ///
    /// The pulse is truncated or zero-padded to the buffer length.
    pub fn correct(&mut self, pulse: &[f64]) -> Result<&[Complex64], CorrectFailure> {
        self.symmetric.clear();
        self.symmetric
            .extend(pulse.iter().copied().take(self.buffer_len));
        self.symmetric.resize(self.buffer_len, 0.0);
        self.stage = CorrectStage::Symmetrized;
        self.correct_loaded()
    }

    /// Phase curve of one slice without synthesizing a spectrum.
    ///
    /// A corrector without phase correction reports the raw per-bin phase.
    pub fn extract_phase(
        &mut self,
        waveform: &[f64],
        slice: &SliceInfo,
    ) -> Result<&[f64], CorrectFailure> {
        self.load_slice(waveform, slice)?;
        self.transform_and_extract()?;
        Ok(self.phase.as_slice())
    }

    fn load_slice(&mut self, waveform: &[f64], slice: &SliceInfo) -> Result<(), CorrectFailure> {
        self.stage = CorrectStage::Idle;
        let buffer = self.preprocessor.retrieve(waveform, slice);
        self.stage = CorrectStage::Retrieved;
        symmetrize(buffer, slice.crest_offset)?;
        self.symmetric.clear();
        self.symmetric.extend_from_slice(buffer);
        self.stage = CorrectStage::Symmetrized;
        Ok(())
    }

    /// Apodize, rotate, transform and fill `self.phase`. On success the raw
    /// half spectrum is left in `self.staged`.
    fn transform_and_extract(&mut self) -> Result<(), CorrectFailure> {
        let half = self.output_len();
        self.work.clear();
        self.work.extend_from_slice(&self.symmetric);
        self.apodizer.apodize(&mut self.work);
        rotate(&mut self.work);

        let spectrum = self.fft.forward_real(&self.work);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_raw_spectrum(spectrum);
        }

        self.phase.resize(half, 0.0);
        match self.extractor.as_mut() {
            Some(extractor) => extractor.extract(&self.symmetric, spectrum, &mut self.phase)?,
            None => {
                for (p, z) in self.phase.iter_mut().zip(spectrum) {
                    *p = z.arg();
                }
            }
        }
        self.staged.clear();
        self.staged.extend_from_slice(&spectrum[..half]);
        self.stage = CorrectStage::PhaseExtracted;

        if let Some(observer) = self.observer.as_mut() {
            observer.on_phase(&self.phase);
        }
        Ok(())
    }

    fn correct_loaded(&mut self) -> Result<&[Complex64], CorrectFailure> {
        if let Err(failure) = self.transform_and_extract() {
            log::trace!("Pulse rejected at {:?}: {}", self.stage, failure);
            return Err(failure);
        }

        let half = self.output_len();
        self.output.resize(half, Complex64::new(0.0, 0.0));
        match self.extractor {
            Some(_) => self
                .synthesizer
                .synthesize(&self.staged, &self.phase, &mut self.output),
            None => self.output.copy_from_slice(&self.staged),
        }
        self.stage = CorrectStage::Synthesized;

        if self.auto_flip {
            let lower: f64 = self.output[..half / 2].iter().map(|z| z.re).sum();
            if lower < 0.0 {
                for z in self.output.iter_mut() {
                    *z = -*z;
                }
            }
        }
        self.stage = CorrectStage::Done;
        Ok(self.output.as_slice())
    }
}

/// Assembles a [`Corrector`] from its steps.
///
/// Without a phase extractor the corrector only transforms (the half
/// spectrum of the apodized pulse is returned as is).
pub struct CorrectorBuilder {
    buffer_len: usize,
    apodizer: ApodizerKind,
    extractor: Option<PhaseExtractor>,
    synthesizer: PhaseSynthesizer,
    auto_flip: bool,
    observer: Option<Box<dyn CorrectionObserver>>,
}

impl CorrectorBuilder {
    pub fn new(buffer_len: usize) -> Self {
        Self {
            buffer_len,
            apodizer: ApodizerKind::Triangular,
            extractor: None,
            synthesizer: PhaseSynthesizer::Real,
            auto_flip: false,
            observer: None,
        }
    }

    pub fn apodizer(mut self, kind: ApodizerKind) -> Self {
        self.apodizer = kind;
        self
    }

    pub fn phase_extractor(mut self, extractor: PhaseExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn synthesizer(mut self, synthesizer: PhaseSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn auto_flip(mut self, enabled: bool) -> Self {
        self.auto_flip = enabled;
        self
    }

    pub fn observer(mut self, observer: Box<dyn CorrectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Corrector {
        Corrector {
            buffer_len: self.buffer_len,
            preprocessor: PulsePreprocessor::new(self.buffer_len),
            apodizer: Apodizer::new(self.apodizer),
            fft: FourierTransform::new(self.buffer_len),
            extractor: self.extractor,
            synthesizer: self.synthesizer,
            auto_flip: self.auto_flip,
            symmetric: Vec::with_capacity(self.buffer_len),
            work: Vec::with_capacity(self.buffer_len),
            phase: Vec::new(),
            staged: Vec::new(),
            output: Vec::new(),
            stage: CorrectStage::Idle,
            observer: self.observer,
        }
    }
}
