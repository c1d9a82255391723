//! Record sources: where waveforms come from before they reach a processor.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, bounded};
use hound::WavReader;

use crate::error::{PipelineError, Result};

pub trait RecordSource: Send {
    /// Next record, or `None` once the source is exhausted.
    fn next_record(&mut self) -> anyhow::Result<Option<Vec<f64>>>;

    fn sample_rate(&self) -> f64;
}

/// Replays a mono WAV file as fixed-length records.
///
/// Integer samples are normalized to ±1. A short tail is returned as a final,
/// shorter record.
pub struct WavRecordSource {
    samples: Vec<f64>,
    position: usize,
    record_len: usize,
    sample_rate: f64,
}

impl WavRecordSource {
    pub fn new<P: AsRef<Path>>(path: P, record_len: usize) -> anyhow::Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        let spec = reader.spec();

        if spec.channels != 1 {
            anyhow::bail!("Expected mono WAV file, got {} channels", spec.channels);
        }
        if record_len == 0 {
            return Err(PipelineError::Config("record length must be positive".into()).into());
        }

        let sample_rate = spec.sample_rate as f64;
        let samples = Self::read_samples(reader, &spec)?;
        log::debug!(
            "Loaded {} samples at {} Hz from {}",
            samples.len(),
            spec.sample_rate,
            path.as_ref().display()
        );

        Ok(Self::from_samples(samples, record_len, sample_rate))
    }

    /// Chunk an in-memory waveform.
    pub fn from_samples(samples: Vec<f64>, record_len: usize, sample_rate: f64) -> Self {
        Self {
            samples,
            position: 0,
            record_len: record_len.max(1),
            sample_rate,
        }
    }

    /// Change the record length; replay continues from the current position.
    pub fn with_record_len(mut self, record_len: usize) -> Self {
        self.record_len = record_len.max(1);
        self
    }

    fn read_samples(
        mut reader: WavReader<BufReader<File>>,
        spec: &hound::WavSpec,
    ) -> anyhow::Result<Vec<f64>> {
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = 2_i64.pow(spec.bits_per_sample as u32 - 1) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(samples)
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }
}

impl RecordSource for WavRecordSource {
    fn next_record(&mut self) -> anyhow::Result<Option<Vec<f64>>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }

        let end = (self.position + self.record_len).min(self.samples.len());
        let record = self.samples[self.position..end].to_vec();
        self.position = end;

        Ok(Some(record))
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

/// Records pushed by another thread through a channel.
pub struct ChannelRecordSource {
    rx: Receiver<Vec<f64>>,
    sample_rate: f64,
}

impl ChannelRecordSource {
    pub fn new(rx: Receiver<Vec<f64>>, sample_rate: f64) -> Self {
        Self { rx, sample_rate }
    }
}

impl RecordSource for ChannelRecordSource {
    fn next_record(&mut self) -> anyhow::Result<Option<Vec<f64>>> {
        match self.rx.recv() {
            Ok(record) => Ok(Some(record)),
            Err(_) => Ok(None),
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

/// Pump `source` into a bounded channel on its own thread.
///
/// The thread ends when the source is exhausted, fails, or the receiver is
/// dropped; it returns the number of records sent.
pub fn spawn_producer<S>(
    mut source: S,
    capacity: usize,
) -> (Receiver<Vec<f64>>, JoinHandle<Result<usize>>)
where
    S: RecordSource + 'static,
{
    let (tx, rx) = bounded(capacity.max(1));
    let handle = thread::spawn(move || {
        let mut sent = 0;
        loop {
            let record = match source.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => return Err(PipelineError::Source(e.to_string())),
            };
            if tx.send(record).is_err() {
                log::debug!("Record receiver gone after {} records", sent);
                break;
            }
            sent += 1;
        }
        Ok(sent)
    });
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_with_short_tail() {
        let samples: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let mut source = WavRecordSource::from_samples(samples, 4, 1000.0);
        assert_eq!(source.next_record().unwrap().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(source.next_record().unwrap().unwrap().len(), 4);
        assert_eq!(source.next_record().unwrap().unwrap(), vec![8.0, 9.0]);
        assert!(source.next_record().unwrap().is_none());
    }

    #[test]
    fn test_producer_drains_source() {
        let samples = vec![0.5; 1000];
        let source = WavRecordSource::from_samples(samples, 100, 1e6);
        let (rx, handle) = spawn_producer(source, 2);
        let mut records = ChannelRecordSource::new(rx, 1e6);
        let mut count = 0;
        while let Some(record) = records.next_record().unwrap() {
            assert_eq!(record.len(), 100);
            count += 1;
        }
        assert_eq!(count, 10);
        assert_eq!(handle.join().unwrap().unwrap(), 10);
    }

    #[test]
    fn test_wav_round_trip() {
        let path = std::env::temp_dir().join("phasesonar_source_test.wav");
        let samples: Vec<f64> = (0..300).map(|i| (i as f64 * 0.01).sin()).collect();
        crate::wav::save_record_wav(&path, &samples, 48_000).unwrap();

        let mut source = WavRecordSource::new(&path, 128).unwrap();
        assert_eq!(source.sample_rate(), 48_000.0);
        assert_eq!(source.total_samples(), 300);
        let first = source.next_record().unwrap().unwrap();
        assert!((first[100] - samples[100]).abs() < 1e-6);
        std::fs::remove_file(&path).ok();
    }
}
