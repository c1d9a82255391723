use std::path::Path;

use hound::{WavSpec, WavWriter};

/// Write a record as a mono 32-bit float WAV file.
pub fn save_record_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f64],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for &sample in samples {
        writer.write_sample(sample as f32)?;
    }

    writer.finalize()?;
    Ok(())
}
