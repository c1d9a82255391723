use anyhow::{Context, Result};
use clap::Parser;
use phasesonar::simulation::{
    InterferogramConfig, ReferenceFamily, corrupt_burst, generate_interferogram, signal_power,
};
use phasesonar::wav::save_record_wav;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_interferogram")]
#[command(about = "Generate synthetic interferogram records as a mono WAV file")]
struct Args {
    /// TOML interferogram description
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "data/synthetic/interferogram.wav")]
    output: PathBuf,

    /// Number of records to concatenate
    #[arg(short, long, default_value_t = 10)]
    records: usize,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// White noise standard deviation (CLI override)
    #[arg(long)]
    noise: Option<f64>,

    /// Reference family as "offset:amplitude", e.g. "500:0.4"
    #[arg(long)]
    reference: Option<String>,

    /// Corrupt bursts, comma-separated "record:crest" pairs, e.g. "0:2,3:1"
    #[arg(long)]
    corrupt: Option<String>,

    /// Invert every burst
    #[arg(long)]
    inverted: bool,

    /// Generate manifest.json next to the output file
    #[arg(long)]
    manifest: bool,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    file: String,
    records: usize,
    record_len: usize,
    sample_rate: f64,
    repetition_rate_hz: f64,
    seed: Option<u64>,
    corrupted: Vec<(usize, usize)>,
}

fn parse_reference(s: &str) -> Result<ReferenceFamily> {
    let (offset, amplitude) = s
        .split_once(':')
        .context("Invalid reference format. Use 'offset:amplitude'")?;
    Ok(ReferenceFamily {
        offset: offset.trim().parse().context("Invalid reference offset")?,
        amplitude: amplitude.trim().parse().context("Invalid reference amplitude")?,
    })
}

fn parse_corruptions(s: &str) -> Result<Vec<(usize, usize)>> {
    s.split(',')
        .map(|pair| {
            let (record, crest) = pair
                .split_once(':')
                .context("Invalid corruption format. Use 'record:crest'")?;
            Ok((
                record.trim().parse().context("Invalid record index")?,
                crest.trim().parse().context("Invalid crest index")?,
            ))
        })
        .collect()
}

fn load_toml_config(path: &PathBuf) -> Result<InterferogramConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => load_toml_config(path)?,
        None => InterferogramConfig::default(),
    };
    if let Some(noise) = args.noise {
        config.noise_std = noise;
    }
    if let Some(ref reference) = args.reference {
        config.reference = Some(parse_reference(reference)?);
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.inverted |= args.inverted;

    let corrupted = match args.corrupt {
        Some(ref s) => parse_corruptions(s)?,
        None => Vec::new(),
    };

    let crests = config.crest_positions();
    let mut samples = Vec::with_capacity(config.record_len * args.records);
    for record in 0..args.records {
        let mut record_config = config.clone();
        record_config.seed = config.seed.map(|s| s.wrapping_add(record as u64));
        let mut waveform = generate_interferogram(&record_config);

        for &(target, crest_index) in corrupted.iter().filter(|(r, _)| *r == record) {
            let Some(&crest) = crests.get(crest_index) else {
                anyhow::bail!("Record {} has no crest {}", target, crest_index);
            };
            let seed = config.seed.unwrap_or(0).wrapping_add(crest as u64);
            corrupt_burst(&mut waveform, crest, config.period() / 6, 0.9, seed);
        }
        samples.extend_from_slice(&waveform);
        eprint!("\rGenerating: {}/{}", record + 1, args.records);
    }
    eprintln!();

    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    save_record_wav(&args.output, &samples, config.sample_rate as u32)
        .context("Failed to write WAV file")?;

    if args.manifest {
        let manifest = Manifest {
            file: args.output.display().to_string(),
            records: args.records,
            record_len: config.record_len,
            sample_rate: config.sample_rate,
            repetition_rate_hz: config.repetition_rate_hz,
            seed: config.seed,
            corrupted,
        };
        let manifest_path = args.output.with_extension("json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} records of {} samples in {}",
        args.records,
        config.record_len,
        args.output.display()
    );
    log::info!("Mean signal power {:.4e}", signal_power(&samples));
    Ok(())
}
