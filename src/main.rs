use anyhow::Context;
use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;
use std::path::{Path, PathBuf};

use phasesonar::analysis::{
    AccumulationResult, Accumulator, ParallelAccumulator, PhaseReader, PulseChecker, SplitResult,
    Splitter,
};
use phasesonar::config::{
    ApodizerKind, CorrectorKind, PhaseExtractorKind, PipelineConfig, RepetitionRate,
};
use phasesonar::consumer::{RecordConsumer, StopReason};
use phasesonar::output::{OutputFormat, RecordSummary, create_formatter};
use phasesonar::source::{RecordSource, WavRecordSource, spawn_producer};

#[derive(Parser, Debug)]
#[command(name = "phasesonar")]
#[command(about = "Turn recorded interferogram trains into phase-corrected spectra", long_about = None)]
struct Args {
    /// Mono WAV files holding interferogram records
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Processing mode
    #[arg(short, long, value_enum, default_value = "accumulate")]
    mode: Mode,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Worker threads (overrides the configuration)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Spread the slices of each record over the workers instead of whole records
    #[arg(long)]
    per_slice: bool,

    /// Samples per record (default: five repetition periods)
    #[arg(long)]
    record_len: Option<usize>,

    /// Repetition rate (e.g., "1000", "1.5khz", "665us")
    #[arg(long)]
    rate: Option<RepetitionRate>,

    /// Corrector: fake, mertz
    #[arg(long, value_enum)]
    corrector: Option<CorrectorKind>,

    /// Apodization window
    #[arg(long, value_enum)]
    apodizer: Option<ApodizerKind>,

    /// Phase extraction strategy
    #[arg(long, value_enum)]
    phase_extractor: Option<PhaseExtractorKind>,

    /// Stop after this many successful records
    #[arg(long)]
    target: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Mode {
    /// Single-channel accumulation
    Accumulate,
    /// Dual-channel gas/reference splitting
    Split,
    /// Phase curve of the first pulse of every record
    Phase,
    /// Per-pulse correction report
    Check,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct FileReport {
    filename: String,
    consumed: usize,
    succeeded: usize,
    stop_reason: Option<StopReason>,
    total_pulses: usize,
    pulses_per_record: Option<StatsSummary>,
    rejected_per_record: Option<StatsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FileReport {
    fn failed(filename: String, error: String) -> Self {
        Self {
            filename,
            consumed: 0,
            succeeded: 0,
            stop_reason: None,
            total_pulses: 0,
            pulses_per_record: None,
            rejected_per_record: None,
            error: Some(error),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match args.config {
        Some(ref path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let mut reports = Vec::new();
    for path in &args.files {
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        match process_file(path, &filename, &config, &args) {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(e) => reports.push(FileReport::failed(filename, format!("{:#}", e))),
        }
    }

    if !reports.is_empty() {
        print_reports(&reports, args.format)?;
    }
    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &Args) {
    if let Some(rate) = args.rate {
        config.sampling.repetition_rate = rate;
    }
    if let Some(threads) = args.threads {
        config.consumer.threads = threads;
    }
    if let Some(corrector) = args.corrector {
        config.correction.corrector = corrector;
    }
    if let Some(apodizer) = args.apodizer {
        config.correction.apodizer = apodizer;
    }
    if let Some(extractor) = args.phase_extractor {
        config.correction.phase_extractor = extractor;
    }
    if args.target.is_some() {
        config.consumer.target_count = args.target;
    }
}

fn open_source(
    path: &Path,
    config: &mut PipelineConfig,
    record_len: Option<usize>,
) -> anyhow::Result<WavRecordSource> {
    let source = WavRecordSource::new(path, 1)?;
    config.sampling.sample_rate = source.sample_rate();
    config.validate()?;

    // the default record length depends on the file's sample rate
    let record_len =
        record_len.unwrap_or_else(|| (config.sampling.fuzzy_period_length() * 5.0) as usize);
    log::info!(
        "{}: {} samples at {} Hz, {} samples per record",
        path.display(),
        source.total_samples(),
        config.sampling.sample_rate,
        record_len
    );
    Ok(source.with_record_len(record_len))
}

fn process_file(
    path: &Path,
    filename: &str,
    config: &PipelineConfig,
    args: &Args,
) -> anyhow::Result<Option<FileReport>> {
    let mut config = config.clone();
    let source = open_source(path, &mut config, args.record_len)?;

    match args.mode {
        Mode::Accumulate => accumulate_file(source, filename, &config, args).map(Some),
        Mode::Split => split_file(source, filename, &config, args).map(Some),
        Mode::Phase => read_phases(source, &config, args.format).map(|_| None),
        Mode::Check => check_pulses(source, &config).map(|_| None),
    }
}

struct RecordPrinter {
    formatter: Box<dyn phasesonar::output::Formatter>,
    index: usize,
    pulses: Stats<f64>,
    rejected: Stats<f64>,
}

impl RecordPrinter {
    fn new(format: OutputFormat, verbose: bool) -> Self {
        let formatter = create_formatter(format, verbose);
        if let Some(header) = formatter.header() {
            println!("{}", header);
        }
        Self {
            formatter,
            index: 0,
            pulses: Stats::new(),
            rejected: Stats::new(),
        }
    }

    fn print(&mut self, summary: RecordSummary) {
        println!("{}", self.formatter.format(&summary));
        if summary.success {
            self.pulses.update(summary.pulse_count as f64);
        }
        self.rejected.update(summary.exception_count as f64);
        self.index += 1;
    }
}

fn accumulate_file(
    source: WavRecordSource,
    filename: &str,
    config: &PipelineConfig,
    args: &Args,
) -> anyhow::Result<FileReport> {
    let (records, producer) = spawn_producer(source, config.consumer.queue_capacity);
    let mut printer = RecordPrinter::new(args.format, args.verbose > 0);

    let report = if args.per_slice {
        let threads = config.consumer.threads;
        let mut consumer = RecordConsumer::new(
            vec![ParallelAccumulator::new(config, threads)],
            &config.consumer,
        );
        consumer.run(records, |result: &AccumulationResult| {
            printer.print(RecordSummary::from_accumulation(printer.index, result))
        })
    } else {
        let mut consumer = RecordConsumer::with_factory(&config.consumer, || Accumulator::new(config));
        consumer.run(records, |result: &AccumulationResult| {
            printer.print(RecordSummary::from_accumulation(printer.index, result))
        })
    };
    join_producer(producer)?;

    Ok(FileReport {
        filename: filename.to_string(),
        consumed: report.consumed,
        succeeded: report.succeeded,
        stop_reason: Some(report.stop_reason),
        total_pulses: report.total.map_or(0, |t| t.pulse_count()),
        pulses_per_record: StatsSummary::from_stats(&printer.pulses),
        rejected_per_record: StatsSummary::from_stats(&printer.rejected),
        error: None,
    })
}

fn split_file(
    source: WavRecordSource,
    filename: &str,
    config: &PipelineConfig,
    args: &Args,
) -> anyhow::Result<FileReport> {
    let (records, producer) = spawn_producer(source, config.consumer.queue_capacity);
    let mut printer = RecordPrinter::new(args.format, args.verbose > 0);

    let mut consumer = RecordConsumer::with_factory(&config.consumer, || Splitter::new(config));
    let report = consumer.run(records, |result: &SplitResult| {
        printer.print(RecordSummary::from_split(printer.index, result))
    });
    join_producer(producer)?;

    Ok(FileReport {
        filename: filename.to_string(),
        consumed: report.consumed,
        succeeded: report.succeeded,
        stop_reason: Some(report.stop_reason),
        total_pulses: report
            .total
            .map_or(0, |pair| pair.source.pulse_count() + pair.reference.pulse_count()),
        pulses_per_record: StatsSummary::from_stats(&printer.pulses),
        rejected_per_record: StatsSummary::from_stats(&printer.rejected),
        error: None,
    })
}

fn join_producer(
    producer: std::thread::JoinHandle<phasesonar::Result<usize>>,
) -> anyhow::Result<()> {
    let sent = producer
        .join()
        .map_err(|_| anyhow::anyhow!("record producer panicked"))??;
    log::debug!("Producer sent {} records", sent);
    Ok(())
}

fn read_phases(
    mut source: WavRecordSource,
    config: &PipelineConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut reader = PhaseReader::new(config);
    let mut index = 0;
    while let Some(record) = source.next_record()? {
        match reader.read(&record) {
            Ok(result) => match format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&result)?),
                OutputFormat::Csv => {
                    for (bin, phase) in result.phase.iter().enumerate() {
                        println!("{},{},{:.6}", index, bin, phase);
                    }
                }
                OutputFormat::Text => {
                    let first = result.phase.first().copied().unwrap_or(0.0);
                    let last = result.phase.last().copied().unwrap_or(0.0);
                    println!(
                        "Record {:>5}: slice at {} ({} bins) phase {:.4} .. {:.4} rad",
                        index,
                        result.slice.start_index,
                        result.phase.len(),
                        first,
                        last
                    );
                }
            },
            Err(e) => println!("Record {:>5}: {}", index, e),
        }
        index += 1;
    }
    Ok(())
}

fn check_pulses(mut source: WavRecordSource, config: &PipelineConfig) -> anyhow::Result<()> {
    let mut checker = PulseChecker::new(config);
    let mut index = 0;
    while let Some(record) = source.next_record()? {
        match checker.check(&record) {
            Ok(pulses) => {
                for (k, pulse) in pulses.iter().enumerate() {
                    match &pulse.outcome {
                        Ok(intensity) => println!(
                            "Record {:>5} pulse {:>3} @ {:>9}: mean |z|^2 {:.4e}",
                            index, k, pulse.slice.start_index, intensity
                        ),
                        Err(failure) => println!(
                            "Record {:>5} pulse {:>3} @ {:>9}: REJECTED {}",
                            index, k, pulse.slice.start_index, failure
                        ),
                    }
                }
            }
            Err(e) => println!("Record {:>5}: {}", index, e),
        }
        index += 1;
    }
    Ok(())
}

fn print_reports(reports: &[FileReport], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            eprintln!("{}", serde_json::to_string_pretty(reports)?);
        }
        OutputFormat::Csv | OutputFormat::Text => {
            for report in reports {
                eprintln!("=== {} ===", report.filename);
                if let Some(ref error) = report.error {
                    eprintln!("  Error: {}", error);
                    continue;
                }
                eprintln!(
                    "  Records: {} consumed, {} succeeded ({:?})",
                    report.consumed,
                    report.succeeded,
                    report.stop_reason.unwrap_or(StopReason::Cancelled)
                );
                eprintln!("  Pulses in total: {}", report.total_pulses);
                if let Some(ref s) = report.pulses_per_record {
                    eprintln!(
                        "  Pulses/record: {:.2} ± {:.2} (min {}, max {})",
                        s.mean, s.std_dev, s.min, s.max
                    );
                }
                if let Some(ref s) = report.rejected_per_record {
                    eprintln!("  Rejected/record: {:.2} ± {:.2}", s.mean, s.std_dev);
                }
            }
        }
    }
    Ok(())
}
