mod test_signals;

use phasesonar::analysis::ProcessOutcome;
use phasesonar::config::ConsumerConfig;
use phasesonar::consumer::{RecordConsumer, StopReason};
use phasesonar::output::RecordSummary;
use phasesonar::simulation::{InterferogramConfig, SyntheticRecordSource, corrupt_burst};
use phasesonar::source::spawn_producer;
use phasesonar::{
    AccumulationResult, Accumulator, ParallelAccumulator, ProcessException, SplitResult, Splitter,
};

fn consumer_config(threads: usize) -> ConsumerConfig {
    ConsumerConfig {
        threads,
        queue_capacity: 4,
        wait_timeout_ms: 2000,
        max_consecutive_failures: 3,
        target_count: None,
    }
}

fn noisy_interferogram() -> InterferogramConfig {
    InterferogramConfig {
        noise_std: 0.002,
        seed: Some(100),
        ..test_signals::interferogram()
    }
}

#[test]
fn test_synthetic_records_drain_to_producer_empty() {
    let config = test_signals::pipeline_config();
    let source = SyntheticRecordSource::new(noisy_interferogram(), Some(6));
    let (records, producer) = spawn_producer(source, 4);

    let mut consumer = RecordConsumer::with_factory(&consumer_config(3), || Accumulator::new(&config));
    let mut summaries = Vec::new();
    let report = consumer.run(records, |result: &AccumulationResult| {
        summaries.push(RecordSummary::from_accumulation(summaries.len(), result));
    });

    assert_eq!(producer.join().unwrap().unwrap(), 6);
    assert_eq!(report.stop_reason, StopReason::ProducerEmpty);
    assert_eq!(report.consumed, 6);
    assert_eq!(report.succeeded, 6);
    assert_eq!(report.total.unwrap().pulse_count(), 24);

    assert_eq!(summaries.len(), 6);
    assert!(summaries.iter().all(|s| s.success && s.pulse_count == 4));
    assert!(summaries.iter().all(|s| s.peak_bin.is_some()));
}

#[test]
fn test_silent_source_is_declared_invalid() {
    let config = test_signals::pipeline_config();
    let silent = InterferogramConfig {
        amplitude: 0.0,
        ..test_signals::interferogram()
    };
    let (records, producer) = spawn_producer(SyntheticRecordSource::new(silent, Some(50)), 2);

    let mut consumer = RecordConsumer::with_factory(&consumer_config(2), || Accumulator::new(&config));
    let report = consumer.run(records, |result: &AccumulationResult| {
        assert!(!result.is_successful());
    });

    assert_eq!(report.stop_reason, StopReason::SourceInvalid);
    assert!(report.consumed >= 3);
    assert!(report.consumed < 50);
    assert_eq!(report.succeeded, 0);
    assert!(report.total.is_none());

    // the producer notices the dropped receiver and stops early
    assert!(producer.join().unwrap().unwrap() < 50);
}

#[test]
fn test_endless_source_stops_at_target() {
    let config = test_signals::pipeline_config();
    let mut consumer_cfg = consumer_config(2);
    consumer_cfg.target_count = Some(3);
    let (records, producer) = spawn_producer(SyntheticRecordSource::new(noisy_interferogram(), None), 2);

    let mut consumer = RecordConsumer::with_factory(&consumer_cfg, || Accumulator::new(&config));
    let report = consumer.run(records, |_: &AccumulationResult| {});

    assert_eq!(report.stop_reason, StopReason::TargetReached);
    assert!(report.succeeded >= 3);
    let total = report.total.unwrap();
    assert_eq!(total.pulse_count(), 4 * report.succeeded);

    producer.join().unwrap().unwrap();
}

#[test]
fn test_workers_keep_their_own_totals() {
    let config = test_signals::pipeline_config();
    let (records, producer) = spawn_producer(SyntheticRecordSource::new(noisy_interferogram(), Some(5)), 2);

    let mut consumer = RecordConsumer::with_factory(&consumer_config(2), || Accumulator::new(&config));
    let report = consumer.run(records, |_: &AccumulationResult| {});
    producer.join().unwrap().unwrap();

    let per_worker: usize = consumer
        .workers()
        .iter()
        .map(|w| w.accumulated().pulse_count())
        .sum();
    assert_eq!(per_worker, 20);
    let merged = phasesonar::analysis::merge_totals(consumer.workers()).unwrap();
    let total = report.total.unwrap();
    assert_eq!(merged.pulse_count(), total.pulse_count());
    for (a, b) in merged.data().iter().zip(total.data()) {
        assert!((a - b).norm() <= 1e-9 * b.norm().max(1.0));
    }
}

#[test]
fn test_splitter_separates_gas_from_reference() {
    let config = test_signals::dual_channel_config();
    let record =
        phasesonar::simulation::generate_interferogram(&test_signals::dual_channel_interferogram(0.5));

    let mut splitter = Splitter::new(&config);
    let result = splitter.process(&record);

    assert!(result.has_spectrum(), "{:?}", result.exception);
    assert_eq!(result.exception_count, 0);
    let pair = result.pair.as_ref().unwrap();
    assert_eq!(pair.source.pulse_count(), 4);
    assert_eq!(pair.reference.pulse_count(), 4);
    // weaker reference bursts end up on the reference side
    assert!(pair.source.lower_half_magnitude() > pair.reference.lower_half_magnitude());
    let ratio = pair.reference.total_intensity() / pair.source.total_intensity();
    assert!((ratio - 0.25).abs() < 0.05, "intensity ratio {}", ratio);

    let summary = RecordSummary::from_split(0, &result);
    assert_eq!(summary.reference_pulse_count, Some(4));
    assert_eq!(splitter.accumulated_source().unwrap().pulse_count(), 4);
}

#[test]
fn test_splitter_skips_and_counts_a_corrupted_gas_burst() {
    let config = test_signals::dual_channel_config();
    let mut record =
        phasesonar::simulation::generate_interferogram(&test_signals::dual_channel_interferogram(0.5));
    // narrow enough to leave the reference crests at 1500 and 2500 alone
    corrupt_burst(&mut record, 2000, 60, 0.9, 42);

    let result = Splitter::new(&config).process(&record);

    assert!(result.has_spectrum(), "{:?}", result.exception);
    assert_eq!(result.exception_count, 1);
    assert_eq!(result.exception, Some(ProcessException::NoFlatPhaseIntervalFound));
    let pair = result.pair.as_ref().unwrap();
    assert_eq!(pair.source.pulse_count(), 3);
    assert_eq!(pair.reference.pulse_count(), 4);

    let summary = RecordSummary::from_split(0, &result);
    assert!(summary.success);
    assert_eq!(summary.exception_count, 1);
}

#[test]
fn test_split_records_through_consumer() {
    let config = test_signals::dual_channel_config();
    let source = SyntheticRecordSource::new(test_signals::dual_channel_interferogram(0.4), Some(4));
    let (records, producer) = spawn_producer(source, 2);

    let mut consumer = RecordConsumer::with_factory(&consumer_config(2), || Splitter::new(&config));
    let report = consumer.run(records, |_: &SplitResult| {});
    producer.join().unwrap().unwrap();

    assert_eq!(report.stop_reason, StopReason::ProducerEmpty);
    assert_eq!(report.succeeded, 4);
    let pair = report.total.unwrap();
    assert_eq!(pair.source.pulse_count(), 16);
    assert_eq!(pair.reference.pulse_count(), 16);
}

#[test]
fn test_single_family_record_cannot_be_split() {
    let config = test_signals::dual_channel_config();
    let mut splitter = Splitter::new(&config);

    // only two crests: not enough to seed both families
    let record = phasesonar::simulation::generate_interferogram(&InterferogramConfig {
        record_len: 2500,
        ..test_signals::interferogram()
    });
    let result = splitter.process(&record);

    assert!(!result.has_spectrum());
    assert!(result.has_exception());
    assert!(splitter.accumulated().is_none());
}

#[test]
fn test_stopped_parallel_workers_do_not_invalidate_source() {
    let config = test_signals::pipeline_config();
    let mut consumer_cfg = consumer_config(1);
    consumer_cfg.max_consecutive_failures = 1;
    let (records, producer) = spawn_producer(SyntheticRecordSource::new(noisy_interferogram(), Some(3)), 3);

    let mut consumer = RecordConsumer::with_factory(&consumer_cfg, || {
        let parallel = ParallelAccumulator::new(&config, 2);
        parallel.stop();
        parallel
    });
    let mut abandoned = 0;
    let report = consumer.run(records, |result: &AccumulationResult| {
        if result.is_cancelled() {
            abandoned += 1;
        }
    });
    producer.join().unwrap().unwrap();

    assert_eq!(report.stop_reason, StopReason::ProducerEmpty);
    assert_eq!(report.consumed, 3);
    assert_eq!(abandoned, 3);
    assert_eq!(report.succeeded, 0);
    assert!(report.total.is_none());
}
