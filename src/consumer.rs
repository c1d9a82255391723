//! Per-record parallelism: a bounded queue of records drained by worker
//! threads, each owning its own record processor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::analysis::{
    AccumulationResult, Accumulator, ParallelAccumulator, ProcessOutcome, SplitResult, Splitter,
};
use crate::config::ConsumerConfig;

/// Turns one record into one outcome. Implemented by the record-level
/// processors so the consumer can drive any of them.
pub trait RecordProcessor: Send {
    type Output: ProcessOutcome + Send;

    fn process_record(&mut self, waveform: &[f64]) -> Self::Output;
}

impl RecordProcessor for Accumulator {
    type Output = AccumulationResult;

    fn process_record(&mut self, waveform: &[f64]) -> AccumulationResult {
        self.process(waveform)
    }
}

impl RecordProcessor for ParallelAccumulator {
    type Output = AccumulationResult;

    fn process_record(&mut self, waveform: &[f64]) -> AccumulationResult {
        self.process(waveform)
    }
}

impl RecordProcessor for Splitter {
    type Output = SplitResult;

    fn process_record(&mut self, waveform: &[f64]) -> SplitResult {
        self.process(waveform)
    }
}

/// Notified once per processed record, under the consumer's lock.
pub trait ResultSink<R>: Send {
    fn on_result(&mut self, result: &R);
}

impl<R, F> ResultSink<R> for F
where
    F: FnMut(&R) + Send,
{
    fn on_result(&mut self, result: &R) {
        self(result)
    }
}

/// Why a consumer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum StopReason {
    /// No record arrived within the wait timeout, or the producer hung up
    ProducerEmpty,
    /// Too many consecutive records failed
    SourceInvalid,
    /// The requested number of successful records was reached
    TargetReached,
    /// Stopped from outside
    Cancelled,
}

/// Summary of one consumer run.
#[derive(Debug, Clone)]
pub struct ConsumerReport<T> {
    pub consumed: usize,
    pub succeeded: usize,
    pub stop_reason: StopReason,
    /// Sum of every successful outcome
    pub total: Option<T>,
}

struct RunState<S, T> {
    sink: S,
    consumed: usize,
    succeeded: usize,
    consecutive_failures: usize,
    reason: Option<StopReason>,
    total: Option<T>,
}

/// Drains a record queue with one worker thread per processor.
///
/// Records carry no ordering guarantee. A worker checks the stop flag before
/// each dequeue, so a record in flight is always finished.
pub struct RecordConsumer<P: RecordProcessor> {
    workers: Vec<P>,
    wait_timeout: Duration,
    max_consecutive_failures: usize,
    target_count: Option<usize>,
    stop: Arc<AtomicBool>,
}

impl<P: RecordProcessor> RecordConsumer<P> {
    pub fn new(workers: Vec<P>, config: &ConsumerConfig) -> Self {
        Self {
            workers,
            wait_timeout: Duration::from_millis(config.wait_timeout_ms),
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            target_count: config.target_count,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build `config.threads` workers with `make`.
    pub fn with_factory<F>(config: &ConsumerConfig, make: F) -> Self
    where
        F: FnMut() -> P,
    {
        let workers = std::iter::repeat_with(make)
            .take(config.threads.max(1))
            .collect();
        Self::new(workers, config)
    }

    pub fn workers(&self) -> &[P] {
        &self.workers
    }

    pub fn workers_mut(&mut self) -> &mut [P] {
        &mut self.workers
    }

    /// Flag that ends the current run once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Consume `records` until one of the stop conditions fires.
    pub fn run<S>(
        &mut self,
        records: Receiver<Vec<f64>>,
        sink: S,
    ) -> ConsumerReport<<P::Output as ProcessOutcome>::Total>
    where
        S: ResultSink<P::Output>,
    {
        let state = Mutex::new(RunState {
            sink,
            consumed: 0,
            succeeded: 0,
            consecutive_failures: 0,
            reason: None,
            total: None,
        });
        let stop = self.stop.as_ref();
        let wait_timeout = self.wait_timeout;
        let max_failures = self.max_consecutive_failures;
        let target = self.target_count;

        log::info!("Record consumer starting with {} workers", self.workers.len());

        thread::scope(|scope| {
            for (id, worker) in self.workers.iter_mut().enumerate() {
                let records = records.clone();
                let shared = &state;
                scope.spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let record = match records.recv_timeout(wait_timeout) {
                            Ok(record) => record,
                            Err(e) => {
                                log::debug!("Worker {}: {}", id, e);
                                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                                state.reason.get_or_insert(StopReason::ProducerEmpty);
                                stop.store(true, Ordering::Relaxed);
                                break;
                            }
                        };

                        let result = worker.process_record(&record);

                        let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                        state.consumed += 1;
                        state.sink.on_result(&result);

                        if result.is_successful() {
                            result.absorb_into(&mut state.total);
                            state.succeeded += 1;
                            state.consecutive_failures = 0;
                            if target.is_some_and(|target| state.succeeded >= target) {
                                state.reason.get_or_insert(StopReason::TargetReached);
                                stop.store(true, Ordering::Relaxed);
                            }
                        } else if result.is_cancelled() {
                            log::debug!("Worker {}: record abandoned", id);
                        } else {
                            state.consecutive_failures += 1;
                            log::debug!(
                                "Worker {}: record failed ({:?}), {} in a row",
                                id,
                                result.exception(),
                                state.consecutive_failures
                            );
                            if state.consecutive_failures >= max_failures {
                                log::warn!(
                                    "{} consecutive records failed, treating source as invalid",
                                    state.consecutive_failures
                                );
                                state.reason.get_or_insert(StopReason::SourceInvalid);
                                stop.store(true, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        });

        let state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let stop_reason = state.reason.unwrap_or(StopReason::Cancelled);
        log::info!(
            "Record consumer stopped ({:?}): {} consumed, {} succeeded",
            stop_reason,
            state.consumed,
            state.succeeded
        );
        self.stop.store(false, Ordering::Relaxed);

        ConsumerReport {
            consumed: state.consumed,
            succeeded: state.succeeded,
            stop_reason,
            total: state.total,
        }
    }
}
