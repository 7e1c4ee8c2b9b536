use anyhow::{Result, anyhow};
use crossbeam::channel::unbounded;
use serde::Serialize;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cancel::CancellationToken;
use super::pool::{ElasticPool, PoolConfig, PoolState, WaitOutcome};
use super::stats::{AggregateStats, FileTally, StatsSnapshot};
use crate::files::{InputSource, OutputTarget};
use crate::strand::{FileReport, FileStatus, StrandProcessor};

/// How the pool ended up after [`TaskCoordinator::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownStatus {
    /// Every task finished within the graceful wait
    Completed,
    /// The graceful wait elapsed; tasks stopped after being cancelled
    CompletedAfterCancel,
    /// Tasks were still running after both waits
    DidNotTerminate,
    /// The caller's interrupt fired while waiting
    Interrupted,
}

/// Timeouts and pool sizing for one run
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub pool: PoolConfig,
    pub graceful_timeout: Duration,
    pub forced_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            graceful_timeout: Duration::from_secs(60),
            forced_timeout: Duration::from_secs(60),
        }
    }
}

/// What a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: ShutdownStatus,
    pub final_state: PoolState,
    pub files_submitted: usize,
    /// Reports of tasks that finished, in completion order
    pub files: Vec<FileReport>,
    pub workers_spawned: usize,
    pub elapsed_ms: u64,
    pub stats: StatsSnapshot,
}

impl RunSummary {
    pub fn completed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.status == FileStatus::Completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| matches!(f.status, FileStatus::Failed(_)))
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.status == FileStatus::Cancelled)
    }
}

/// Runs one strand-processing task per input on an [`ElasticPool`].
///
/// Lifecycle of a run:
///
/// ```text
/// Accepting ──submit all──▶ Draining ──graceful timeout──▶ ForceCancelling ──forced timeout──▶ Terminated (abandoned)
///                              │                                 │
///                              └────────all tasks done───────────┴──────────▶ Terminated
/// ```
///
/// The statistics are injected so several runs can share or separate them.
pub struct TaskCoordinator {
    config: CoordinatorConfig,
    processor: Arc<StrandProcessor>,
    stats: Arc<AggregateStats>,
}

impl TaskCoordinator {
    pub fn new(config: CoordinatorConfig, processor: StrandProcessor, stats: Arc<AggregateStats>) -> Self {
        Self {
            config,
            processor: Arc::new(processor),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<AggregateStats> {
        &self.stats
    }

    /// Process every input and shut the pool down.
    ///
    /// Per-file failures end up in the summary. Only a failure to submit work
    /// is returned as an error, after cancelling whatever was already queued.
    pub fn run<I>(&self, inputs: Vec<I>, output: Arc<dyn OutputTarget>, interrupt: &CancellationToken) -> Result<RunSummary>
    where
        I: InputSource + 'static,
    {
        let start_time = Instant::now();
        let files_submitted = inputs.len();
        let pool = ElasticPool::new(self.config.pool.clone());
        let (report_tx, report_rx) = unbounded::<FileReport>();

        tracing::debug!(files = files_submitted, "Submitting tasks");
        for input in inputs {
            let processor = Arc::clone(&self.processor);
            let stats = Arc::clone(&self.stats);
            let output = Arc::clone(&output);
            let report_tx = report_tx.clone();

            let submitted = pool.submit(move |cancel| {
                let report = catch_unwind(AssertUnwindSafe(|| run_task(&processor, &input, output.as_ref(), cancel)))
                    .unwrap_or_else(|payload| {
                        let error = anyhow!("Task panicked: {}", panic_message(payload.as_ref()));
                        tracing::error!(input = input.name(), "{:#}", error);
                        FileReport::failed(input.name(), FileTally::default(), &error)
                    });
                stats.absorb(&report.tally);
                // The coordinator may have stopped listening after a timeout
                let _ = report_tx.send(report);
            });

            if let Err(e) = submitted {
                pool.shutdown_now();
                return Err(e);
            }
        }
        drop(report_tx);

        pool.shutdown();
        let status = self.await_shutdown(&pool, interrupt);
        let files: Vec<FileReport> = report_rx.try_iter().collect();

        let summary = RunSummary {
            status,
            final_state: pool.state(),
            files_submitted,
            files,
            workers_spawned: pool.spawned_workers(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stats: self.stats.snapshot(),
        };

        tracing::debug!(
            status = ?summary.status,
            files = summary.files.len(),
            workers = summary.workers_spawned,
            elapsed_ms = summary.elapsed_ms,
            "Run finished"
        );
        Ok(summary)
    }

    /// Two-phase wait: graceful, then cancel and wait again.
    fn await_shutdown(&self, pool: &ElasticPool, interrupt: &CancellationToken) -> ShutdownStatus {
        match pool.await_termination(self.config.graceful_timeout, Some(interrupt)) {
            WaitOutcome::Terminated => return ShutdownStatus::Completed,
            WaitOutcome::Interrupted => return Self::interrupted(pool, self.config.forced_timeout),
            WaitOutcome::TimedOut => {}
        }

        tracing::warn!(
            pending = pool.pending(),
            timeout_secs = self.config.graceful_timeout.as_secs_f64(),
            "Tasks still running after graceful wait, cancelling"
        );
        pool.shutdown_now();

        match pool.await_termination(self.config.forced_timeout, Some(interrupt)) {
            WaitOutcome::Terminated => ShutdownStatus::CompletedAfterCancel,
            WaitOutcome::Interrupted => Self::interrupted(pool, self.config.forced_timeout),
            WaitOutcome::TimedOut => {
                tracing::warn!(pending = pool.pending(), "Pool did not terminate");
                pool.abandon();
                ShutdownStatus::DidNotTerminate
            }
        }
    }

    /// Cancel everything, then give tasks one bounded chance to notice so the
    /// statistics settle. The interrupt token is left set for the caller.
    fn interrupted(pool: &ElasticPool, settle: Duration) -> ShutdownStatus {
        tracing::warn!(pending = pool.pending(), "Interrupted, cancelling outstanding tasks");
        pool.shutdown_now();
        if pool.await_termination(settle, None) == WaitOutcome::TimedOut {
            tracing::warn!(pending = pool.pending(), "Pool did not terminate after interrupt");
            pool.abandon();
        }
        ShutdownStatus::Interrupted
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

fn run_task(
    processor: &StrandProcessor,
    input: &dyn InputSource,
    output: &dyn OutputTarget,
    cancel: &CancellationToken,
) -> FileReport {
    let name = input.name();
    tracing::debug!(input = name, "Task started");

    let reader = match input.open() {
        Ok(reader) => reader,
        Err(e) => {
            tracing::error!(input = name, "{:#}", e);
            return FileReport::failed(name, FileTally::default(), &e);
        }
    };

    let report = processor.process(name, reader, || output.create(name), cancel);
    tracing::debug!(input = name, status = ?report.status, lines = report.tally.total, "Task finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, Cursor, Read, Write};
    use std::sync::Mutex;

    /// In-memory input
    struct MemoryInput {
        name: String,
        contents: String,
    }

    impl MemoryInput {
        fn new(name: &str, contents: &str) -> Self {
            Self {
                name: name.to_string(),
                contents: contents.to_string(),
            }
        }
    }

    impl InputSource for MemoryInput {
        fn name(&self) -> &str {
            &self.name
        }

        fn open(&self) -> Result<Box<dyn BufRead + Send>> {
            if self.name.starts_with("unreadable") {
                anyhow::bail!("permission denied");
            }
            Ok(Box::new(Cursor::new(self.contents.clone().into_bytes())))
        }
    }

    /// Collects output per input name
    #[derive(Default)]
    struct MemoryOutput {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    struct MemorySink {
        name: String,
        buffer: Vec<u8>,
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Write for MemorySink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.files.lock().unwrap().insert(self.name.clone(), self.buffer.clone());
            Ok(())
        }
    }

    impl OutputTarget for MemoryOutput {
        fn create(&self, input_name: &str) -> Result<Box<dyn Write + Send>> {
            Ok(Box::new(MemorySink {
                name: format!("complementaryFitas_{input_name}"),
                buffer: Vec::new(),
                files: Arc::clone(&self.files),
            }))
        }
    }

    impl MemoryOutput {
        fn contents(&self, name: &str) -> Option<String> {
            let files = self.files.lock().unwrap();
            files.get(name).map(|b| String::from_utf8(b.clone()).unwrap())
        }
    }

    /// Input whose reader sleeps between lines, for timeout tests
    struct SlowInput {
        name: String,
        lines: usize,
        delay: Duration,
    }

    struct SlowReader {
        remaining: usize,
        delay: Duration,
    }

    impl Read for SlowReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Ok(0);
            }
            std::thread::sleep(self.delay);
            self.remaining -= 1;
            let line = b"ACGT\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    impl InputSource for SlowInput {
        fn name(&self) -> &str {
            &self.name
        }

        fn open(&self) -> Result<Box<dyn BufRead + Send>> {
            Ok(Box::new(std::io::BufReader::with_capacity(
                16,
                SlowReader {
                    remaining: self.lines,
                    delay: self.delay,
                },
            )))
        }
    }

    /// Input whose `open` panics
    struct PanickingInput;

    impl InputSource for PanickingInput {
        fn name(&self) -> &str {
            "panics.txt"
        }

        fn open(&self) -> Result<Box<dyn BufRead + Send>> {
            panic!("disk on fire");
        }
    }

    fn coordinator(config: CoordinatorConfig) -> TaskCoordinator {
        TaskCoordinator::new(config, StrandProcessor::default(), Arc::new(AggregateStats::new()))
    }

    fn small_pool_config(max_threads: usize) -> CoordinatorConfig {
        CoordinatorConfig {
            pool: PoolConfig {
                max_threads,
                keep_alive: Duration::from_millis(100),
                ..PoolConfig::default()
            },
            graceful_timeout: Duration::from_secs(30),
            forced_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_zero_inputs() {
        let coordinator = coordinator(CoordinatorConfig::default());
        let output: Arc<dyn OutputTarget> = Arc::new(MemoryOutput::default());

        let summary = coordinator
            .run(Vec::<MemoryInput>::new(), output, &CancellationToken::new())
            .unwrap();

        assert_eq!(summary.status, ShutdownStatus::Completed);
        assert_eq!(summary.final_state, PoolState::Terminated);
        assert_eq!(summary.stats, StatsSnapshot::default());
        assert!(summary.files.is_empty());
        assert_eq!(summary.workers_spawned, 0);
    }

    #[test]
    fn test_single_file_scenario() {
        let coordinator = coordinator(CoordinatorConfig::default());
        let output = Arc::new(MemoryOutput::default());

        let summary = coordinator
            .run(
                vec![MemoryInput::new("dna.txt", "ATCG\nATXG\n\nGGTA\n")],
                output.clone(),
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(summary.status, ShutdownStatus::Completed);
        assert_eq!(
            output.contents("complementaryFitas_dna.txt").unwrap(),
            "TAGC\n****FITA INVALIDA - ATXG\n\nCCAT\n"
        );
        assert_eq!(summary.stats.total, 4);
        assert_eq!(summary.stats.valid, 3);
        assert_eq!(summary.stats.invalid, 1);
        assert_eq!(summary.stats.invalid_lines, vec![2]);
    }

    #[test]
    fn test_many_files_small_pool_no_lost_updates() {
        let coordinator = coordinator(small_pool_config(2));
        let output = Arc::new(MemoryOutput::default());

        let mut inputs = Vec::new();
        let mut expected_valid = 0;
        let mut expected_invalid = 0;
        for i in 0..200 {
            let mut contents = String::new();
            for line in 0..(i % 7 + 1) {
                if (i + line) % 4 == 0 {
                    contents.push_str("ACGN\n");
                    expected_invalid += 1;
                } else {
                    contents.push_str("ACGT\n");
                    expected_valid += 1;
                }
            }
            inputs.push(MemoryInput::new(&format!("f{i}.txt"), &contents));
        }

        let summary = coordinator.run(inputs, output.clone(), &CancellationToken::new()).unwrap();

        assert_eq!(summary.status, ShutdownStatus::Completed);
        assert_eq!(summary.files.len(), 200);
        assert!(summary.workers_spawned <= 2);
        assert_eq!(summary.stats.valid, expected_valid);
        assert_eq!(summary.stats.invalid, expected_invalid);
        assert!(summary.stats.is_consistent());

        // Per-file tallies sum to the global numbers
        let local_valid: usize = summary.files.iter().map(|f| f.tally.valid).sum();
        let local_invalid: usize = summary.files.iter().map(|f| f.tally.invalid).sum();
        assert_eq!(local_valid, summary.stats.valid);
        assert_eq!(local_invalid, summary.stats.invalid);
        assert_eq!(output.files.lock().unwrap().len(), 200);
    }

    #[test]
    fn test_unreadable_input_does_not_sink_the_batch() {
        let coordinator = coordinator(CoordinatorConfig::default());
        let output = Arc::new(MemoryOutput::default());

        let summary = coordinator
            .run(
                vec![
                    MemoryInput::new("good.txt", "AAAA\n"),
                    MemoryInput::new("unreadable.txt", "CCCC\n"),
                    MemoryInput::new("also_good.txt", "XXXX\n"),
                ],
                output.clone(),
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(summary.status, ShutdownStatus::Completed);
        assert_eq!(summary.completed().count(), 2);
        let failed: Vec<_> = summary.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].input, "unreadable.txt");

        assert_eq!(output.contents("complementaryFitas_good.txt").unwrap(), "TTTT\n");
        assert!(output.contents("complementaryFitas_unreadable.txt").is_none());
        assert_eq!(summary.stats.total, 2);
    }

    #[test]
    fn test_panicking_task_is_reported_as_failed() {
        let coordinator = coordinator(CoordinatorConfig::default());
        let output: Arc<dyn OutputTarget> = Arc::new(MemoryOutput::default());

        let summary = coordinator
            .run(vec![PanickingInput, PanickingInput], output, &CancellationToken::new())
            .unwrap();

        assert_eq!(summary.status, ShutdownStatus::Completed);
        assert_eq!(summary.final_state, PoolState::Terminated);
        let failed: Vec<_> = summary.failed().collect();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].input, "panics.txt");
        assert!(matches!(&failed[0].status, FileStatus::Failed(msg) if msg.contains("disk on fire")));
        assert_eq!(summary.stats, StatsSnapshot::default());
    }

    #[test]
    fn test_graceful_timeout_forces_cancellation() {
        let config = CoordinatorConfig {
            graceful_timeout: Duration::from_millis(50),
            forced_timeout: Duration::from_secs(10),
            ..small_pool_config(0)
        };
        let coordinator = coordinator(config);
        let output: Arc<dyn OutputTarget> = Arc::new(MemoryOutput::default());

        let inputs = vec![SlowInput {
            name: "slow.txt".to_string(),
            lines: 10_000,
            delay: Duration::from_millis(2),
        }];
        let summary = coordinator.run(inputs, output, &CancellationToken::new()).unwrap();

        assert_eq!(summary.status, ShutdownStatus::CompletedAfterCancel);
        assert_eq!(summary.cancelled().count(), 1);
        // Lines seen before cancellation still count
        assert!(summary.stats.total > 0);
        assert!(summary.stats.total < 10_000);
        assert!(summary.stats.is_consistent());
    }

    #[test]
    fn test_interrupt_cancels_outstanding_tasks() {
        let coordinator = coordinator(small_pool_config(0));
        let output: Arc<dyn OutputTarget> = Arc::new(MemoryOutput::default());

        let interrupt = CancellationToken::new();
        let remote = interrupt.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        let inputs = vec![SlowInput {
            name: "slow.txt".to_string(),
            lines: 10_000,
            delay: Duration::from_millis(2),
        }];
        let summary = coordinator.run(inputs, output, &interrupt).unwrap();

        assert_eq!(summary.status, ShutdownStatus::Interrupted);
        assert!(interrupt.is_cancelled());
        assert_eq!(summary.cancelled().count(), 1);
    }

    #[test]
    fn test_did_not_terminate_is_reported_not_fatal() {
        let config = CoordinatorConfig {
            graceful_timeout: Duration::from_millis(20),
            forced_timeout: Duration::from_millis(20),
            ..small_pool_config(0)
        };
        let coordinator = coordinator(config);
        let output: Arc<dyn OutputTarget> = Arc::new(MemoryOutput::default());

        // A single read that blocks longer than both waits
        let inputs = vec![SlowInput {
            name: "stuck.txt".to_string(),
            lines: 1,
            delay: Duration::from_millis(300),
        }];
        let summary = coordinator.run(inputs, output, &CancellationToken::new()).unwrap();

        assert_eq!(summary.status, ShutdownStatus::DidNotTerminate);
        assert_eq!(summary.final_state, PoolState::Terminated);
        assert!(summary.files.is_empty());
    }

    #[test]
    fn test_stats_accumulate_across_runs() {
        let stats = Arc::new(AggregateStats::new());
        let first = TaskCoordinator::new(CoordinatorConfig::default(), StrandProcessor::default(), stats.clone());
        let second = TaskCoordinator::new(CoordinatorConfig::default(), StrandProcessor::default(), stats.clone());
        let output: Arc<dyn OutputTarget> = Arc::new(MemoryOutput::default());

        first
            .run(vec![MemoryInput::new("a.txt", "AT\n")], output.clone(), &CancellationToken::new())
            .unwrap();
        let summary = second
            .run(vec![MemoryInput::new("b.txt", "Q\n")], output, &CancellationToken::new())
            .unwrap();

        assert_eq!(summary.stats.total, 2);
        assert_eq!(summary.stats.invalid_lines, vec![1]);
        assert!(Arc::ptr_eq(first.stats(), second.stats()));
    }
}
