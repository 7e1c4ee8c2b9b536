use anyhow::{Context, Result, bail};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::cancel::CancellationToken;

/// How often a blocked waiter re-checks its interrupt token
const INTERRUPT_POLL: Duration = Duration::from_millis(25);

type Job = Box<dyn FnOnce(&CancellationToken) + Send + 'static>;

/// Lifecycle of an [`ElasticPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// Jobs may be submitted
    Accepting,
    /// Shut down; waiting for submitted jobs to finish
    Draining,
    /// Cancellation requested; waiting for jobs to notice it
    ForceCancelling,
    /// Every submitted job has finished, or the pool was abandoned
    Terminated,
}

/// Outcome of waiting on the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Terminated,
    TimedOut,
    Interrupted,
}

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of worker threads (0 = no limit)
    pub max_threads: usize,
    /// How long an idle worker waits for a job before retiring
    pub keep_alive: Duration,
    /// Worker thread name prefix
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            keep_alive: Duration::from_secs(60),
            thread_name_prefix: "dnacomp-worker".to_string(),
        }
    }
}

struct PoolInner {
    state: PoolState,
    sender: Option<Sender<Job>>,
    /// Submitted jobs that have not finished yet
    pending: usize,
    live_workers: usize,
    /// Workers waiting for work that no queued job has claimed yet
    idle_workers: usize,
    /// Queued jobs with no worker claimed for them (only when capped)
    unclaimed: usize,
    spawned_total: usize,
}

struct Shared {
    inner: Mutex<PoolInner>,
    finished: Condvar,
    receiver: Receiver<Job>,
    cancel: CancellationToken,
    config: PoolConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        // Jobs never run while the lock is held, so poisoning cannot leave
        // the counters half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish_job(&self) {
        let mut inner = self.lock();
        inner.pending -= 1;
        if inner.unclaimed > 0 {
            inner.unclaimed -= 1;
        } else {
            inner.idle_workers += 1;
        }
        if inner.pending == 0 && inner.state != PoolState::Accepting {
            inner.state = PoolState::Terminated;
        }
        self.finished.notify_all();
    }
}

/// Thread pool that grows with demand and shrinks when idle.
///
/// Each submitted job claims an idle worker while the pool lock is held. When
/// none is idle a new worker is spawned, up to `max_threads` if one is set;
/// past the cap the job waits for the next worker to finish. Idle workers
/// retire after `keep_alive` without work. Every job receives
/// the pool's [`CancellationToken`], which [`ElasticPool::shutdown_now`] trips.
pub struct ElasticPool {
    shared: Arc<Shared>,
}

impl ElasticPool {
    pub fn new(config: PoolConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(PoolInner {
                    state: PoolState::Accepting,
                    sender: Some(sender),
                    pending: 0,
                    live_workers: 0,
                    idle_workers: 0,
                    unclaimed: 0,
                    spawned_total: 0,
                }),
                finished: Condvar::new(),
                receiver,
                cancel: CancellationToken::new(),
                config,
            }),
        }
    }

    /// Queue a job. Fails once the pool has been shut down.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&CancellationToken) + Send + 'static,
    {
        let mut inner = self.shared.lock();
        if inner.state != PoolState::Accepting {
            bail!("Pool is no longer accepting work (state: {:?})", inner.state);
        }

        let Some(sender) = inner.sender.clone() else {
            bail!("Pool job channel is closed");
        };

        let max = self.shared.config.max_threads;
        if inner.idle_workers > 0 {
            inner.idle_workers -= 1;
        } else if max == 0 || inner.live_workers < max {
            self.spawn_worker(&mut inner)?;
        } else {
            inner.unclaimed += 1;
        }

        sender
            .send(Box::new(job))
            .map_err(|_| anyhow::anyhow!("Pool job channel is closed"))?;
        inner.pending += 1;
        Ok(())
    }

    fn spawn_worker(&self, inner: &mut PoolInner) -> Result<()> {
        let worker_id = inner.spawned_total;
        let shared = Arc::clone(&self.shared);
        std::thread::Builder::new()
            .name(format!("{}-{}", self.shared.config.thread_name_prefix, worker_id))
            .spawn(move || worker_loop(shared, worker_id))
            .context("Failed to spawn worker thread")?;

        inner.spawned_total += 1;
        inner.live_workers += 1;
        tracing::trace!(worker = worker_id, live = inner.live_workers, "Spawned worker");
        Ok(())
    }

    /// Stop accepting work. Already submitted jobs keep running.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        if inner.state == PoolState::Accepting {
            inner.sender = None;
            inner.state = if inner.pending == 0 {
                PoolState::Terminated
            } else {
                PoolState::Draining
            };
            self.shared.finished.notify_all();
        }
    }

    /// Stop accepting work and ask running and queued jobs to stop.
    pub fn shutdown_now(&self) {
        self.shutdown();
        {
            let mut inner = self.shared.lock();
            if inner.state == PoolState::Draining {
                inner.state = PoolState::ForceCancelling;
            }
        }
        self.shared.cancel.cancel();
    }

    /// Stop waiting for jobs that ignored cancellation.
    ///
    /// The pool is marked `Terminated` even though `pending` may be non-zero;
    /// stragglers still run to completion on their own threads.
    pub fn abandon(&self) {
        self.shutdown_now();
        let mut inner = self.shared.lock();
        if inner.state != PoolState::Terminated {
            tracing::debug!(pending = inner.pending, "Abandoning unfinished jobs");
            inner.state = PoolState::Terminated;
            self.shared.finished.notify_all();
        }
    }

    /// Block until every job finished, `timeout` elapsed, or `interrupt` fired.
    pub fn await_termination(&self, timeout: Duration, interrupt: Option<&CancellationToken>) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.lock();

        loop {
            if inner.state == PoolState::Terminated {
                return WaitOutcome::Terminated;
            }
            if interrupt.is_some_and(CancellationToken::is_cancelled) {
                return WaitOutcome::Interrupted;
            }

            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            let slice = (deadline - now).min(INTERRUPT_POLL);
            inner = match self.shared.finished.wait_timeout(inner, slice) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn state(&self) -> PoolState {
        self.shared.lock().state
    }

    /// Jobs submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.shared.lock().pending
    }

    pub fn live_workers(&self) -> usize {
        self.shared.lock().live_workers
    }

    /// Workers spawned over the pool's lifetime
    pub fn spawned_workers(&self) -> usize {
        self.shared.lock().spawned_total
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }
}

impl Drop for ElasticPool {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    loop {
        match shared.receiver.recv_timeout(shared.config.keep_alive) {
            Ok(job) => {
                let cancel = shared.cancel.clone();
                if catch_unwind(AssertUnwindSafe(|| job(&cancel))).is_err() {
                    tracing::error!(worker = worker_id, "Task panicked");
                }

                shared.finish_job();
            }
            Err(RecvTimeoutError::Timeout) => {
                let mut inner = shared.lock();
                // A job may have claimed this worker while we timed out
                if !shared.receiver.is_empty() {
                    continue;
                }
                inner.idle_workers -= 1;
                inner.live_workers -= 1;
                tracing::trace!(worker = worker_id, "Worker retired after idling");
                return;
            }
            Err(RecvTimeoutError::Disconnected) => {
                let mut inner = shared.lock();
                inner.idle_workers -= 1;
                inner.live_workers -= 1;
                tracing::trace!(worker = worker_id, "Worker exiting, pool closed");
                return;
            }
        }
    }
}
