//! Live progress: lock-free counters shared by chunk workers, and a reporter
//! task that samples them on a fixed tick.
//!
//! The reporter only reads atomics, so it never slows the workers down.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default sampling interval of the reporter.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Counters mutated by every worker of one job. Both only ever increase.
#[derive(Debug, Default)]
pub struct SharedProgress {
    bytes: AtomicU64,
    chunks_done: AtomicUsize,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bytes as they are written (called per received buffer).
    pub fn add_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn complete_chunk(&self) {
        self.chunks_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn chunks_done(&self) -> usize {
        self.chunks_done.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a running job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub bytes_done: u64,
    /// `None` when the server did not report a size.
    pub total_bytes: Option<u64>,
    pub chunks_done: usize,
    pub chunk_count: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Download rate in bytes per second (0 if no time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / secs
    }

    /// Completed fraction in `[0.0, 1.0]`; `None` when size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_done as f64 / total as f64).min(1.0)),
            None => None,
        }
    }

    /// Estimated time remaining (None if size unknown or rate is 0).
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }
}

/// Renders progress; implemented by the CLI (terminal bar) and by tests.
pub trait ProgressSink: Send {
    /// Called once, before the first tick.
    fn start(&mut self, total_bytes: Option<u64>, chunk_count: usize);
    /// Called on every tick.
    fn update(&mut self, snapshot: &ProgressSnapshot);
    /// Called once after all workers returned; `succeeded` is false when the
    /// job recorded any error or was interrupted.
    fn finish(&mut self, snapshot: &ProgressSnapshot, succeeded: bool);
}

/// Sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn start(&mut self, _total_bytes: Option<u64>, _chunk_count: usize) {}
    fn update(&mut self, _snapshot: &ProgressSnapshot) {}
    fn finish(&mut self, _snapshot: &ProgressSnapshot, _succeeded: bool) {}
}

/// Handle to a running reporter task.
pub struct Reporter {
    stop: oneshot::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Reporter {
    /// Starts sampling `progress` every `interval` into `sink`.
    pub fn spawn(
        progress: Arc<SharedProgress>,
        mut sink: Box<dyn ProgressSink>,
        total_bytes: Option<u64>,
        chunk_count: usize,
        interval: Duration,
        started: Instant,
    ) -> Self {
        let (stop, mut stop_rx) = oneshot::channel::<bool>();
        let handle = tokio::spawn(async move {
            let snapshot = |progress: &SharedProgress| ProgressSnapshot {
                bytes_done: progress.bytes(),
                total_bytes,
                chunks_done: progress.chunks_done(),
                chunk_count,
                elapsed: started.elapsed(),
            };

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            sink.start(total_bytes, chunk_count);

            // A dropped sender (job future abandoned) counts as failure.
            let succeeded = loop {
                tokio::select! {
                    signal = &mut stop_rx => break signal.unwrap_or(false),
                    _ = ticker.tick() => sink.update(&snapshot(&progress)),
                }
            };
            sink.finish(&snapshot(&progress), succeeded);
        });
        Reporter { stop, handle }
    }

    /// Signals completion and waits for the final render.
    pub async fn stop(self, succeeded: bool) {
        let _ = self.stop.send(succeeded);
        if let Err(e) = self.handle.await {
            tracing::warn!("progress reporter ended abnormally: {}", e);
        }
    }
}
