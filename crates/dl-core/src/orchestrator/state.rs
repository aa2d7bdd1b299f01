//! Job-scoped shared state: lifecycle, error bag and the final outcome.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

use crate::fetcher::ChunkError;
use crate::placement::PlacementError;
use crate::probe::ProbeError;
use crate::progress::SharedProgress;

use super::DownloadOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Stopped by an external interrupt.
    Cancelled,
}

/// `Idle → ProbingSize → PlacingFile → Downloading → Draining → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    ProbingSize,
    PlacingFile,
    Downloading,
    Draining,
    Done(JobStatus),
}

/// One entry of the error bag.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("chunk {index} failed during {}: {source}", .source.phase())]
    Chunk {
        index: usize,
        #[source]
        source: ChunkError,
    },
    #[error("chunk {index} worker panicked")]
    WorkerPanicked { index: usize },
    #[error("operation cancelled")]
    Cancelled,
}

/// Append-only, shared by all workers; read after the completion barrier.
#[derive(Debug, Default)]
pub struct ErrorBag {
    entries: Mutex<Vec<DownloadError>>,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking worker must not hide the errors of the others.
    fn lock(&self) -> MutexGuard<'_, Vec<DownloadError>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, error: DownloadError) {
        self.lock().push(error);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn take(&self) -> Vec<DownloadError> {
        std::mem::take(&mut *self.lock())
    }
}

/// Result of one [`Downloader::run`](super::Downloader::run).
#[derive(Debug)]
pub struct DownloadOutcome {
    pub url: String,
    /// Empty when the job failed before a name was chosen.
    pub file_name: String,
    /// `None` when the job failed before the file was created.
    pub path: Option<PathBuf>,
    /// Size reported by the probe; `None` when unknown.
    pub total_size: Option<u64>,
    pub bytes_transferred: u64,
    pub chunk_count: usize,
    pub chunks_completed: usize,
    pub elapsed: Duration,
    pub status: JobStatus,
    pub errors: Vec<DownloadError>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn was_cancelled(&self) -> bool {
        self.status == JobStatus::Cancelled
    }

    /// Final on-disk size: the probed size, or what arrived when unknown.
    pub fn file_size(&self) -> u64 {
        self.total_size.unwrap_or(self.bytes_transferred)
    }
}

/// Owned by the orchestrator for the lifetime of one `run`.
pub(super) struct DownloadJob {
    pub(super) url: String,
    pub(super) concurrency: usize,
    total_size: OnceLock<u64>,
    pub(super) file_name: String,
    pub(super) path: Option<PathBuf>,
    pub(super) chunk_count: usize,
    state: JobState,
    pub(super) started: Instant,
    pub(super) progress: Arc<SharedProgress>,
    pub(super) errors: Arc<ErrorBag>,
}

impl DownloadJob {
    pub(super) fn new(options: &DownloadOptions) -> Self {
        Self {
            url: options.url().to_string(),
            concurrency: options.concurrency(),
            total_size: OnceLock::new(),
            file_name: String::new(),
            path: None,
            chunk_count: 0,
            state: JobState::Idle,
            started: Instant::now(),
            progress: Arc::new(SharedProgress::new()),
            errors: Arc::new(ErrorBag::new()),
        }
    }

    pub(super) fn transition(&mut self, next: JobState) {
        tracing::debug!(url = %self.url, from = ?self.state, to = ?next, "job state");
        self.state = next;
    }

    /// Set once by the probe; 0 is stored as unknown.
    pub(super) fn set_total_size(&self, size: u64) {
        if self.total_size.set(size).is_err() {
            tracing::warn!("total size already set; ignoring {}", size);
        }
    }

    pub(super) fn total_size(&self) -> Option<u64> {
        self.total_size.get().copied().filter(|s| *s > 0)
    }

    /// Moves to `Done` and packages the outcome.
    pub(super) fn finish(mut self, status: JobStatus) -> DownloadOutcome {
        self.transition(JobState::Done(status));
        DownloadOutcome {
            url: self.url,
            file_name: self.file_name,
            path: self.path,
            total_size: self.total_size.get().copied().filter(|s| *s > 0),
            bytes_transferred: self.progress.bytes(),
            chunk_count: self.chunk_count,
            chunks_completed: self.progress.chunks_done(),
            elapsed: self.started.elapsed(),
            status,
            errors: self.errors.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bag_survives_poisoning() {
        let bag = Arc::new(ErrorBag::new());
        let b = Arc::clone(&bag);
        let _ = std::thread::spawn(move || {
            let _guard = b.entries.lock().unwrap();
            panic!("worker died holding the lock");
        })
        .join();
        bag.push(DownloadError::Cancelled);
        assert_eq!(bag.len(), 1);
        assert!(matches!(bag.take().as_slice(), [DownloadError::Cancelled]));
        assert!(bag.is_empty());
    }

    #[test]
    fn total_size_is_set_once() {
        let opts = DownloadOptions::builder("http://example.com/a").build().unwrap();
        let job = DownloadJob::new(&opts);
        assert_eq!(job.total_size(), None);
        job.set_total_size(1000);
        job.set_total_size(5);
        assert_eq!(job.total_size(), Some(1000));
    }

    #[test]
    fn chunk_error_names_phase() {
        let e = DownloadError::Chunk {
            index: 2,
            source: ChunkError::RequestBuild("bad".into()),
        };
        assert_eq!(e.to_string(), "chunk 2 failed during request: failed to build request: bad");
    }
}
