//! Download orchestrator: probe, place, fan out one worker per chunk, drain.
//!
//! Workers run on the blocking pool and share one cancellation scope derived
//! from the caller's interrupt token. The first non-cancellation failure is
//! recorded in the job's [`ErrorBag`] and cancels the scope; siblings that
//! then observe cancellation exit without adding entries. The bag is only
//! inspected after every worker has returned.

mod options;
mod state;


pub use options::{ConfigError, DownloadOptions, DownloadOptionsBuilder, DEFAULT_CONCURRENCY};
pub use state::{DownloadError, DownloadOutcome, ErrorBag, JobState, JobStatus};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetcher::fetch_chunk;
use crate::naming::derive_file_name;
use crate::placement::{place_file, resolve_output_path};
use crate::probe::{probe_size, ProbeError, RemoteInfo};
use crate::progress::{ProgressSink, Reporter, SharedProgress};
use crate::segmenter::{plan_chunks, Chunk};
use crate::transport::Transport;

use state::DownloadJob;

/// Single-chunk fallback when the size is unknown or ranges are refused.
fn plan_for(remote: &RemoteInfo, concurrency: usize) -> Vec<Chunk> {
    match (remote.size(), remote.accept_ranges) {
        (None, _) => vec![Chunk::open_ended()],
        (Some(size), Some(false)) => vec![Chunk::whole(size)],
        (Some(size), _) => plan_chunks(size, concurrency),
    }
}

/// Runs downloads over a pluggable [`Transport`].
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs one download to completion.
    ///
    /// Never returns early with an error: every failure ends up in the
    /// outcome's error bag. Cancelling `interrupt` stops all workers; the
    /// outcome is then [`JobStatus::Cancelled`].
    pub async fn run(
        &self,
        options: &DownloadOptions,
        sink: Box<dyn ProgressSink>,
        interrupt: &CancellationToken,
    ) -> DownloadOutcome {
        let mut job = DownloadJob::new(options);
        let scope = interrupt.child_token();

        job.transition(JobState::ProbingSize);
        let remote = match probe_size(
            Arc::clone(&self.transport),
            &job.url,
            options.retry_policy(),
            &scope,
        )
        .await
        {
            Ok(remote) => remote,
            Err(ProbeError::Cancelled) => {
                job.errors.push(DownloadError::Cancelled);
                return job.finish(JobStatus::Cancelled);
            }
            Err(e) => {
                tracing::error!(url = %job.url, "size probe failed: {}", e);
                scope.cancel();
                job.errors.push(e.into());
                return job.finish(JobStatus::Failed);
            }
        };
        job.set_total_size(remote.total_size);
        if remote.size().is_none() {
            tracing::info!(url = %job.url, "size unknown; falling back to a single stream");
        }

        job.transition(JobState::PlacingFile);
        job.file_name = derive_file_name(
            options.file_name(),
            remote.content_disposition.as_deref(),
            &job.url,
        );
        let path = resolve_output_path(options.directory(), &job.file_name, options.classification());
        if let Err(e) = place_file(&path, remote.size()) {
            tracing::error!("output placement failed: {}", e);
            scope.cancel();
            job.errors.push(e.into());
            return job.finish(JobStatus::Failed);
        }
        job.path = Some(path.clone());

        let chunks = plan_for(&remote, job.concurrency);
        job.chunk_count = chunks.len();
        job.transition(JobState::Downloading);
        tracing::info!(
            file = %path.display(),
            total_size = ?job.total_size(),
            chunks = chunks.len(),
            "starting download"
        );

        let reporter = Reporter::spawn(
            Arc::clone(&job.progress),
            sink,
            job.total_size(),
            chunks.len(),
            options.progress_interval(),
            job.started,
        );
        self.dispatch(&job, &path, chunks, &scope).await;

        job.transition(JobState::Draining);
        if interrupt.is_cancelled() && job.errors.is_empty() {
            job.errors.push(DownloadError::Cancelled);
        }
        let status = if job.errors.is_empty() {
            JobStatus::Succeeded
        } else if interrupt.is_cancelled() {
            JobStatus::Cancelled
        } else {
            JobStatus::Failed
        };
        reporter.stop(status == JobStatus::Succeeded).await;

        match status {
            JobStatus::Succeeded => tracing::info!(
                file = %path.display(),
                bytes = job.progress.bytes(),
                elapsed_ms = job.started.elapsed().as_millis() as u64,
                "download complete"
            ),
            _ => tracing::warn!(
                file = %path.display(),
                errors = job.errors.len(),
                ?status,
                "download did not complete"
            ),
        }
        job.finish(status)
    }

    /// Starts one worker per chunk (in index order) and waits for all of them.
    async fn dispatch(
        &self,
        job: &DownloadJob,
        path: &Path,
        chunks: Vec<Chunk>,
        scope: &CancellationToken,
    ) {
        let handles: Vec<(usize, JoinHandle<()>)> = chunks
            .into_iter()
            .map(|chunk| {
                let worker = ChunkWorker {
                    transport: Arc::clone(&self.transport),
                    url: job.url.clone(),
                    path: path.to_path_buf(),
                    chunk,
                    progress: Arc::clone(&job.progress),
                    errors: Arc::clone(&job.errors),
                    scope: scope.clone(),
                };
                (chunk.index, tokio::task::spawn_blocking(move || worker.run()))
            })
            .collect();

        for (index, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(chunk = index, "worker task failed: {}", e);
                job.errors.push(DownloadError::WorkerPanicked { index });
                scope.cancel();
            }
        }
    }
}

/// Everything one blocking worker needs; moved onto the blocking pool.
struct ChunkWorker {
    transport: Arc<dyn Transport>,
    url: String,
    path: PathBuf,
    chunk: Chunk,
    progress: Arc<SharedProgress>,
    errors: Arc<ErrorBag>,
    scope: CancellationToken,
}

impl ChunkWorker {
    fn run(self) {
        let index = self.chunk.index;
        let result = fetch_chunk(
            self.transport.as_ref(),
            &self.url,
            self.chunk,
            &self.path,
            &self.progress,
            &self.scope,
        );
        match result {
            Ok(bytes) => {
                self.progress.complete_chunk();
                tracing::debug!(chunk = index, bytes, "chunk complete");
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!(chunk = index, "chunk stopped by cancellation");
            }
            Err(e) => {
                tracing::error!(chunk = index, phase = e.phase(), "chunk failed: {}", e);
                self.errors.push(DownloadError::Chunk { index, source: e });
                self.scope.cancel();
            }
        }
    }
}
