pub mod config;
pub mod logging;

pub mod classify;
pub mod fetcher;
pub mod naming;
pub mod notify;
pub mod orchestrator;
pub mod placement;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod segmenter;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use orchestrator::{
    ConfigError, DownloadError, DownloadOptions, DownloadOutcome, Downloader, JobStatus,
};
