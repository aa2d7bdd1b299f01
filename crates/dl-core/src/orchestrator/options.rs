use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::ClassificationMap;
use crate::progress::DEFAULT_PROGRESS_INTERVAL;
use crate::retry::RetryPolicy;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Rejected before a job starts; nothing has been touched yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme {0:?}; only http and https are supported")]
    UnsupportedScheme(String),
}

/// Immutable, validated parameters of one download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    url: String,
    directory: PathBuf,
    file_name: Option<String>,
    concurrency: usize,
    classification: Option<ClassificationMap>,
    retry_policy: RetryPolicy,
    progress_interval: Duration,
}

impl DownloadOptions {
    pub fn builder(url: impl Into<String>) -> DownloadOptionsBuilder {
        DownloadOptionsBuilder {
            url: url.into(),
            directory: PathBuf::from("."),
            file_name: None,
            concurrency: DEFAULT_CONCURRENCY,
            classification: None,
            retry_policy: RetryPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Explicit output name, overriding anything derived from the response.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// `None` disables classification subfolders.
    pub fn classification(&self) -> Option<&ClassificationMap> {
        self.classification.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn progress_interval(&self) -> Duration {
        self.progress_interval
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptionsBuilder {
    url: String,
    directory: PathBuf,
    file_name: Option<String>,
    concurrency: usize,
    classification: Option<ClassificationMap>,
    retry_policy: RetryPolicy,
    progress_interval: Duration,
}

impl DownloadOptionsBuilder {
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = dir.into();
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn classification(mut self, map: Option<ClassificationMap>) -> Self {
        self.classification = map;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Validates every field; no I/O happens here.
    pub fn build(self) -> Result<DownloadOptions, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidUrl {
                url: self.url,
                reason: "missing host".to_string(),
            });
        }

        Ok(DownloadOptions {
            url: self.url,
            directory: self.directory,
            file_name: self.file_name.filter(|n| !n.trim().is_empty()),
            concurrency: self.concurrency,
            classification: self.classification,
            retry_policy: self.retry_policy,
            progress_interval: if self.progress_interval.is_zero() {
                DEFAULT_PROGRESS_INTERVAL
            } else {
                self.progress_interval
            },
        })
    }
}
