//! Size probe: HEAD the target with bounded, cancellable retries.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::retry::{classify, ErrorKind, RetryDecision, RetryPolicy};
use crate::transport::{HeadInfo, Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("size probe failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
    #[error("size probe rejected: {0}")]
    Rejected(#[source] TransportError),
    #[error("size probe cancelled")]
    Cancelled,
}

/// What the probe learned about the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Total size in bytes; 0 means unknown.
    pub total_size: u64,
    pub accept_ranges: Option<bool>,
    pub content_disposition: Option<String>,
}

impl RemoteInfo {
    /// Known, non-zero size.
    pub fn size(&self) -> Option<u64> {
        (self.total_size > 0).then_some(self.total_size)
    }
}

impl From<HeadInfo> for RemoteInfo {
    fn from(head: HeadInfo) -> Self {
        RemoteInfo {
            total_size: head.content_length.unwrap_or(0),
            accept_ranges: head.accept_ranges,
            content_disposition: head.content_disposition,
        }
    }
}

async fn attempt(
    transport: &Arc<dyn Transport>,
    url: &str,
    policy: &RetryPolicy,
) -> Result<HeadInfo, TransportError> {
    let transport = Arc::clone(transport);
    let url = url.to_string();
    let timeout = policy.attempt_timeout;
    let call = tokio::task::spawn_blocking(move || transport.head(&url, timeout));
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(TransportError::Other(format!("probe task failed: {}", join))),
        Err(_) => Err(TransportError::Timeout(format!(
            "no response within {:?}",
            timeout
        ))),
    }
}

/// HEAD statuses meaning "this server does not answer HEAD" rather than
/// "this resource is unavailable".
fn head_unsupported(err: &TransportError) -> bool {
    matches!(err, TransportError::Status(405) | TransportError::Status(501))
}

/// Discovers the total size of `url`.
///
/// Transport failures and throttling/5xx are retried per `policy`; other
/// statuses (e.g. 404) fail at once. A missing or malformed length is not an
/// error: the result then reports size 0 (unknown). So is a server that
/// refuses HEAD with 405 or 501; the body is then streamed in one piece.
pub async fn probe_size(
    transport: Arc<dyn Transport>,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<RemoteInfo, ProbeError> {
    tracing::info!(url, "fetching file's meta information");
    let mut n = 1u32;
    loop {
        if n > 1 {
            tracing::info!(attempt = n, "retrying size probe");
        }
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            r = attempt(&transport, url, policy) => r,
        };
        let err = match result {
            Ok(head) => {
                let info = RemoteInfo::from(head);
                tracing::debug!(
                    total_size = info.total_size,
                    accept_ranges = ?info.accept_ranges,
                    "size probe resolved"
                );
                return Ok(info);
            }
            Err(e) => e,
        };

        if head_unsupported(&err) {
            tracing::warn!(error = %err, "server refused HEAD, size unknown");
            return Ok(RemoteInfo::default());
        }

        let kind = classify(&err);
        tracing::debug!(attempt = n, error = %err, ?kind, "size probe attempt failed");
        match policy.decide(n, kind) {
            RetryDecision::NoRetry if kind == ErrorKind::Other => {
                return Err(ProbeError::Rejected(err));
            }
            RetryDecision::NoRetry => {
                return Err(ProbeError::Exhausted {
                    attempts: n,
                    last: err,
                });
            }
            RetryDecision::RetryAfter(delay) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                n += 1;
            }
        }
    }
}
