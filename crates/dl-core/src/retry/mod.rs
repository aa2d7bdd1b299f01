//! Retry policy for the size probe.
//!
//! Classifies transport failures (timeouts, throttling, connection errors)
//! and decides whether another attempt is worth making.

mod policy;

pub use policy::{ErrorKind, RetryDecision, RetryPolicy};

use crate::transport::TransportError;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a transport failure into an [`ErrorKind`].
pub fn classify(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Timeout(_) => ErrorKind::Timeout,
        TransportError::Connection(_) | TransportError::PartialTransfer { .. } => {
            ErrorKind::Connection
        }
        TransportError::Status(code) => classify_http_status(*code),
        TransportError::RangeIgnored { .. }
        | TransportError::Aborted
        | TransportError::Cancelled
        | TransportError::Other(_) => ErrorKind::Other,
    }
}
