//! Transport-level failures.

/// Failure of a single HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("server returned HTTP {0}")]
    Status(u32),
    /// The server answered a ranged request with bytes outside the range
    /// (typically `200 OK` with the full body).
    #[error("server ignored the requested range (HTTP {status})")]
    RangeIgnored { status: u32 },
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("transfer aborted by receiver")]
    Aborted,
    #[error("transfer cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        if e.is_operation_timedout() {
            return TransportError::Timeout(e.to_string());
        }
        if e.is_couldnt_connect()
            || e.is_couldnt_resolve_host()
            || e.is_couldnt_resolve_proxy()
            || e.is_read_error()
            || e.is_recv_error()
            || e.is_send_error()
            || e.is_got_nothing()
            || e.is_partial_file()
        {
            return TransportError::Connection(e.to_string());
        }
        TransportError::Other(e.to_string())
    }
}
