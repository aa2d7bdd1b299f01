//! In-memory transport double for unit tests.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::transport::{BodySink, HeadInfo, RangeRequest, Transport, TransportError};

/// Injected failure: the GET whose range starts at `start` dies with a
/// connection error after `after_bytes` bytes.
#[derive(Debug, Clone, Copy)]
struct ChunkFault {
    start: u64,
    after_bytes: u64,
}

/// Serves one byte body; honours ranges unless told otherwise.
pub(crate) struct MemoryTransport {
    body: Vec<u8>,
    head: HeadInfo,
    head_failures: AtomicU32,
    head_calls: AtomicU32,
    head_status: Option<u32>,
    fault: Option<ChunkFault>,
    ignore_ranges: bool,
    piece_len: usize,
    piece_delay: Duration,
    requests: Mutex<Vec<Option<(u64, u64)>>>,
}

impl MemoryTransport {
    pub(crate) fn new(body: Vec<u8>) -> Self {
        let head = HeadInfo {
            content_length: Some(body.len() as u64),
            accept_ranges: Some(true),
            content_disposition: None,
        };
        Self {
            body,
            head,
            head_failures: AtomicU32::new(0),
            head_calls: AtomicU32::new(0),
            head_status: None,
            fault: None,
            ignore_ranges: false,
            piece_len: 64,
            piece_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_head(mut self, head: HeadInfo) -> Self {
        self.head = head;
        self
    }

    /// The first `n` HEAD requests fail with a connection error.
    pub(crate) fn failing_head(self, n: u32) -> Self {
        self.head_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Every HEAD request is answered with `status`.
    pub(crate) fn head_status(mut self, status: u32) -> Self {
        self.head_status = Some(status);
        self
    }

    pub(crate) fn failing_chunk(mut self, start: u64, after_bytes: u64) -> Self {
        self.fault = Some(ChunkFault { start, after_bytes });
        self
    }

    /// Always answer `200 OK` with the full body.
    pub(crate) fn ignoring_ranges(mut self) -> Self {
        self.ignore_ranges = true;
        self
    }

    /// Sleep between delivered pieces (simulates a slow link).
    pub(crate) fn with_piece_delay(mut self, delay: Duration) -> Self {
        self.piece_delay = delay;
        self
    }

    pub(crate) fn head_calls(&self) -> u32 {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requested_ranges(&self) -> Vec<Option<(u64, u64)>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MemoryTransport {
    fn head(&self, _url: &str, _timeout: Duration) -> Result<HeadInfo, TransportError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.head_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.head_failures.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(TransportError::Connection("connection refused".into()));
        }
        if let Some(status) = self.head_status {
            return Err(TransportError::Status(status));
        }
        Ok(self.head.clone())
    }

    fn get(
        &self,
        request: &RangeRequest,
        sink: &mut dyn BodySink,
        cancel: &CancellationToken,
    ) -> Result<u32, TransportError> {
        self.requests.lock().unwrap().push(request.range);
        let len = self.body.len() as u64;
        let (status, start, slice) = match request.range {
            Some((first, last)) if !self.ignore_ranges => {
                let end = (last + 1).min(len);
                (206, first, &self.body[first as usize..end as usize])
            }
            _ => (200, 0, &self.body[..]),
        };

        if sink.on_response(status).is_break() {
            return Err(TransportError::Aborted);
        }
        let mut sent = 0u64;
        for piece in slice.chunks(self.piece_len) {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            if let Some(fault) = self.fault {
                if fault.start == start && sent >= fault.after_bytes {
                    return Err(TransportError::Connection("connection reset by peer".into()));
                }
            }
            if !self.piece_delay.is_zero() {
                std::thread::sleep(self.piece_delay);
            }
            if let ControlFlow::Break(()) = sink.on_data(piece) {
                return Err(TransportError::Aborted);
            }
            sent += piece.len() as u64;
        }
        Ok(status)
    }
}
