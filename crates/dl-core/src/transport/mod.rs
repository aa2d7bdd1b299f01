//! Transport seam: one blocking HTTP exchange per call.
//!
//! The downloader only talks to [`Transport`]. [`CurlTransport`] is the
//! production implementation; tests plug in in-memory doubles.

mod curl_transport;
mod error;
mod parse;

use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use curl_transport::CurlTransport;
pub use error::TransportError;

/// Metadata returned by a HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    /// `Content-Length`, if present and well-formed.
    pub content_length: Option<u64>,
    /// `Some(true)` for `Accept-Ranges: bytes`, `Some(false)` for any other
    /// advertised value (usually `none`), `None` when the header is absent.
    pub accept_ranges: Option<bool>,
    /// Raw `Content-Disposition` value (filename hint).
    pub content_disposition: Option<String>,
}

/// A GET request, optionally restricted to an inclusive byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub url: url::Url,
    /// Inclusive `(first, last)` byte positions; `None` requests the whole body.
    pub range: Option<(u64, u64)>,
}

impl RangeRequest {
    /// Value for the HTTP `Range` header, if any.
    pub fn range_header_value(&self) -> Option<String> {
        self.range
            .map(|(first, last)| format!("bytes={}-{}", first, last))
    }
}

/// Receiver of a response body.
///
/// `on_response` is called exactly once for a 2xx response, before any body
/// bytes (also when the body is empty). Returning `Break` aborts the transfer.
pub trait BodySink {
    fn on_response(&mut self, status: u32) -> ControlFlow<()>;
    fn on_data(&mut self, data: &[u8]) -> ControlFlow<()>;
}

/// "Send one request, get one response."
///
/// Calls block the current thread; async callers go through `spawn_blocking`.
pub trait Transport: Send + Sync {
    /// Metadata-only request. `timeout` bounds the whole exchange.
    fn head(&self, url: &str, timeout: Duration) -> Result<HeadInfo, TransportError>;

    /// Streams the body of `request` into `sink` and returns the HTTP status.
    ///
    /// Non-2xx responses return [`TransportError::Status`] without touching the
    /// sink. A sink abort yields [`TransportError::Aborted`]; a fired `cancel`
    /// token yields [`TransportError::Cancelled`].
    fn get(
        &self,
        request: &RangeRequest,
        sink: &mut dyn BodySink,
        cancel: &CancellationToken,
    ) -> Result<u32, TransportError>;
}
