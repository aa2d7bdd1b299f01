//! libcurl-backed transport (via the `curl` crate).

use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::str;
use std::time::Duration;

use curl::easy::Easy;
use tokio_util::sync::CancellationToken;

use super::parse;
use super::{BodySink, HeadInfo, RangeRequest, Transport, TransportError};

/// Blocking HTTP transport on top of libcurl's easy interface.
///
/// One `Easy` handle per call, so the transport is freely shareable between
/// chunk workers.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    /// Connect timeout for ranged GETs.
    pub connect_timeout: Duration,
    /// Abort a GET whose throughput stays below this many bytes/s ...
    pub low_speed_limit: u32,
    /// ... for this long.
    pub low_speed_time: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}

impl Transport for CurlTransport {
    fn head(&self, url: &str, timeout: Duration) -> Result<HeadInfo, TransportError> {
        let mut lines: Vec<String> = Vec::new();

        let mut easy = Easy::new();
        easy.url(url)?;
        easy.nobody(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(timeout)?;
        easy.timeout(timeout)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !is_success(code) {
            return Err(TransportError::Status(code));
        }
        Ok(parse::parse_head_lines(&lines))
    }

    fn get(
        &self,
        request: &RangeRequest,
        sink: &mut dyn BodySink,
        cancel: &CancellationToken,
    ) -> Result<u32, TransportError> {
        let headers: RefCell<Vec<String>> = RefCell::new(Vec::new());
        // Set once the first body buffer arrives: Ok(2xx) was handed to the
        // sink, Err(code) means the body is an error page being drained.
        let resolved: Cell<Option<Result<u32, u32>>> = Cell::new(None);
        let sink_aborted = Cell::new(false);

        let mut easy = Easy::new();
        easy.url(request.url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        easy.progress(true)?;
        if let Some((first, last)) = request.range {
            easy.range(&format!("{}-{}", first, last))?;
        }

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.borrow_mut().push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer.write_function(|data| {
                if cancel.is_cancelled() {
                    return Ok(0);
                }
                let state = match resolved.get() {
                    Some(state) => state,
                    None => {
                        let code = parse::last_status(&headers.borrow()).unwrap_or(0);
                        let state = if is_success(code) { Ok(code) } else { Err(code) };
                        resolved.set(Some(state));
                        if let Ok(code) = state {
                            if sink.on_response(code).is_break() {
                                sink_aborted.set(true);
                                return Ok(0);
                            }
                        }
                        state
                    }
                };
                if state.is_err() {
                    return Ok(data.len());
                }
                match sink.on_data(data) {
                    ControlFlow::Continue(()) => Ok(data.len()),
                    ControlFlow::Break(()) => {
                        sink_aborted.set(true);
                        Ok(0)
                    }
                }
            })?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            if sink_aborted.get() {
                return Err(TransportError::Aborted);
            }
            return Err(e.into());
        }

        let code = easy.response_code()?;
        if !is_success(code) {
            return Err(TransportError::Status(code));
        }
        if resolved.get().is_none() && sink.on_response(code).is_break() {
            return Err(TransportError::Aborted);
        }
        Ok(code)
    }
}
