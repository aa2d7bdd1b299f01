//! Range fetcher: one ranged GET streamed straight into the output file.
//!
//! Each call opens its own descriptor on the output path and writes only
//! inside its chunk, so concurrent fetchers never share a file cursor.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::progress::SharedProgress;
use crate::segmenter::Chunk;
use crate::transport::{BodySink, RangeRequest, Transport, TransportError};

/// Failure of one chunk, tagged by the phase that failed.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("failed to build request: {0}")]
    RequestBuild(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to position output at offset {offset}: {source}")]
    Seek {
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
    #[error("cancelled")]
    Cancelled,
}

impl ChunkError {
    /// Short label of the failing phase, used as a log field.
    pub fn phase(&self) -> &'static str {
        match self {
            ChunkError::RequestBuild(_) => "request",
            ChunkError::Transport(_) => "transport",
            ChunkError::Seek { .. } => "seek",
            ChunkError::Write(_) => "write",
            ChunkError::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChunkError::Cancelled)
    }
}

/// Writes a response body into `[chunk.start, chunk.end)` of the output file.
struct ChunkSink<'a> {
    path: &'a Path,
    chunk: Chunk,
    progress: &'a SharedProgress,
    file: Option<File>,
    status: u32,
    written: u64,
    failure: Option<ChunkError>,
}

impl<'a> ChunkSink<'a> {
    fn new(path: &'a Path, chunk: Chunk, progress: &'a SharedProgress) -> Self {
        Self {
            path,
            chunk,
            progress,
            file: None,
            status: 0,
            written: 0,
            failure: None,
        }
    }

    fn fail(&mut self, e: ChunkError) -> ControlFlow<()> {
        self.failure = Some(e);
        ControlFlow::Break(())
    }
}

impl BodySink for ChunkSink<'_> {
    fn on_response(&mut self, status: u32) -> ControlFlow<()> {
        self.status = status;
        // A full-body 200 is only acceptable when the chunk starts at 0;
        // overflow past the chunk end is caught in on_data.
        if status != 206 && self.chunk.start != 0 {
            return self.fail(TransportError::RangeIgnored { status }.into());
        }

        let offset = self.chunk.start;
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.path)
            .and_then(|mut f| f.seek(SeekFrom::Start(offset)).map(|_| f));
        match opened {
            Ok(f) => {
                self.file = Some(f);
                ControlFlow::Continue(())
            }
            Err(source) => self.fail(ChunkError::Seek { offset, source }),
        }
    }

    fn on_data(&mut self, data: &[u8]) -> ControlFlow<()> {
        let n = data.len() as u64;
        if let Some(expected) = self.chunk.len() {
            if self.written + n > expected {
                let status = self.status;
                return self.fail(TransportError::RangeIgnored { status }.into());
            }
        }
        let Some(file) = self.file.as_mut() else {
            return ControlFlow::Break(());
        };
        if let Err(e) = file.write_all(data) {
            return self.fail(ChunkError::Write(e));
        }
        self.written += n;
        self.progress.add_bytes(n);
        ControlFlow::Continue(())
    }
}

fn build_request(url: &str, chunk: &Chunk) -> Result<RangeRequest, ChunkError> {
    let url = url::Url::parse(url).map_err(|e| ChunkError::RequestBuild(format!("{}: {}", url, e)))?;
    Ok(RangeRequest {
        url,
        range: chunk.inclusive_range(),
    })
}

/// Transfers exactly `chunk`'s bytes from `url` into the file at `path`.
///
/// Returns the number of bytes written. Bytes are added to `progress` as they
/// stream, not after the copy completes.
pub fn fetch_chunk(
    transport: &dyn Transport,
    url: &str,
    chunk: Chunk,
    path: &Path,
    progress: &SharedProgress,
    cancel: &CancellationToken,
) -> Result<u64, ChunkError> {
    if cancel.is_cancelled() {
        return Err(ChunkError::Cancelled);
    }
    if chunk.is_empty() {
        return Ok(0);
    }

    let request = build_request(url, &chunk)?;
    tracing::debug!(
        chunk = chunk.index,
        range = request.range_header_value().as_deref().unwrap_or("none"),
        "requesting chunk"
    );
    let mut sink = ChunkSink::new(path, chunk, progress);
    let result = transport.get(&request, &mut sink, cancel);

    if let Some(failure) = sink.failure.take() {
        return Err(failure);
    }
    match result {
        Ok(_) => {}
        Err(TransportError::Cancelled) => return Err(ChunkError::Cancelled),
        Err(e) => return Err(e.into()),
    }

    if let Some(expected) = chunk.len() {
        if sink.written != expected {
            return Err(TransportError::PartialTransfer {
                expected,
                received: sink.written,
            }
            .into());
        }
    }
    if let Some(file) = sink.file.as_mut() {
        file.flush().map_err(ChunkError::Write)?;
    }
    Ok(sink.written)
}
