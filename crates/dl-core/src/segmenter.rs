//! Chunk planning: split a known size into contiguous byte ranges.

/// One worker's share of the resource: bytes `[start, end)`, or from `start`
/// to end-of-body when `end` is `None` (size unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Ordinal, 0-based, in dispatch order.
    pub index: usize,
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive); `None` for an open-ended request.
    pub end: Option<u64>,
}

impl Chunk {
    /// The single chunk used when the total size is unknown.
    pub fn open_ended() -> Self {
        Chunk {
            index: 0,
            start: 0,
            end: None,
        }
    }

    /// One chunk covering `[0, size)`.
    pub fn whole(size: u64) -> Self {
        Chunk {
            index: 0,
            start: 0,
            end: Some(size),
        }
    }

    /// Length in bytes, `None` when open-ended.
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    /// True for a bounded chunk with no bytes (possible when size < N).
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Inclusive `(first, last)` positions for the `Range` header.
    ///
    /// `None` for open-ended and empty chunks.
    pub fn inclusive_range(&self) -> Option<(u64, u64)> {
        match self.end {
            Some(end) if end > self.start => Some((self.start, end - 1)),
            _ => None,
        }
    }
}

/// Divides `[0, total_size)` into `concurrency` contiguous chunks.
///
/// Every chunk is `floor(total_size / concurrency)` bytes long except the
/// last, which also absorbs `total_size % concurrency`. Returns an empty vec
/// when `concurrency` is 0.
pub fn plan_chunks(total_size: u64, concurrency: usize) -> Vec<Chunk> {
    if concurrency == 0 {
        return Vec::new();
    }

    let n = concurrency as u64;
    let chunk_len = total_size / n;

    (0..concurrency)
        .map(|i| {
            let start = chunk_len * i as u64;
            let end = if i + 1 == concurrency {
                total_size
            } else {
                start + chunk_len
            };
            Chunk {
                index: i,
                start,
                end: Some(end),
            }
        })
        .collect()
}
