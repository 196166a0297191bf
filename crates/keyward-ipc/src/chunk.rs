//! Splitting oversized memory regions across round trips.

use crate::error::SerializeError;

/// Describes how a single memory region is sent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChunkPlan {
    chunk_size: usize,
    len: usize,
}

impl ChunkPlan {
    /// Plans the transmission of a `len` byte region carried by
    /// a message of `minimum` bytes over a transport that
    /// accepts requests of at most `capacity` bytes.
    ///
    /// `minimum` must be measured with the whole region in
    /// place. Everything else in the message, other regions
    /// included, is repeated with every chunk and counts as
    /// overhead.
    pub fn new(len: usize, minimum: usize, capacity: usize) -> Result<Self, SerializeError> {
        if minimum <= capacity {
            return Ok(Self {
                chunk_size: len.max(1),
                len,
            });
        }
        let overhead = minimum.saturating_sub(len);
        match capacity.checked_sub(overhead) {
            Some(chunk_size) if chunk_size > 0 => Ok(Self { chunk_size, len }),
            _ => Err(SerializeError::NoRoomForChunk { capacity, overhead }),
        }
    }

    /// Returns the largest chunk size.
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Reports whether more than one round trip is needed.
    pub const fn is_chunked(&self) -> bool {
        self.len > self.chunk_size
    }

    /// Returns the number of round trips.
    ///
    /// An empty region still takes one round trip.
    pub const fn count(&self) -> usize {
        if self.len == 0 {
            1
        } else {
            self.len.div_ceil(self.chunk_size)
        }
    }

    /// Splits `data` into consecutive chunks.
    ///
    /// Yields a single empty chunk for empty data.
    pub fn split(self, data: &[u8]) -> impl Iterator<Item = &[u8]> {
        let empty = data.is_empty().then_some(&data[..0]);
        empty.into_iter().chain(data.chunks(self.chunk_size))
    }
}
