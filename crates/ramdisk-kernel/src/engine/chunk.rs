//! Chunked byte storage for file contents.
//!
//! A file's bytes live in a singly-linked chain of fixed-size chunks. Chunk
//! `i` holds bytes `[i * BLOCK_SIZE, (i + 1) * BLOCK_SIZE)`. The chain only
//! knows about chunks; the logical file size is kept by the owning node and
//! passed in where it matters.

use std::fmt;

use super::capacity::{CapacityAccountant, CapacityExceeded};

/// Size of one chunk buffer, in bytes.
pub const BLOCK_SIZE: usize = 512;

const BLOCK: u64 = BLOCK_SIZE as u64;

/// Accounting units charged per chunk: the buffer plus its link.
pub const CHUNK_COST: u64 = std::mem::size_of::<Chunk>() as u64;

/// One fixed-size buffer and the link to the next chunk.
pub struct Chunk {
    data: [u8; BLOCK_SIZE],
    next: Option<Box<Chunk>>,
}

impl Chunk {
    fn zeroed() -> Box<Chunk> {
        Box::new(Chunk {
            data: [0; BLOCK_SIZE],
            next: None,
        })
    }
}

/// Number of chunks needed to hold `len` bytes.
pub fn chunks_for(len: u64) -> u64 {
    len.div_ceil(BLOCK)
}

/// The chunk chain owned by one file.
///
/// Dropping a chain frees its chunks without touching any accountant; the
/// engine truncates a file to zero before dropping it so the units are
/// credited back.
#[derive(Default)]
pub struct ChunkChain {
    head: Option<Box<Chunk>>,
    /// Chunks linked from `head`.
    len: u64,
}

impl fmt::Debug for ChunkChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkChain")
            .field("chunks", &self.chunk_count())
            .finish()
    }
}

impl ChunkChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no chunk has been allocated.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of chunks in the chain.
    pub fn chunk_count(&self) -> u64 {
        self.len
    }

    fn iter(&self) -> impl Iterator<Item = &Chunk> {
        std::iter::successors(self.head.as_deref(), |chunk| chunk.next.as_deref())
    }

    /// Copy up to `len` bytes starting at `offset`, never past `size`.
    ///
    /// Offsets at or beyond `size` yield an empty buffer.
    pub fn read(&self, offset: u64, len: usize, size: u64) -> Vec<u8> {
        if offset >= size {
            return Vec::new();
        }
        let len = (size - offset).min(len as u64) as usize;
        let mut out = Vec::with_capacity(len);
        let mut pos = offset;

        for chunk in self.iter().skip((offset / BLOCK) as usize) {
            if out.len() == len {
                break;
            }
            let start = (pos % BLOCK) as usize;
            let take = (BLOCK_SIZE - start).min(len - out.len());
            out.extend_from_slice(&chunk.data[start..start + take]);
            pos += take as u64;
        }
        out
    }

    /// Store `data` at `offset`, growing the chain to cover the range.
    ///
    /// Units for every chunk the write links are reserved in one step before
    /// the first one is allocated, so a refused write changes nothing.
    pub fn write(
        &mut self,
        offset: u64,
        data: &[u8],
        capacity: &mut CapacityAccountant,
    ) -> Result<(), CapacityExceeded> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset.saturating_add(data.len() as u64);
        let need = chunks_for(end);
        if need > self.len {
            let units = (need - self.len).saturating_mul(CHUNK_COST);
            capacity.reserve(units)?;
            tracing::debug!(chunks = need - self.len, units, "allocating chunks");
            self.len = need;
        }

        let first = offset / BLOCK;
        let mut slot = &mut self.head;
        let mut index = 0u64;
        let mut written = 0usize;
        while written < data.len() {
            let chunk = slot.get_or_insert_with(Chunk::zeroed);
            if index >= first {
                let start = if index == first {
                    (offset % BLOCK) as usize
                } else {
                    0
                };
                let take = (BLOCK_SIZE - start).min(data.len() - written);
                chunk.data[start..start + take].copy_from_slice(&data[written..written + take]);
                written += take;
            }
            slot = &mut chunk.next;
            index += 1;
        }
        Ok(())
    }

    /// Cut the chain down to the chunks covering `new_len` bytes.
    ///
    /// The tail of the last kept chunk is zero-filled from `new_len` on.
    /// Every dropped chunk is released to `capacity`; the number of chunks
    /// freed is returned.
    pub fn truncate(&mut self, new_len: u64, capacity: &mut CapacityAccountant) -> u64 {
        let keep = chunks_for(new_len);
        let tail = (new_len % BLOCK) as usize;

        let mut slot = &mut self.head;
        let mut index = 0u64;
        while index < keep {
            match slot {
                Some(chunk) => {
                    if index + 1 == keep && tail > 0 {
                        chunk.data[tail..].fill(0);
                    }
                    slot = &mut chunk.next;
                }
                None => break,
            }
            index += 1;
        }

        let freed = free_chain(slot.take());
        self.len -= freed;
        if freed > 0 {
            capacity.release(freed * CHUNK_COST);
            tracing::debug!(chunks = freed, units = freed * CHUNK_COST, "released chunks");
        }
        freed
    }
}

impl Drop for ChunkChain {
    fn drop(&mut self) {
        free_chain(self.head.take());
    }
}

/// Unlink chunks one at a time so long chains cannot recurse on drop.
fn free_chain(mut next: Option<Box<Chunk>>) -> u64 {
    let mut freed = 0;
    while let Some(mut chunk) = next {
        next = chunk.next.take();
        freed += 1;
    }
    freed
}
