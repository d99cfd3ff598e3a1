use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};

use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, SourceError};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Streams the whole of `source` through SHA-256 and returns the lowercase
/// hex digest.
///
/// Hashing always starts from offset 0 and leaves the read position back at
/// offset 0, so the same handle can be handed to a [`ChunkReader`].
pub fn hash_file<R: Read + Seek>(source: &mut R) -> Result<String, SourceError> {
    source.seek(SeekFrom::Start(0))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    source.seek(SeekFrom::Start(0))?;
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a source in fixed-size blocks.
///
/// Every block except the last is exactly `chunk_size` bytes, even when the
/// underlying reader returns short reads.
pub struct ChunkReader<R = File> {
    source: R,
    chunk_size: usize,
    offset: u64,
    size: u64,
}

impl ChunkReader<File> {
    /// Wraps an open file, taking its size from the file metadata.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (10 MiB) is used.
    pub fn from_file(file: File, chunk_size: usize) -> Result<Self, SourceError> {
        let size = file.metadata()?.len();
        Self::new(file, size, chunk_size)
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Wraps `source` of known `size`, positioned at offset 0.
    pub fn new(mut source: R, size: u64, chunk_size: usize) -> Result<Self, SourceError> {
        source.seek(SeekFrom::Start(0))?;
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            source,
            chunk_size,
            offset: 0,
            size,
        })
    }

    /// Reads the next block. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, SourceError> {
        if self.offset >= self.size {
            return Ok(None);
        }

        let want = std::cmp::min(self.size - self.offset, self.chunk_size as u64);
        let mut data = Vec::with_capacity(want as usize);
        (&mut self.source).take(want).read_to_end(&mut data)?;
        if data.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk {
            offset: self.offset,
            data,
        };
        self.offset = chunk.end();
        Ok(Some(chunk))
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}
