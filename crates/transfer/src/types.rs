/// A block of file data read for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset of the first byte of `data` within the file.
    pub offset: u64,
    /// Raw block bytes.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Number of bytes in this chunk.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for a zero-length chunk.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset one past the last byte of this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}
