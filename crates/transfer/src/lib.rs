//! Local side of a file upload: content hashing, fixed-size chunk reading
//! and progress accounting.
//!
//! Nothing in this crate touches the network. The remote protocol lives in
//! `fbshare-filebrowser`, which drives a [`ChunkReader`] over the same file
//! handle that [`hash_file`] rewound.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkReader, checksum_bytes, hash_file};
pub use progress::{SpeedCalculator, TransferProgress};
pub use types::Chunk;
pub use validation::upload_file_name;

/// Fixed upload block size: 10 MiB.
///
/// The server is never asked for a preferred size.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Errors produced while preparing or reading the source file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
