use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::encoding::encode_segment;

/// Step of the TUS sequence a [`TransferError`](crate::TransferError) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// `POST /api/tus/...?override=false`, expects 201.
    Create,
    /// `HEAD /api/tus/...`, expects 200.
    Probe,
    /// `PATCH /api/tus/...`, expects 204.
    Patch,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferStage::Create => "create",
            TransferStage::Probe => "probe",
            TransferStage::Patch => "chunk upload",
        })
    }
}

/// Lifetime requested for a public share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareExpiry {
    /// Share expires after the given number of days.
    Days(u32),
    /// Share never expires.
    Permanent,
}

impl Default for ShareExpiry {
    fn default() -> Self {
        ShareExpiry::Days(30)
    }
}

/// A local file bound to its content-addressed remote location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub local_path: PathBuf,
    /// Lowercase hex SHA-256 of the full file contents.
    pub content_hash: String,
    /// Final component of `local_path`.
    pub file_name: String,
}

impl UploadTarget {
    pub fn new(
        local_path: impl Into<PathBuf>,
        content_hash: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            content_hash: content_hash.into(),
            file_name: file_name.into(),
        }
    }

    /// `<hash>/<file name>`, unencoded.
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.content_hash, self.file_name)
    }

    /// `<hash>/<file name>` with the file name percent-encoded for use in a
    /// request URL.
    pub fn remote_url_path(&self) -> String {
        format!("{}/{}", self.content_hash, encode_segment(&self.file_name))
    }
}

/// Progress events emitted by a [`Session`](crate::Session) during an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The content hash is known.
    Hashed { hash: String },
    /// The server accepted the upload declaration.
    Created {
        remote_path: String,
        total_bytes: u64,
    },
    /// A chunk was confirmed; `offset` is the server's new offset.
    ChunkSent {
        offset: u64,
        total_bytes: u64,
        bytes_per_second: f64,
        /// Estimated time for the rest, once a speed is known.
        eta: Option<Duration>,
    },
    /// The public share link is ready.
    Shared { url: String },
}
