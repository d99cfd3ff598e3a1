//! Error types for the File Browser client.

use crate::types::TransferStage;

/// Errors from the login handshake.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("login rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("login returned an empty token")]
    EmptyToken,

    #[error("login returned a token that cannot be sent as a header")]
    InvalidToken,
}

/// Errors from the TUS create/probe/patch sequence.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error reading source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{stage}: status {status} (body: {body:?})")]
    UnexpectedStatus {
        stage: TransferStage,
        status: u16,
        body: String,
    },

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors from the share request.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("share API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("share response is missing string field `{0}`")]
    MissingField(&'static str),
}

/// Terminal error of a [`Session::upload`](crate::Session::upload).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("upload failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("share failed: {0}")]
    Share(#[from] ShareError),
}

impl From<fbshare_transfer::SourceError> for Error {
    fn from(err: fbshare_transfer::SourceError) -> Self {
        use fbshare_transfer::SourceError;
        match err {
            SourceError::Io(e) => Error::Io(e),
            SourceError::InvalidPath(p) => Error::InvalidPath(p),
        }
    }
}

impl From<fbshare_transfer::SourceError> for TransferError {
    fn from(err: fbshare_transfer::SourceError) -> Self {
        use fbshare_transfer::SourceError;
        match err {
            SourceError::Io(e) => TransferError::Io(e),
            other => TransferError::Protocol(other.to_string()),
        }
    }
}
