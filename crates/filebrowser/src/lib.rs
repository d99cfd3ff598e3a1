//! Client for the upload and share endpoints of a File Browser instance.
//!
//! # Pipeline
//!
//! 1. **Login**: exchange credentials for a session token ([`Client::login`])
//! 2. **Hash**: SHA-256 the local file to build a content-addressed path
//! 3. **Transfer**: TUS-style create, probe and chunked `PATCH` upload
//! 4. **Share**: request a public share record and derive its download URL
//!
//! [`Session::upload`] runs steps 2–4 strictly in order and stops at the
//! first failure.

mod client;
mod encoding;
mod error;
mod session;
mod share;
mod tus;
mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{Client, login};
pub use encoding::{encode_path, encode_segment};
pub use error::{AuthError, Error, ShareError, TransferError};
pub use session::{AuthToken, Session};
pub use share::{DEFAULT_PERMANENT_EXPIRES, public_url};
pub use types::{ShareExpiry, TransferStage, UploadEvent, UploadTarget};
