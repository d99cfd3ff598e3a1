use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use fbshare_transfer::{
    ChunkReader, DEFAULT_CHUNK_SIZE, SourceError, hash_file, upload_file_name,
};
use reqwest::header::HeaderValue;
use reqwest::{Method, RequestBuilder};
use tokio::sync::mpsc;
use tracing::info;

use crate::error::{AuthError, Error};
use crate::share::DEFAULT_PERMANENT_EXPIRES;
use crate::types::{ShareExpiry, UploadEvent, UploadTarget};

/// Header carrying the session token.
pub(crate) const X_AUTH: &str = "X-Auth";

/// Opaque session token returned by `/api/login`.
///
/// Only the HTTP layer sees its value; `Debug` output is redacted and the
/// header is marked sensitive.
#[derive(Clone)]
pub struct AuthToken(HeaderValue);

impl AuthToken {
    pub(crate) fn new(raw: String) -> Result<Self, AuthError> {
        if raw.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        let mut value = HeaderValue::from_str(&raw).map_err(|_| AuthError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(Self(value))
    }

    pub(crate) fn header_value(&self) -> HeaderValue {
        self.0.clone()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// An authenticated connection to one File Browser instance.
///
/// A session is single-shot: [`upload`](Self::upload) takes `&mut self`, so
/// only one upload can be in flight per session.
pub struct Session {
    http: reqwest::Client,
    instance_url: String,
    token: AuthToken,
    chunk_size: usize,
    permanent_expires: String,
    events: Option<mpsc::Sender<UploadEvent>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("instance_url", &self.instance_url)
            .field("token", &self.token)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(http: reqwest::Client, instance_url: String, token: AuthToken) -> Self {
        Self {
            http,
            instance_url,
            token,
            chunk_size: DEFAULT_CHUNK_SIZE,
            permanent_expires: DEFAULT_PERMANENT_EXPIRES.to_string(),
            events: None,
        }
    }

    /// Sends [`UploadEvent`]s to `tx` during uploads. A closed receiver is
    /// ignored.
    pub fn with_events(mut self, tx: mpsc::Sender<UploadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Sets the `expires` value sent for [`ShareExpiry::Permanent`].
    ///
    /// An empty string omits the field from the share request.
    pub fn with_permanent_expires(mut self, value: impl Into<String>) -> Self {
        self.permanent_expires = value.into();
        self
    }

    /// Overrides the upload block size. 0 selects [`DEFAULT_CHUNK_SIZE`].
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    /// Base URL of the instance, without a trailing slash.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub(crate) fn permanent_expires(&self) -> &str {
        &self.permanent_expires
    }

    /// Starts a request carrying the session token.
    pub(crate) fn authed(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(X_AUTH, self.token.header_value())
    }

    pub(crate) async fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Hashes, uploads and shares the file at `path`, returning its public
    /// download URL.
    ///
    /// Stages run strictly in order; the first failure is returned and the
    /// remaining stages are skipped. A failed chunk leaves a partial object
    /// on the server.
    pub async fn upload(&mut self, path: &Path, expiry: ShareExpiry) -> Result<String, Error> {
        let file_name = upload_file_name(path)?.to_owned();

        // Opening, hashing and sizing the file all block.
        let (hash, reader) = tokio::task::spawn_blocking({
            let path = path.to_path_buf();
            let chunk_size = self.chunk_size;
            move || -> Result<_, SourceError> {
                let mut file = File::open(&path)?;
                let hash = hash_file(&mut file)?;
                let reader = ChunkReader::from_file(file, chunk_size)?;
                Ok((hash, reader))
            }
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(format!("hashing task failed: {e}"))))??;
        let target = UploadTarget::new(path, hash, file_name);
        info!(
            path = %path.display(),
            hash = %target.content_hash,
            "hashed file"
        );
        self.emit(UploadEvent::Hashed {
            hash: target.content_hash.clone(),
        })
        .await;

        self.transfer(reader, &target).await?;

        let url = self.share(&target, expiry).await?;
        self.emit(UploadEvent::Shared { url: url.clone() }).await;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use fbshare_transfer::checksum_bytes;
    use tempfile::TempDir;

    use crate::error::{ShareError, TransferError};
    use crate::mock::{MockResponse, MockServer, RecordedRequest, test_session};
    use crate::types::TransferStage;

    const MIB: usize = 1024 * 1024;

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    /// Simulates the File Browser TUS and share endpoints, confirming every
    /// PATCH body in full.
    fn filebrowser() -> impl Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static {
        let received = Arc::new(Mutex::new(0u64));
        move |req| match req.method.as_str() {
            "POST" if req.path.starts_with("/api/tus/") => {
                *received.lock().unwrap() = 0;
                MockResponse::new(201)
            }
            "HEAD" => MockResponse::new(200),
            "PATCH" => {
                let mut received = received.lock().unwrap();
                *received += req.body.len() as u64;
                MockResponse::new(204).header("Upload-Offset", &received.to_string())
            }
            "POST" if req.path.starts_with("/api/share/") => {
                let name = req.path.rsplit('/').next().unwrap_or_default().to_string();
                MockResponse::new(200).body(format!(
                    r#"{{"hash":"shr42","path":"/{name}","expire":0}}"#
                ))
            }
            _ => MockResponse::new(404),
        }
    }

    fn patches(requests: &[RecordedRequest]) -> Vec<&RecordedRequest> {
        requests.iter().filter(|r| r.method == "PATCH").collect()
    }

    #[tokio::test]
    async fn upload_runs_create_probe_patch_share() {
        let dir = TempDir::new().unwrap();
        let data = b"hello filebrowser";
        let path = write_file(&dir, "notes.txt", data);
        let hash = checksum_bytes(data);

        let server = MockServer::start(filebrowser()).await;
        let mut session = test_session(&server.url);
        let url = session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap();
        assert_eq!(url, format!("{}/api/public/dl/shr42/notes.txt", server.url));

        let requests = server.requests();
        let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["POST", "HEAD", "PATCH", "POST"]);

        let create = &requests[0];
        assert_eq!(create.path, format!("/api/tus/{hash}/notes.txt?override=false"));
        assert_eq!(create.header("upload-length"), Some("17"));
        assert_eq!(create.header("x-auth"), Some("test-token"));
        assert!(create.body.is_empty());

        let probe = &requests[1];
        assert_eq!(probe.path, format!("/api/tus/{hash}/notes.txt"));
        assert_eq!(probe.header("x-auth"), Some("test-token"));

        let patch = &requests[2];
        assert_eq!(patch.path, format!("/api/tus/{hash}/notes.txt"));
        assert_eq!(patch.header("upload-offset"), Some("0"));
        assert_eq!(patch.header("tus-resumable"), Some("1.0.0"));
        assert_eq!(
            patch.header("content-type"),
            Some("application/offset+octet-stream")
        );
        assert_eq!(patch.body, data);

        let share = &requests[3];
        assert_eq!(share.path, format!("/api/share/{hash}/notes.txt"));
    }

    #[tokio::test]
    async fn upload_25_mib_sends_three_chunks_in_order() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..25 * MIB).map(|i| (i % 251) as u8).collect();
        let path = write_file(&dir, "big.bin", &data);

        let server = MockServer::start(filebrowser()).await;
        let (tx, mut rx) = mpsc::channel(32);
        let mut session = test_session(&server.url).with_events(tx);
        session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap();
        drop(session);

        let requests = server.requests();
        let patches = patches(&requests);
        let sizes: Vec<usize> = patches.iter().map(|r| r.body.len()).collect();
        assert_eq!(sizes, vec![10 * MIB, 10 * MIB, 5 * MIB]);

        let offsets: Vec<&str> = patches
            .iter()
            .map(|r| r.header("upload-offset").unwrap())
            .collect();
        assert_eq!(offsets, vec!["0", "10485760", "20971520"]);

        let sent: Vec<u8> = patches.iter().flat_map(|r| r.body.clone()).collect();
        assert_eq!(sent.len(), data.len());
        assert!(sent == data);

        let mut chunk_offsets = Vec::new();
        while let Some(event) = rx.recv().await {
            if let UploadEvent::ChunkSent {
                offset,
                total_bytes,
                ..
            } = event
            {
                assert_eq!(total_bytes, 26_214_400);
                chunk_offsets.push(offset);
            }
        }
        assert_eq!(chunk_offsets, vec![10_485_760, 20_971_520, 26_214_400]);
    }

    #[tokio::test]
    async fn upload_empty_file_skips_patch_but_shares() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");

        let server = MockServer::start(filebrowser()).await;
        let mut session = test_session(&server.url);
        session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap();

        let requests = server.requests();
        let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["POST", "HEAD", "POST"]);
        assert_eq!(requests[0].header("upload-length"), Some("0"));
        assert!(requests[2].path.starts_with("/api/share/"));
    }

    #[tokio::test]
    async fn create_conflict_stops_before_probe() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "dup.txt", b"already there");

        let server = MockServer::start(|_| MockResponse::new(409).body("file exists")).await;
        let mut session = test_session(&server.url);
        let err = session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap_err();

        match err {
            Error::Transfer(TransferError::UnexpectedStatus {
                stage,
                status,
                body,
            }) => {
                assert_eq!(stage, TransferStage::Create);
                assert_eq!(status, 409);
                assert_eq!(body, "file exists");
            }
            other => panic!("expected create failure, got {other:?}"),
        }
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn probe_failure_is_transfer_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"abc");

        let server = MockServer::start(|req| match req.method.as_str() {
            "POST" => MockResponse::new(201),
            _ => MockResponse::new(404),
        })
        .await;
        let mut session = test_session(&server.url);
        let err = session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transfer(TransferError::UnexpectedStatus {
                stage: TransferStage::Probe,
                status: 404,
                ..
            })
        ));
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn failed_patch_aborts_without_share() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.bin", &[7u8; 10]);

        let inner = filebrowser();
        let patch_count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&patch_count);
        let server = MockServer::start(move |req| {
            if req.method == "PATCH" {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 2 {
                    return MockResponse::new(500).body("disk full");
                }
            }
            inner(req)
        })
        .await;

        let mut session = test_session(&server.url).with_chunk_size(4);
        let err = session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transfer(TransferError::UnexpectedStatus {
                stage: TransferStage::Patch,
                status: 500,
                ..
            })
        ));
        let requests = server.requests();
        assert_eq!(patches(&requests).len(), 2);
        assert!(!requests.iter().any(|r| r.path.starts_with("/api/share/")));
    }

    #[tokio::test]
    async fn share_rejection_is_share_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.txt", b"abc");

        let inner = filebrowser();
        let server = MockServer::start(move |req| {
            if req.path.starts_with("/api/share/") {
                return MockResponse::new(401).body("401 Unauthorized");
            }
            inner(req)
        })
        .await;

        let mut session = test_session(&server.url);
        let err = session
            .upload(&path, ShareExpiry::Days(30))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Share(ShareError::Api { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_io_error_without_network() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start(filebrowser()).await;
        let mut session = test_session(&server.url);

        let err = session
            .upload(&dir.path().join("nope.txt"), ShareExpiry::Days(30))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn identical_content_targets_same_hash_path() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "same.txt", b"identical");
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let b = sub.join("same.txt");
        std::fs::write(&b, b"identical").unwrap();

        let server = MockServer::start(filebrowser()).await;
        let mut session = test_session(&server.url);
        session.upload(&a, ShareExpiry::Days(1)).await.unwrap();
        session.upload(&b, ShareExpiry::Days(1)).await.unwrap();

        let creates: Vec<String> = server
            .requests()
            .into_iter()
            .filter(|r| r.path.contains("override=false"))
            .map(|r| r.path)
            .collect();
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[0], creates[1]);
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let session = test_session("https://files.example.com");
        let debug = format!("{session:?}");
        assert!(!debug.contains("test-token"), "{debug}");
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn token_rejects_header_unsafe_values() {
        assert!(matches!(
            AuthToken::new("bad\ntoken".into()),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            AuthToken::new(String::new()),
            Err(AuthError::EmptyToken)
        ));
    }

    #[test]
    fn chunk_size_zero_selects_default() {
        let session = test_session("http://h").with_chunk_size(0);
        assert_eq!(session.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
