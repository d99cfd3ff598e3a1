//! TUS-style resumable upload: create, probe, then sequential `PATCH` chunks.
//!
//! The client never computes the next `Upload-Offset` itself. It sends back
//! whatever the server reported for the previous chunk, after checking that
//! the server took exactly the bytes that were sent. Any other offset is a
//! protocol error; the upload is never resynchronised.

use std::io::{self, Read, Seek};

use fbshare_transfer::{ChunkReader, SpeedCalculator, TransferProgress};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, info};

use crate::error::TransferError;
use crate::session::Session;
use crate::types::{TransferStage, UploadEvent, UploadTarget};

const TUS_RESUMABLE: &str = "1.0.0";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";
const UPLOAD_LENGTH: &str = "Upload-Length";
const UPLOAD_OFFSET: &str = "Upload-Offset";

impl Session {
    /// Uploads everything `reader` yields to the content-addressed path of
    /// `target`.
    ///
    /// Any unexpected status or offset aborts at once. Nothing is retried and
    /// a partially written object is left on the server. Chunks are read on
    /// the blocking pool.
    pub async fn transfer<R>(
        &self,
        mut reader: ChunkReader<R>,
        target: &UploadTarget,
    ) -> Result<TransferProgress, TransferError>
    where
        R: Read + Seek + Send + 'static,
    {
        let url = format!(
            "{}/api/tus/{}",
            self.instance_url(),
            target.remote_url_path()
        );
        let total = reader.size();
        let mut progress = TransferProgress::new(total);

        let resp = self
            .authed(Method::POST, &format!("{url}?override=false"))
            .header(UPLOAD_LENGTH, total)
            .send()
            .await?;
        expect_status(resp, StatusCode::CREATED, TransferStage::Create).await?;
        info!(
            remote_path = %target.remote_path(),
            total_bytes = total,
            "upload created"
        );
        self.emit(UploadEvent::Created {
            remote_path: target.remote_path(),
            total_bytes: total,
        })
        .await;

        let resp = self.authed(Method::HEAD, &url).send().await?;
        expect_status(resp, StatusCode::OK, TransferStage::Probe).await?;

        let mut offset = String::from("0");
        let mut speed = SpeedCalculator::default();
        speed.add_sample(0);

        loop {
            let (returned, next) = tokio::task::spawn_blocking(move || {
                let next = reader.next_chunk();
                (reader, next)
            })
            .await
            .map_err(|e| TransferError::Io(io::Error::other(format!("chunk read task failed: {e}"))))?;
            reader = returned;
            let Some(chunk) = next? else {
                break;
            };

            let sent_end = chunk.end();
            let len = chunk.len();
            debug!(
                offset = %offset,
                bytes = len,
                remaining = total - chunk.offset,
                "sending chunk"
            );

            let resp = self
                .authed(Method::PATCH, &url)
                .header(CONTENT_TYPE, OFFSET_CONTENT_TYPE)
                .header("Tus-Resumable", TUS_RESUMABLE)
                .header(UPLOAD_OFFSET, offset.as_str())
                .body(chunk.data)
                .send()
                .await?;
            let resp = expect_status(resp, StatusCode::NO_CONTENT, TransferStage::Patch).await?;

            let reported = reported_offset(&resp)?;
            progress.confirmed_bytes = validate_offset(&reported, sent_end)?;
            offset = reported;
            speed.add_sample(len as u64);
            self.emit(UploadEvent::ChunkSent {
                offset: progress.confirmed_bytes,
                total_bytes: total,
                bytes_per_second: speed.bytes_per_second(),
                eta: speed.eta(progress.remaining()),
            })
            .await;
        }

        if !progress.is_complete() {
            return Err(TransferError::Protocol(format!(
                "server confirmed {} of {} bytes",
                progress.confirmed_bytes, total
            )));
        }

        info!(
            remote_path = %target.remote_path(),
            total_bytes = total,
            "upload transferred"
        );
        Ok(progress)
    }
}

/// Passes `resp` through if its status is `expected`; otherwise reads the
/// body into an [`TransferError::UnexpectedStatus`].
async fn expect_status(
    resp: Response,
    expected: StatusCode,
    stage: TransferStage,
) -> Result<Response, TransferError> {
    let status = resp.status();
    if status == expected {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(TransferError::UnexpectedStatus {
        stage,
        status: status.as_u16(),
        body,
    })
}

fn reported_offset(resp: &Response) -> Result<String, TransferError> {
    let value = resp.headers().get(UPLOAD_OFFSET).ok_or_else(|| {
        TransferError::Protocol("chunk response has no Upload-Offset header".into())
    })?;
    let value = value.to_str().map_err(|_| {
        TransferError::Protocol("Upload-Offset header is not valid ASCII".into())
    })?;
    Ok(value.trim().to_string())
}

/// Parses a server-reported offset, which must equal `sent_end`, the end of
/// the chunk just sent.
fn validate_offset(reported: &str, sent_end: u64) -> Result<u64, TransferError> {
    let confirmed: u64 = reported
        .parse()
        .map_err(|_| TransferError::Protocol(format!("unparseable Upload-Offset {reported:?}")))?;

    if confirmed != sent_end {
        return Err(TransferError::Protocol(format!(
            "Upload-Offset {confirmed} does not match the {sent_end} bytes sent"
        )));
    }
    Ok(confirmed)
}
