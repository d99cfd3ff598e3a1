//! Public share records.

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::info;

use crate::encoding::encode_path;
use crate::error::ShareError;
use crate::session::Session;
use crate::types::{ShareExpiry, UploadTarget};

/// `expires` value sent for [`ShareExpiry::Permanent`] unless overridden with
/// [`Session::with_permanent_expires`].
pub const DEFAULT_PERMANENT_EXPIRES: &str = "0";

#[derive(Serialize)]
struct ShareRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<String>,
    password: &'a str,
    unit: &'a str,
}

impl Session {
    /// Requests a public share for an uploaded object and returns its
    /// download URL.
    pub async fn share(
        &self,
        target: &UploadTarget,
        expiry: ShareExpiry,
    ) -> Result<String, ShareError> {
        let url = format!(
            "{}/api/share/{}",
            self.instance_url(),
            target.remote_url_path()
        );

        let expires = match expiry {
            ShareExpiry::Days(days) => Some(days.to_string()),
            ShareExpiry::Permanent if self.permanent_expires().is_empty() => None,
            ShareExpiry::Permanent => Some(self.permanent_expires().to_string()),
        };
        let body = serde_json::to_vec(&ShareRequest {
            expires,
            password: "",
            unit: "days",
        })?;

        let resp = self
            .authed(Method::POST, &url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            return Err(ShareError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let record: serde_json::Value = serde_json::from_slice(&bytes)?;
        let hash = string_field(&record, "hash")?;
        let path = string_field(&record, "path")?;

        let link = public_url(self.instance_url(), hash, path);
        info!(link = %link, ?expiry, "share created");
        Ok(link)
    }
}

fn string_field<'a>(record: &'a serde_json::Value, key: &'static str) -> Result<&'a str, ShareError> {
    record
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or(ShareError::MissingField(key))
}

/// Builds `<instance>/api/public/dl/<hash><path>`, percent-encoding each
/// segment of `path`.
pub fn public_url(instance_url: &str, hash: &str, path: &str) -> String {
    format!(
        "{}/api/public/dl/{}{}",
        instance_url.trim_end_matches('/'),
        hash,
        encode_path(path)
    )
}
