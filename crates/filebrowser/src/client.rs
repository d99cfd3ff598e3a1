//! Login handshake.
//!
//! Async HTTP client using `reqwest`. The token returned by `/api/login` is
//! carried by every later request in the `X-Auth` header.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::session::{AuthToken, Session};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    recaptcha: &'a str,
    password: &'a str,
}

/// Unauthenticated client for a File Browser instance.
pub struct Client {
    http: reqwest::Client,
    instance_url: String,
}

impl Client {
    /// Creates a client for `instance_url`. A trailing `/` is ignored.
    pub fn new(instance_url: &str) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("filebrowser-share/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            instance_url: instance_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Exchanges credentials for a [`Session`].
    ///
    /// The raw response body is the token. Any non-2xx status is a
    /// rejection, so a wrong password never turns into a pseudo-token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/api/login", self.instance_url);
        info!(url = %url, username = %username, "logging in");

        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest {
                username,
                recaptcha: "",
                password,
            })
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "login rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token = AuthToken::new(body)?;
        debug!("login succeeded");
        Ok(Session::new(
            self.http.clone(),
            self.instance_url.clone(),
            token,
        ))
    }
}

/// Convenience wrapper: builds a [`Client`] and logs in.
pub async fn login(
    instance_url: &str,
    username: &str,
    password: &str,
) -> Result<Session, AuthError> {
    Client::new(instance_url)?.login(username, password).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockServer};

    #[tokio::test]
    async fn login_returns_session_with_raw_body_token() {
        let server = MockServer::start(|_| MockResponse::new(200).body("tok-123")).await;

        let session = login(&server.url, "alice", "secret").await.unwrap();
        assert_eq!(session.instance_url(), server.url);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/login");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("x-auth").is_none());

        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["username"], "alice");
        assert_eq!(body["password"], "secret");
        assert_eq!(body["recaptcha"], "");
    }

    #[tokio::test]
    async fn login_forbidden_is_auth_error() {
        let server = MockServer::start(|_| MockResponse::new(403).body("unauthorized")).await;

        let err = login(&server.url, "alice", "wrong").await.unwrap_err();
        match err {
            AuthError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_empty_body_is_auth_error() {
        let server = MockServer::start(|_| MockResponse::new(200)).await;

        let err = login(&server.url, "alice", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::EmptyToken));
    }

    #[tokio::test]
    async fn login_unreachable_is_http_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = login(&format!("http://127.0.0.1:{port}"), "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Http(_)));
    }

    #[test]
    fn client_strips_trailing_slash() {
        let client = Client::new("https://files.example.com/").unwrap();
        assert_eq!(client.instance_url(), "https://files.example.com");
    }
}
