//! Share workflow: validate input, log in, upload, then offer the link.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fbshare_desktop::{ActionOutcome, COPY_ACTION, Clipboard, Notifier};
use fbshare_filebrowser::{ShareExpiry, UploadEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub file_path: Option<PathBuf>,
    pub permanent: bool,
    pub awoken: bool,
}

/// How a run ended. Exit status does not depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NotImplemented,
    /// The user was shown this error message.
    Failed(String),
    Shared { link: String, copied: bool },
}

pub struct App<'a> {
    config: &'a Config,
    notifier: &'a dyn Notifier,
    clipboard: &'a dyn Clipboard,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, notifier: &'a dyn Notifier, clipboard: &'a dyn Clipboard) -> Self {
        Self {
            config,
            notifier,
            clipboard,
        }
    }

    /// Runs one share request to completion. Every failure is reported to
    /// the user and ends the run.
    pub async fn run(&self, request: &Request, cancel: CancellationToken) -> Outcome {
        if request.awoken {
            self.notify_and_print("Info", "Not yet implemented.").await;
            return Outcome::NotImplemented;
        }

        let Some(path) = request.file_path.as_deref() else {
            return self
                .fail("no file specified. Please specify a file to upload using --filePath")
                .await;
        };

        match tokio::fs::metadata(path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return self
                    .fail(&format!("file does not exist: {}", path.display()))
                    .await;
            }
            Err(e) => return self.fail(&format!("error checking file: {e}")).await,
        }

        println!("Logging in");
        let session = match fbshare_filebrowser::login(
            &self.config.instance_url,
            &self.config.username,
            &self.config.password,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => return self.fail(&format!("failed to login: {e}")).await,
        };

        self.notify_and_print("Uploading", &format!("Uploading {}", path.display()))
            .await;

        let link = match self.upload(session, path, self.expiry(request)).await {
            Ok(link) => link,
            Err(e) => return self.fail(&format!("failed to upload: {e}")).await,
        };

        let message = format!("File uploaded successfully\n{link}");
        println!("Upload complete: {message}");
        let action = self
            .notifier
            .notify_link("Upload complete", &message, &link, true, cancel)
            .await;
        debug!(?action, "link notification finished");

        let copied = match action {
            ActionOutcome::Invoked(key) if key == COPY_ACTION => {
                match self.clipboard.set_contents(&link).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "failed to copy link to clipboard");
                        false
                    }
                }
            }
            _ => false,
        };

        Outcome::Shared { link, copied }
    }

    fn expiry(&self, request: &Request) -> ShareExpiry {
        if request.permanent {
            ShareExpiry::Permanent
        } else {
            ShareExpiry::Days(self.config.expiry_days)
        }
    }

    /// Uploads with progress events logged as they arrive.
    async fn upload(
        &self,
        session: fbshare_filebrowser::Session,
        path: &Path,
        expiry: ShareExpiry,
    ) -> Result<String, fbshare_filebrowser::Error> {
        let (tx, rx) = mpsc::channel(16);
        let mut session = session
            .with_events(tx)
            .with_permanent_expires(self.config.permanent_expires.clone());
        let logger = tokio::spawn(log_events(rx));

        let result = session.upload(path, expiry).await;

        // Dropping the session closes the event channel and ends the logger.
        drop(session);
        let _ = logger.await;
        result
    }

    async fn notify_and_print(&self, title: &str, message: &str) {
        println!("{title}: {message}");
        self.notifier.notify(title, message).await;
    }

    async fn fail(&self, message: &str) -> Outcome {
        self.notify_and_print("Error", message).await;
        Outcome::Failed(message.to_string())
    }
}

async fn log_events(mut rx: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Hashed { hash } => debug!(%hash, "content hashed"),
            UploadEvent::Created {
                remote_path,
                total_bytes,
            } => info!(%remote_path, total_bytes, "upload started"),
            UploadEvent::ChunkSent {
                offset,
                total_bytes,
                bytes_per_second,
                eta,
            } => info!(
                offset,
                total_bytes,
                kib_per_second = (bytes_per_second / 1024.0).round(),
                eta_secs = eta.map(|d| d.as_secs()),
                "chunk confirmed"
            ),
            UploadEvent::Shared { url } => debug!(%url, "share ready"),
        }
    }
}
