//! System clipboard through desktop command-line tools.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::BoxFuture;

/// Errors from setting the clipboard.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("{program}: {message}")]
    Command { program: String, message: String },

    #[error("no clipboard backend succeeded: {0}")]
    Unavailable(String),
}

/// Sets the system clipboard contents.
pub trait Clipboard: Send + Sync {
    fn set_contents<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), ClipboardError>>;
}

/// How the text reaches a backend program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    /// Appended as the last argument.
    Argument,
    /// Written to stdin.
    Stdin,
}

/// One command-line clipboard tool.
#[derive(Debug, Clone)]
pub struct ClipboardBackend {
    program: String,
    args: Vec<String>,
    input: Input,
}

impl ClipboardBackend {
    /// Backend that receives the text as its last argument.
    pub fn with_argument(program: &str, args: &[&str]) -> Self {
        Self::new(program, args, Input::Argument)
    }

    /// Backend that reads the text from stdin.
    pub fn with_stdin(program: &str, args: &[&str]) -> Self {
        Self::new(program, args, Input::Stdin)
    }

    fn new(program: &str, args: &[&str], input: Input) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            input,
        }
    }

    async fn run(&self, text: &str) -> Result<(), ClipboardError> {
        let fail = |message: String| ClipboardError::Command {
            program: self.program.clone(),
            message,
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        match self.input {
            Input::Argument => {
                cmd.arg(text).stdin(Stdio::null());
            }
            Input::Stdin => {
                cmd.stdin(Stdio::piped());
            }
        }

        let mut child = cmd.spawn().map_err(|e| fail(e.to_string()))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| fail(e.to_string()))?;
            // Closing stdin lets the tool see EOF.
            drop(stdin);
        }

        let status = child.wait().await.map_err(|e| fail(e.to_string()))?;
        if !status.success() {
            return Err(fail(format!("exited with {status}")));
        }
        Ok(())
    }
}

/// Tries each backend in order until one succeeds.
///
/// Default order: KDE Klipper over D-Bus, `wl-copy`, `xclip`.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    backends: Vec<ClipboardBackend>,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new(vec![
            ClipboardBackend::with_argument(
                "qdbus",
                &["org.kde.klipper", "/klipper", "setClipboardContents"],
            ),
            ClipboardBackend::with_argument("wl-copy", &["--"]),
            ClipboardBackend::with_stdin("xclip", &["-selection", "clipboard"]),
        ])
    }
}

impl SystemClipboard {
    pub fn new(backends: Vec<ClipboardBackend>) -> Self {
        Self { backends }
    }
}

impl Clipboard for SystemClipboard {
    fn set_contents<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), ClipboardError>> {
        Box::pin(async move {
            let mut failures = Vec::new();
            for backend in &self.backends {
                match backend.run(text).await {
                    Ok(()) => {
                        info!(program = %backend.program, "copied to clipboard");
                        return Ok(());
                    }
                    Err(e) => {
                        debug!(error = %e, "clipboard backend failed");
                        failures.push(e.to_string());
                    }
                }
            }
            Err(ClipboardError::Unavailable(failures.join("; ")))
        })
    }
}
