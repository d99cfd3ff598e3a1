//! Freedesktop notifications via `notify-send`.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::BoxFuture;
use crate::action::{ActionOutcome, NotificationSignal, wait_for_action};

/// Application name shown on notifications.
pub const APP_NAME: &str = "Share via Filebrowser";

/// Desktop entry hint, so the shell can group and keep link notifications.
const DESKTOP_ENTRY: &str = "lt.svetikas.FilebrowserServiceMenu";

/// Action key of the "Copy Link" button.
pub const COPY_ACTION: &str = "copy";

/// Plain notification timeout in milliseconds.
const NOTIFY_TIMEOUT_MS: u32 = 7000;

/// Link notification timeout in milliseconds.
const LINK_TIMEOUT_MS: u32 = 5000;

/// Displays notifications to the user.
pub trait Notifier: Send + Sync {
    /// Shows an informational or error message. Never fails.
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, ()>;

    /// Shows a notification for `link`.
    ///
    /// When `actionable`, offers a "Copy Link" action and waits until it is
    /// invoked, the notification closes, or `cancel` fires.
    fn notify_link<'a>(
        &'a self,
        title: &'a str,
        message: &'a str,
        link: &'a str,
        actionable: bool,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, ActionOutcome>;
}

// ---------------------------------------------------------------------------
// ConsoleNotifier
// ---------------------------------------------------------------------------

/// Notifier with no desktop output, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            debug!(title, message, "console notification");
        })
    }

    fn notify_link<'a>(
        &'a self,
        title: &'a str,
        _message: &'a str,
        link: &'a str,
        _actionable: bool,
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, ActionOutcome> {
        Box::pin(async move {
            debug!(title, link, "console link notification");
            ActionOutcome::Closed
        })
    }
}

// ---------------------------------------------------------------------------
// DesktopNotifier
// ---------------------------------------------------------------------------

/// Notifier backed by the `notify-send` tool from libnotify.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::with_program("notify-send")
    }

    /// Uses `program` instead of `notify-send`. It receives the same
    /// arguments.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns `true` if the environment looks like a graphical session.
    pub fn session_available() -> bool {
        ["DBUS_SESSION_BUS_ADDRESS", "WAYLAND_DISPLAY", "DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
    }

    fn base_command(&self, timeout_ms: u32) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("--app-name={APP_NAME}"))
            .arg(format!("--expire-time={timeout_ms}"))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    async fn show_link(&self, title: &str, message: &str, cancel: CancellationToken) -> ActionOutcome {
        let spawned = self
            .base_command(LINK_TIMEOUT_MS)
            .arg(format!("--hint=string:desktop-entry:{DESKTOP_ENTRY}"))
            .arg(format!("--action={COPY_ACTION}=Copy Link"))
            .arg("--wait")
            .arg("--")
            .args([title, message])
            .stdout(Stdio::piped())
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program, error = %e, "failed to send link notification");
                return ActionOutcome::Closed;
            }
        };

        debug!("notification sent, waiting for action");
        let (tx, mut rx) = mpsc::channel(4);
        let watcher = tokio::spawn(watch_actions(child, tx));
        let outcome = wait_for_action(&mut rx, COPY_ACTION, &cancel).await;
        // Aborting drops the child, which kills it.
        watcher.abort();
        outcome
    }
}

/// Forwards each action key printed by `notify-send --wait`, then reports
/// the notification closed once the process exits.
async fn watch_actions(mut child: Child, tx: mpsc::Sender<NotificationSignal>) {
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let key = line.trim();
            if key.is_empty() {
                continue;
            }
            if tx
                .send(NotificationSignal::ActionInvoked(key.to_string()))
                .await
                .is_err()
            {
                return;
            }
        }
    }

    let _ = child.wait().await;
    let _ = tx.send(NotificationSignal::Closed).await;
}

impl Notifier for DesktopNotifier {
    fn notify<'a>(&'a self, title: &'a str, message: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            debug!(title, message, "sending notification");
            let status = self
                .base_command(NOTIFY_TIMEOUT_MS)
                .arg("--")
                .args([title, message])
                .stdout(Stdio::null())
                .status()
                .await;

            match status {
                Ok(s) if s.success() => {}
                Ok(s) => warn!(program = %self.program, status = %s, "notification command failed"),
                Err(e) => warn!(program = %self.program, error = %e, "failed to send notification"),
            }
        })
    }

    fn notify_link<'a>(
        &'a self,
        title: &'a str,
        message: &'a str,
        _link: &'a str,
        actionable: bool,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, ActionOutcome> {
        Box::pin(async move {
            if !actionable {
                self.notify(title, message).await;
                return ActionOutcome::Closed;
            }
            self.show_link(title, message, cancel).await
        })
    }
}
