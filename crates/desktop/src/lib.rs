//! Desktop integration for the share CLI.
//!
//! - [`Notifier`]: informational, error and link notifications
//! - [`wait_for_action`]: a single cancellable wait for a notification action
//! - [`Clipboard`]: sets the system clipboard
//!
//! Desktop tools are driven as child processes (`notify-send`, `qdbus`,
//! `wl-copy`, `xclip`). A missing tool degrades to a logged warning; nothing
//! here can fail an upload.

mod action;
mod clipboard;
mod notifier;

use std::future::Future;
use std::pin::Pin;

pub use action::{ActionOutcome, NotificationSignal, wait_for_action};
pub use clipboard::{Clipboard, ClipboardBackend, ClipboardError, SystemClipboard};
pub use notifier::{APP_NAME, COPY_ACTION, ConsoleNotifier, DesktopNotifier, Notifier};

/// Boxed future returned by the object-safe traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
