//! Cancellable wait for a notification action.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Signal from a notification's event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSignal {
    /// The user invoked the action with this key.
    ActionInvoked(String),
    /// The notification was dismissed or expired.
    Closed,
}

/// How a wait for a notification action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The awaited action was invoked.
    Invoked(String),
    /// The notification went away without the action.
    Closed,
    /// The wait was cancelled (e.g. process shutdown).
    Cancelled,
}

/// Waits for exactly one of: `action` invoked, the notification closed, or
/// `cancel` fired.
///
/// Signals for other actions are ignored. A closed channel counts as
/// [`ActionOutcome::Closed`].
pub async fn wait_for_action(
    signals: &mut mpsc::Receiver<NotificationSignal>,
    action: &str,
    cancel: &CancellationToken,
) -> ActionOutcome {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("action wait cancelled");
                return ActionOutcome::Cancelled;
            }
            signal = signals.recv() => match signal {
                Some(NotificationSignal::ActionInvoked(key)) if key == action => {
                    return ActionOutcome::Invoked(key);
                }
                Some(NotificationSignal::ActionInvoked(key)) => {
                    debug!(action = %key, "ignoring unrelated notification action");
                }
                Some(NotificationSignal::Closed) | None => {
                    return ActionOutcome::Closed;
                }
            },
        }
    }
}
