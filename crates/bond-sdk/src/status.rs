//! Transaction status notifications.

use std::fmt;
use std::sync::Mutex;

/// Message attached to the `Error` status when the signer declined.
pub const USER_REJECTED: &str = "userRejected";

/// Phase of one orchestrated transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxStatus {
    /// Nothing in flight, or the last outcome was acknowledged.
    Idle,
    /// The wallet is about to ask the user to sign.
    UserConfirmation,
    /// The signed transaction was accepted and awaits inclusion.
    NetworkConfirmation,
    Done,
    Error,
}

impl TxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::UserConfirmation => "userConfirmation",
            Self::NetworkConfirmation => "networkConfirmation",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// True while a transaction is waiting on the user or the network.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::UserConfirmation | Self::NetworkConfirmation)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether the orchestrator may move from `self` to `next`.
    pub fn can_transition_to(self, next: TxStatus) -> bool {
        use TxStatus::*;
        matches!(
            (self, next),
            (Idle, UserConfirmation)
                | (UserConfirmation, NetworkConfirmation)
                | (UserConfirmation, Error)
                | (NetworkConfirmation, Done)
                | (NetworkConfirmation, Error)
                | (Done, Idle)
                | (Error, Idle)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives status transitions from the orchestrator.
///
/// Called synchronously on the orchestrating thread; slow work belongs to the
/// implementation, not to the caller.
pub trait StatusReporter {
    fn on_status(&self, status: TxStatus, message: Option<&str>);
}

impl<F> StatusReporter for F
where
    F: Fn(TxStatus, Option<&str>),
{
    fn on_status(&self, status: TxStatus, message: Option<&str>) {
        self(status, message)
    }
}

/// Reporter that drops every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl StatusReporter for NoopReporter {
    fn on_status(&self, _status: TxStatus, _message: Option<&str>) {}
}

/// Holds the latest status the way a UI notification slot does.
///
/// Terminal states stay visible until [`StatusTracker::acknowledge`] moves the
/// tracker back to [`TxStatus::Idle`].
#[derive(Debug)]
pub struct StatusTracker {
    state: Mutex<(TxStatus, Option<String>)>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self {
            state: Mutex::new((TxStatus::Idle, None)),
        }
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TxStatus {
        self.lock().0
    }

    pub fn message(&self) -> Option<String> {
        self.lock().1.clone()
    }

    /// Clears a terminal status. Returns false while a transaction is pending.
    pub fn acknowledge(&self) -> bool {
        let mut state = self.lock();
        if state.0.is_pending() {
            return false;
        }
        *state = (TxStatus::Idle, None);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (TxStatus, Option<String>)> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatusReporter for StatusTracker {
    fn on_status(&self, status: TxStatus, message: Option<&str>) {
        let mut state = self.lock();
        if !state.0.can_transition_to(status) && !state.0.is_terminal() {
            log::warn!("status tracker: unexpected transition {} -> {status}", state.0);
        }
        *state = (status, message.filter(|m| !m.is_empty()).map(str::to_string));
    }
}
