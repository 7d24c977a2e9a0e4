//! Process-wide exit state.
//!
//! ```text
//! Running ──► Exiting ──► CritExiting
//!    └───────────────────────▲
//! ```
//!
//! `Running` is the only state that can be left freely. `Exiting` may still
//! be escalated to `CritExiting`; `CritExiting` is final. Leaving `Running`
//! cancels the shared token, which wakes every bounded port read.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tollgate_core::constants::{EXIT_CRITICAL, EXIT_OK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitState {
    Running,
    /// Orderly shutdown was requested, e.g. by a signal.
    Exiting,
    /// A worker failed in a way it cannot recover from.
    CritExiting,
}

impl ExitState {
    /// Process exit code for a terminal that stopped in this state.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExitState::Running | ExitState::Exiting => EXIT_OK,
            ExitState::CritExiting => EXIT_CRITICAL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitState::Running => "running",
            ExitState::Exiting => "exiting",
            ExitState::CritExiting => "crit_exiting",
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    state: Mutex<ExitState>,
    token: CancellationToken,
}

/// Shared handle to the exit state. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    inner: Arc<Inner>,
}

impl Default for ExitSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ExitState::Running),
                token: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> ExitState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state() == ExitState::Running
    }

    /// Move towards `state`. Returns whether the state changed.
    ///
    /// Requests that would go back (to `Running`, or from `CritExiting` to
    /// `Exiting`) are ignored.
    pub fn request(&self, state: ExitState) -> bool {
        let mut current = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state <= *current {
            return false;
        }

        debug!(from = %current, to = %state, "Exit state changed");
        *current = state;
        drop(current);

        if state == ExitState::CritExiting {
            warn!("Critical exit requested");
        }
        self.inner.token.cancel();
        true
    }

    /// Request an orderly shutdown.
    pub fn exit(&self) -> bool {
        self.request(ExitState::Exiting)
    }

    /// Request a critical shutdown.
    pub fn crit_exit(&self) -> bool {
        self.request(ExitState::CritExiting)
    }

    /// Token cancelled once the state leaves `Running`.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Wait until the state leaves `Running`.
    pub async fn stopped(&self) {
        self.inner.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let exit = ExitSignal::new();
        assert!(exit.is_running());
        assert!(!exit.token().is_cancelled());
        assert_eq!(exit.state().exit_code(), EXIT_OK);
    }

    #[test]
    fn test_exit_then_escalate() {
        let exit = ExitSignal::new();
        assert!(exit.exit());
        assert_eq!(exit.state(), ExitState::Exiting);
        assert!(exit.token().is_cancelled());

        assert!(exit.crit_exit());
        assert_eq!(exit.state(), ExitState::CritExiting);
        assert_eq!(exit.state().exit_code(), EXIT_CRITICAL);
    }

    #[test]
    fn test_critical_is_final() {
        let exit = ExitSignal::new();
        exit.crit_exit();

        assert!(!exit.exit());
        assert!(!exit.request(ExitState::Running));
        assert!(!exit.crit_exit());
        assert_eq!(exit.state(), ExitState::CritExiting);
    }

    #[test]
    fn test_clones_share_state() {
        let exit = ExitSignal::new();
        let other = exit.clone();
        other.exit();
        assert!(!exit.is_running());
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiters() {
        let exit = ExitSignal::new();
        let waiter = tokio::spawn({
            let exit = exit.clone();
            async move { exit.stopped().await }
        });

        exit.exit();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
