//! Orchestrator state machine.

use std::fmt;

use tokio::sync::watch;

/// Where the orchestrator is in the process lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Idle,
    /// Boot handlers running.
    Booting,
    /// HTTP stack assembled, startup handlers running, then bind.
    Starting,
    /// Listener serving; waiting for the shutdown signal.
    Running,
    /// Shutdown handlers running, then drain.
    ShuttingDown,
    /// Terminal. The process may exit.
    Stopped,
}

impl LifecycleState {
    /// The state a successful step leads to. `Stopped` has no successor.
    pub fn next(self) -> Option<Self> {
        use LifecycleState::*;
        match self {
            Idle => Some(Booting),
            Booting => Some(Starting),
            Starting => Some(Running),
            Running => Some(ShuttingDown),
            ShuttingDown => Some(Stopped),
            Stopped => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Booting => "booting",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Publishes state transitions to any number of observers.
#[derive(Debug)]
pub(crate) struct StateMachine {
    tx: watch::Sender<LifecycleState>,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Idle);
        Self { tx }
    }

    pub(crate) fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move to `to`. Forward steps follow the table in [`LifecycleState::next`];
    /// jumping straight to `Stopped` is how fatal errors end the run.
    pub(crate) fn transition(&self, to: LifecycleState) {
        let from = self.current();
        debug_assert!(
            from.next() == Some(to) || to == LifecycleState::Stopped,
            "illegal lifecycle transition {from} -> {to}"
        );
        tracing::info!(from = %from, to = %to, "Lifecycle state transition");
        self.tx.send_replace(to);
    }
}
