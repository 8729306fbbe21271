//! Lifecycle phases.

use std::fmt;

/// A stage of the process lifecycle that handlers can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Before the HTTP stack is assembled. Open resources here.
    Boot,
    /// After routes are installed, before the listener binds.
    Startup,
    /// After the shutdown signal, before the listener drains.
    Shutdown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Boot => "boot",
            Phase::Startup => "startup",
            Phase::Shutdown => "shutdown",
        }
    }

    /// Whether a handler failure in this phase aborts the process.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Phase::Shutdown)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
