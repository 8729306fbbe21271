//! OS signal handling.
//!
//! - SIGINT / SIGTERM → fire the shutdown signal (repeats are ignored)
//! - SIGHUP → reload configuration, when a watched config file is set

use tokio::task::JoinHandle;

use crate::config::ReloadTrigger;
use crate::lifecycle::shutdown::Shutdown;

/// Background task translating OS signals into lifecycle actions.
pub struct SignalTrap {
    task: JoinHandle<()>,
}

impl SignalTrap {
    /// Install the trap. Must be called from within a Tokio runtime.
    pub fn install(shutdown: Shutdown, reload: Option<ReloadTrigger>) -> Self {
        let task = tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let mut terminate = match signal(SignalKind::terminate()) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                        None
                    }
                };
                let mut hangup = match signal(SignalKind::hangup()) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to install SIGHUP handler");
                        None
                    }
                };

                let mut interrupt_ok = true;
                loop {
                    tokio::select! {
                        res = tokio::signal::ctrl_c(), if interrupt_ok => {
                            if let Err(e) = res {
                                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                                interrupt_ok = false;
                                continue;
                            }
                            tracing::info!("Received SIGINT");
                            shutdown.trigger();
                        }
                        Some(_) = recv(&mut terminate) => {
                            tracing::info!("Received SIGTERM");
                            shutdown.trigger();
                        }
                        Some(_) = recv(&mut hangup) => {
                            match &reload {
                                Some(reload) => {
                                    tracing::info!("Received SIGHUP, reloading configuration");
                                    reload.trigger();
                                }
                                None => tracing::info!("Received SIGHUP, no watched config to reload"),
                            }
                        }
                        else => break,
                    }
                }
            }

            #[cfg(not(unix))]
            {
                let _ = reload;
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                        return;
                    }
                    tracing::info!("Received Ctrl+C");
                    shutdown.trigger();
                }
            }
        });

        tracing::debug!("Signal trap installed");
        Self { task }
    }

    /// Stop listening for signals.
    pub fn release(self) {
        self.task.abort();
        tracing::debug!("Signal trap released");
    }
}

#[cfg(unix)]
async fn recv(signal: &mut Option<tokio::signal::unix::Signal>) -> Option<()> {
    match signal {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
