//! Lifecycle orchestrator: drives the phases and the server.
//!
//! ```text
//! Idle ──run()──▶ Booting ──boot ok──▶ Starting ──startup ok + bind──▶ Running
//!                    │                    │                              │
//!                    └──── failure ───────┴────────▶ Stopped ◀── drain ◀─ ShuttingDown
//! ```

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tracing::Instrument;

use crate::config::ConfigWatcher;
use crate::events::bus::panic_message;
use crate::events::{EventBus, Phase};
use crate::http::HttpStack;
use crate::lifecycle::context::Context;
use crate::lifecycle::error::{LifecycleError, Result};
use crate::lifecycle::signals::SignalTrap;
use crate::lifecycle::state::{LifecycleState, StateMachine};
use crate::net::{self, Listener};

/// Owns everything needed to run the process through its lifecycle.
pub struct Orchestrator {
    ctx: Context,
    bus: EventBus,
    http: HttpStack,
    state: StateMachine,
    handle_signals: bool,
    watch_path: Option<PathBuf>,
    drain_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(ctx: Context, bus: EventBus, http: HttpStack) -> Self {
        Self {
            ctx,
            bus,
            http,
            state: StateMachine::new(),
            handle_signals: true,
            watch_path: None,
            drain_timeout: None,
        }
    }

    /// Trap SIGINT/SIGTERM (and SIGHUP for reload). On by default.
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Reload configuration from `path` whenever it changes.
    pub fn watch_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.watch_path = Some(path.into());
        self
    }

    /// Override `server.shutdown_timeout_secs`.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Run until the process may exit.
    ///
    /// Returns `Ok(())` after a clean shutdown. Boot/startup handler
    /// failures, route build panics and bind failures return before
    /// anything is served; a forced drain returns an error after the
    /// shutdown has completed.
    pub async fn run(mut self) -> Result<()> {
        self.state.transition(LifecycleState::Booting);

        let watcher = match &self.watch_path {
            Some(path) => match ConfigWatcher::new(path, self.ctx.config().clone()).spawn() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(error = %e, path = %path.display(), "Failed to start config watcher");
                    self.state.transition(LifecycleState::Stopped);
                    return Err(LifecycleError::Watch(e));
                }
            },
            None => None,
        };

        let trap = self.handle_signals.then(|| {
            SignalTrap::install(
                self.ctx.shutdown().clone(),
                watcher.as_ref().map(|w| w.reload_trigger()),
            )
        });

        let span = self.ctx.span().clone();
        let result = self.drive().instrument(span).await;

        if let Some(trap) = trap {
            trap.release();
        }
        if let Some(watcher) = watcher {
            watcher.stop().await;
        }
        if self.state.current() != LifecycleState::Stopped {
            self.state.transition(LifecycleState::Stopped);
        }

        match &result {
            Ok(()) => tracing::info!("Application exited cleanly"),
            Err(e) => tracing::error!(error = %e, "Application exited with error"),
        }
        result
    }

    async fn drive(&mut self) -> Result<()> {
        publish(&self.bus, &self.ctx, Phase::Boot).await?;

        self.state.transition(LifecycleState::Starting);
        let router = build_router(std::mem::take(&mut self.http), &self.ctx)?;

        publish(&self.bus, &self.ctx, Phase::Startup).await?;

        let Self { ctx, bus, .. } = &*self;
        let config = ctx.config().current();
        let listener =
            Listener::bind(&config.server.bind_address(), config.server.max_connections).await?;
        ctx.set_local_addr(listener.local_addr());
        let server = net::serve(listener, router);

        self.state.transition(LifecycleState::Running);
        tracing::info!(
            app = %config.app.name,
            address = %server.local_addr(),
            "Application started"
        );

        ctx.shutdown().wait().await;
        self.state.transition(LifecycleState::ShuttingDown);

        publish(bus, ctx, Phase::Shutdown).await?;

        let deadline = self.drain_timeout.unwrap_or_else(|| {
            Duration::from_secs(ctx.config().current().server.shutdown_timeout_secs)
        });
        let drained = server.drain(deadline).await;
        self.state.transition(LifecycleState::Stopped);

        match drained {
            Ok(report) => {
                tracing::info!(elapsed_ms = report.elapsed.as_millis() as u64, "Listener drained");
                Ok(())
            }
            Err(e) => Err(LifecycleError::Drain(e)),
        }
    }
}

/// Publish `phase`; only failures in fatal phases are returned.
async fn publish(bus: &EventBus, ctx: &Context, phase: Phase) -> Result<()> {
    match bus.publish(phase, ctx).await {
        Ok(()) => Ok(()),
        Err(failure) if phase.is_fatal() => Err(failure.into()),
        Err(failure) => {
            tracing::warn!(error = %failure, "Handler failed, continuing");
            Ok(())
        }
    }
}

/// Assemble the router. axum panics on invalid or overlapping routes.
fn build_router(http: HttpStack, ctx: &Context) -> Result<Router> {
    std::panic::catch_unwind(AssertUnwindSafe(|| http.build(ctx))).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(error = %message, "Failed to build routes");
        LifecycleError::Routes(message)
    })
}
