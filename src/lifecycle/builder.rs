//! Fluent setup surface.
//!
//! Everything here happens on one task before `run()`: handlers, routes
//! and middleware are only collected, nothing executes until the
//! orchestrator reaches the matching phase.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::config::{ConfigSource, ConfigStore};
use crate::events::{handler_fn, BoxError, EventBus, Handler, HandlerResult, Phase};
use crate::http::{health_route, HttpStack};
use crate::lifecycle::context::Context;
use crate::lifecycle::error::Result;
use crate::lifecycle::orchestrator::Orchestrator;
use crate::lifecycle::shutdown::Shutdown;
use crate::registry::{ConsulRegistry, RegistryError, ServiceInstance, ServiceRegistry};

/// Builder for an application run.
///
/// ```rust,ignore
/// Bootstrap::from_env()?
///     .on_boot(|ctx| async move { open_pool(&ctx).await })
///     .routes(|r| r.route("/orders", get(list_orders)))
///     .on_shutdown(|ctx| async move { flush(&ctx).await })
///     .run()
///     .await?;
/// ```
pub struct Bootstrap {
    ctx: Context,
    handlers: Vec<(Phase, Arc<dyn Handler>)>,
    http: HttpStack,
    handle_signals: bool,
    watch_path: Option<PathBuf>,
    drain_timeout: Option<Duration>,
}

impl Bootstrap {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            ctx: Context::new(config, Shutdown::new()),
            handlers: Vec::new(),
            http: HttpStack::new(),
            handle_signals: true,
            watch_path: None,
            drain_timeout: None,
        }
    }

    /// Load configuration from `source` and keep it hot-reloaded.
    pub fn from_source(source: &ConfigSource) -> Result<Self> {
        tracing::info!(path = %source.path().display(), "Loading configuration");
        let store = ConfigStore::new(source.load()?);
        Ok(Self::new(store).watch_config(source.path()))
    }

    /// Like [`Bootstrap::from_source`] with `CONFIG_FILE` or `config.toml`.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&ConfigSource::from_env())
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Handle for requesting shutdown from outside the process context.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.ctx.shutdown().clone()
    }

    /// Register a [`Handler`] for `phase`.
    pub fn handler<H: Handler>(mut self, phase: Phase, handler: H) -> Self {
        self.handlers.push((phase, Arc::new(handler)));
        self
    }

    /// Run `f` during the boot phase, before the HTTP stack is built.
    pub fn on_boot<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler(Phase::Boot, handler_fn(f))
    }

    /// Run `f` during the startup phase, before the listener binds.
    pub fn on_startup<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler(Phase::Startup, handler_fn(f))
    }

    /// Run `f` after the shutdown signal, before the listener drains.
    pub fn on_shutdown<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler(Phase::Shutdown, handler_fn(f))
    }

    /// Add routes: `|router| router.route(...)`.
    pub fn routes<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.http.add_routes(f);
        self
    }

    /// Add middleware: `|router| router.layer(...)`. Earlier registrations
    /// are outermost.
    pub fn middleware<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.http.add_middleware(f);
        self
    }

    /// Register `instance` with `registry` on startup and deregister on
    /// shutdown.
    pub fn discovery<R: ServiceRegistry>(self, instance: ServiceInstance, registry: R) -> Self {
        let registry = Arc::new(registry);
        let instance = Arc::new(instance);

        let on_start = {
            let registry = registry.clone();
            let instance = instance.clone();
            move |_ctx: Context| {
                let registry = registry.clone();
                let instance = instance.clone();
                async move {
                    registry.register(&instance).await?;
                    Ok::<(), BoxError>(())
                }
            }
        };
        let on_stop = move |_ctx: Context| {
            let registry = registry.clone();
            async move {
                registry.deregister().await?;
                Ok::<(), BoxError>(())
            }
        };

        self.on_startup(on_start).on_shutdown(on_stop)
    }

    /// Discovery from the `[cloud]` section: a Consul agent client, this
    /// instance as described by the config, and a health route.
    pub fn default_discovery(self) -> Result<Self> {
        let config = self.ctx.config().current();
        if config.cloud.is_empty() {
            return Err(RegistryError::MissingAddress.into());
        }
        let path = &config.cloud.health_check_path;
        if !path.starts_with('/') {
            return Err(RegistryError::InvalidHealthPath(path.clone()).into());
        }
        let registry = ConsulRegistry::from_config(&config.cloud)?;
        let instance = ServiceInstance::from_config(&config);
        Ok(self
            .routes(health_route(config.cloud.health_check_path.clone()))
            .discovery(instance, registry))
    }

    /// Reload configuration from `path` on change and on SIGHUP.
    pub fn watch_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.watch_path = Some(path.into());
        self
    }

    /// Trap SIGINT/SIGTERM. On by default.
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Override `server.shutdown_timeout_secs`.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Turn the collected setup into event bus registrations.
    pub fn into_orchestrator(self) -> Orchestrator {
        let mut bus = EventBus::new();
        for (phase, handler) in self.handlers {
            bus.register_arc(phase, handler);
        }

        tracing::debug!(
            boot = bus.handler_count(Phase::Boot),
            startup = bus.handler_count(Phase::Startup),
            shutdown = bus.handler_count(Phase::Shutdown),
            routes = self.http.route_count(),
            middleware = self.http.middleware_count(),
            "Lifecycle registrations collected"
        );

        let mut orchestrator =
            Orchestrator::new(self.ctx, bus, self.http).handle_signals(self.handle_signals);
        if let Some(path) = self.watch_path {
            orchestrator = orchestrator.watch_config(path);
        }
        if let Some(timeout) = self.drain_timeout {
            orchestrator = orchestrator.drain_timeout(timeout);
        }
        orchestrator
    }

    /// Build the orchestrator and run it to completion.
    pub async fn run(self) -> Result<()> {
        self.into_orchestrator().run().await
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new(ConfigStore::default())
    }
}
