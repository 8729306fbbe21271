//! Process context shared by every handler and request.

use std::any::{Any, TypeId};
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::config::ConfigStore;
use crate::lifecycle::shutdown::Shutdown;

type Extensions = DashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Handle to process-wide services.
///
/// Cheap to clone; all clones share state. Available to lifecycle handlers
/// as their argument and to axum handlers as `Extension<Context>`.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConfigStore,
    shutdown: Shutdown,
    local_addr: OnceLock<SocketAddr>,
    extensions: Extensions,
    span: tracing::Span,
}

impl Context {
    pub fn new(config: ConfigStore, shutdown: Shutdown) -> Self {
        let span = {
            let current = config.current();
            tracing::info_span!("app", name = %current.app.name, env = %current.app.env)
        };
        Self {
            inner: Arc::new(Inner {
                config,
                shutdown,
                local_addr: OnceLock::new(),
                extensions: DashMap::new(),
                span,
            }),
        }
    }

    /// The configuration store. Read with `current()`; change only with
    /// `replace()`.
    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.inner.shutdown
    }

    /// Ask the orchestrator to shut down. Same effect as SIGTERM.
    pub fn request_shutdown(&self) -> bool {
        self.inner.shutdown.trigger()
    }

    /// Span the orchestrator runs in; named after the application.
    pub fn span(&self) -> &tracing::Span {
        &self.inner.span
    }

    /// Address the listener is bound to; `None` before the server is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr.get().copied()
    }

    pub(crate) fn set_local_addr(&self, addr: SocketAddr) {
        let _ = self.inner.local_addr.set(addr);
    }

    /// Store a shared service, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.inner.extensions.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Fetch a shared service stored with [`Context::insert`].
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let entry = self.inner.extensions.get(&TypeId::of::<T>())?;
        let value = Arc::clone(entry.value());
        drop(entry);
        value.downcast::<T>().ok()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.inner.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ConfigStore::default(), Shutdown::new())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("app", &self.inner.config.current().app.name)
            .field("local_addr", &self.local_addr())
            .field("extensions", &self.inner.extensions.len())
            .field("shutdown", &self.inner.shutdown.is_triggered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pool(&'static str);

    #[test]
    fn extensions_are_shared_between_clones() {
        let ctx = Context::default();
        let clone = ctx.clone();
        assert!(ctx.get::<Pool>().is_none());

        clone.insert(Pool("primary"));
        assert!(ctx.contains::<Pool>());
        assert_eq!(*ctx.get::<Pool>().unwrap(), Pool("primary"));

        ctx.insert(Pool("replica"));
        assert_eq!(*clone.get::<Pool>().unwrap(), Pool("replica"));
    }

    #[test]
    fn local_addr_is_set_once() {
        let ctx = Context::default();
        assert_eq!(ctx.local_addr(), None);
        let first: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        ctx.set_local_addr(first);
        ctx.set_local_addr("127.0.0.1:5000".parse().unwrap());
        assert_eq!(ctx.local_addr(), Some(first));
    }

    #[test]
    fn request_shutdown_is_idempotent() {
        let ctx = Context::default();
        assert!(ctx.request_shutdown());
        assert!(!ctx.clone().request_shutdown());
        assert!(ctx.shutdown().is_triggered());
    }
}
