//! Handler capability and closure adapter.

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::lifecycle::Context;

/// Boxed error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of running one handler.
pub type HandlerResult = Result<(), BoxError>;

/// A unit of lifecycle work, run with the shared process context.
///
/// Implement this for stateful hooks; plain async closures go through
/// [`handler_fn`].
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter turning an async closure into a [`Handler`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap `f` as a [`Handler`].
///
/// ```rust,ignore
/// bus.register(Phase::Boot, handler_fn(|ctx: Context| async move {
///     tracing::info!(app = %ctx.config().current().app.name, "booting");
///     Ok(())
/// }));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.f)(ctx))
    }
}
