//! HTTP stack assembly.
//!
//! # Responsibilities
//! - Collect route and middleware registrations during setup
//! - Build the axum Router once, between boot and bind
//! - Wire up built-in layers (request ID, tracing, panic recovery,
//!   timeout, body limit, metrics) around the user stack

use std::time::Duration;

use axum::{middleware, Extension, Router};
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::request::{make_span, propagate_request_id, set_request_id};
use crate::lifecycle::Context;
use crate::observability::metrics;

/// A deferred transformation of the router: adds routes or wraps layers.
pub type RouterFn = Box<dyn FnOnce(Router) -> Router + Send>;

/// Routes and middleware accumulated before the server starts.
#[derive(Default)]
pub struct HttpStack {
    routes: Vec<RouterFn>,
    middleware: Vec<RouterFn>,
}

impl HttpStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_routes<F>(&mut self, f: F)
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.routes.push(Box::new(f));
    }

    pub fn add_middleware<F>(&mut self, f: F)
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.middleware.push(Box::new(f));
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Build the final router.
    ///
    /// Middleware registered first ends up outermost, i.e. sees the request
    /// first. Built-in layers wrap everything registered by the user, and
    /// `Extension<Context>` is visible to both user middleware and handlers.
    #[allow(deprecated)]
    pub fn build(self, ctx: &Context) -> Router {
        let config = ctx.config().current();

        let mut router = Router::new();
        for add in self.routes {
            router = add(router);
        }
        // axum: the last layer applied is the outermost.
        for wrap in self.middleware.into_iter().rev() {
            router = wrap(router);
        }

        router
            .layer(Extension(ctx.clone()))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(propagate_request_id())
            .layer(set_request_id())
    }
}
