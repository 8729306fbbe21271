//! Health endpoint probed by the service registry.

use axum::{routing::get, Extension, Json, Router};
use serde::Serialize;

use crate::lifecycle::Context;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

pub async fn health(Extension(ctx): Extension<Context>) -> Json<HealthStatus> {
    let config = ctx.config().current();
    let service = config
        .cloud
        .service_name
        .clone()
        .unwrap_or_else(|| config.app.name.clone());
    Json(HealthStatus {
        status: if ctx.shutdown().is_triggered() { "DOWN" } else { "UP" },
        service,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Mount the health endpoint at `path`.
pub fn health_route(path: String) -> impl FnOnce(Router) -> Router + Send + 'static {
    move |router| router.route(&path, get(health))
}
