//! Per-phase handler registry and ordered dispatch.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::events::handler::{BoxError, Handler};
use crate::events::phase::Phase;
use crate::lifecycle::Context;
use crate::observability::metrics;

/// Why a single handler did not complete.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(#[source] BoxError),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// A handler failed while its phase was being published.
#[derive(Debug, thiserror::Error)]
#[error("{phase} handler #{index} failed: {cause}")]
pub struct PhaseFailure {
    pub phase: Phase,
    /// Registration position of the failing handler.
    pub index: usize,
    #[source]
    pub cause: HandlerError,
}

/// Ordered handler lists, one per phase.
///
/// `register` takes `&mut self` and `publish` takes `&self`, so handlers
/// can never be added to a phase while it is being published.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<Phase, Vec<Arc<dyn Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to `phase`. Registering the same handler twice runs
    /// it twice.
    pub fn register<H: Handler>(&mut self, phase: Phase, handler: H) {
        self.register_arc(phase, Arc::new(handler));
    }

    pub fn register_arc(&mut self, phase: Phase, handler: Arc<dyn Handler>) {
        self.handlers.entry(phase).or_default().push(handler);
    }

    pub fn handler_count(&self, phase: Phase) -> usize {
        self.handlers.get(&phase).map_or(0, Vec::len)
    }

    /// Run every handler of `phase` in registration order on the calling
    /// task, each to completion before the next starts.
    ///
    /// Stops at the first failing (or panicking) handler; the handlers after
    /// it are not run. Every call re-runs the full list.
    pub async fn publish(&self, phase: Phase, ctx: &Context) -> Result<(), PhaseFailure> {
        let handlers = self.handlers.get(&phase).map(Vec::as_slice).unwrap_or_default();
        let start = Instant::now();

        tracing::info!(phase = %phase, handlers = handlers.len(), "Publishing lifecycle phase");

        for (index, handler) in handlers.iter().enumerate() {
            tracing::debug!(phase = %phase, index, "Running handler");

            let outcome = AssertUnwindSafe(async { handler.call(ctx.clone()).await })
                .catch_unwind()
                .await;

            let cause = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => HandlerError::Failed(e),
                Err(payload) => HandlerError::Panicked(panic_message(payload.as_ref())),
            };

            tracing::error!(phase = %phase, index, error = %cause, "Lifecycle handler failed");
            metrics::record_handler_failure(phase.as_str());
            metrics::record_phase(phase.as_str(), start.elapsed(), false);
            return Err(PhaseFailure { phase, index, cause });
        }

        metrics::record_phase(phase.as_str(), start.elapsed(), true);
        tracing::info!(
            phase = %phase,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Lifecycle phase complete"
        );
        Ok(())
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::events::handler::{handler_fn, HandlerResult};

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str, delay_ms: u64) -> impl Handler {
        let log = log.clone();
        handler_fn(move |_ctx: Context| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("{name}:start"));
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                log.lock().unwrap().push(format!("{name}:end"));
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn handlers_run_sequentially_in_registration_order() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        // Decreasing delays: any overlap would reorder the log.
        bus.register(Phase::Boot, recorder(&log, "a", 30));
        bus.register(Phase::Boot, recorder(&log, "b", 10));
        bus.register(Phase::Boot, recorder(&log, "c", 0));
        bus.register(Phase::Startup, recorder(&log, "other", 0));

        bus.publish(Phase::Boot, &Context::default()).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:start", "a:end", "b:start", "b:end", "c:start", "c:end"]
        );
    }

    #[tokio::test]
    async fn failure_stops_the_phase() {
        let log: Log = Arc::default();
        let mut bus = EventBus::new();
        bus.register(Phase::Startup, recorder(&log, "first", 0));
        bus.register(
            Phase::Startup,
            handler_fn(|_ctx: Context| async move { Err::<(), BoxError>("db unreachable".into()) }),
        );
        bus.register(Phase::Startup, recorder(&log, "never", 0));

        let failure = bus.publish(Phase::Startup, &Context::default()).await.unwrap_err();

        assert_eq!(failure.phase, Phase::Startup);
        assert_eq!(failure.index, 1);
        assert!(matches!(failure.cause, HandlerError::Failed(_)));
        assert_eq!(failure.to_string(), "startup handler #1 failed: db unreachable");
        assert_eq!(*log.lock().unwrap(), vec!["first:start", "first:end"]);
    }

    #[tokio::test]
    async fn panicking_handler_becomes_failure() {
        let mut bus = EventBus::new();
        bus.register(
            Phase::Boot,
            handler_fn(|_ctx: Context| async move {
                if true {
                    panic!("boom");
                }
                Ok(())
            }),
        );

        let failure = bus.publish(Phase::Boot, &Context::default()).await.unwrap_err();
        match failure.cause {
            HandlerError::Panicked(msg) => assert_eq!(msg, "boom"),
            other => panic!("unexpected cause: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_phase_is_a_no_op() {
        let bus = EventBus::new();
        assert_eq!(bus.handler_count(Phase::Shutdown), 0);
        bus.publish(Phase::Shutdown, &Context::default()).await.unwrap();
    }

    #[tokio::test]
    async fn republish_and_duplicate_registration_rerun() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler: Arc<dyn Handler> = {
            let count = count.clone();
            Arc::new(handler_fn(move |_ctx: Context| {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    HandlerResult::Ok(())
                }
            }))
        };

        let mut bus = EventBus::new();
        bus.register_arc(Phase::Shutdown, handler.clone());
        bus.register_arc(Phase::Shutdown, handler);
        assert_eq!(bus.handler_count(Phase::Shutdown), 2);

        let ctx = Context::default();
        bus.publish(Phase::Shutdown, &ctx).await.unwrap();
        bus.publish(Phase::Shutdown, &ctx).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }
}
