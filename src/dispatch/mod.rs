//! # Dispatcher
//!
//! Routes a decoded activity to every handler bound to its verb.
//!
//! - Unbound verbs are dropped: logged, appended to the dropped-message log and
//!   counted under [`DROPPED`]. Not an error.
//! - Bound handlers run one at a time in registration order. A failed
//!   [`DispatchOutcome`] is logged and the next handler still runs.
//! - A handler that returns a [`HandlerError`] or panics aborts the remaining
//!   handlers for this activity and the fault is returned to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::activity::ActivityRecord;
use crate::pipeline::PipelineContext;
use crate::registry::{DispatchOutcome, HandlerEntry, HandlerError};
use crate::stats::DROPPED;

/// Outcome reported by one handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerReport {
    pub handler: String,
    pub outcome: DispatchOutcome,
    pub elapsed_ms: f64,
}

/// What happened to one activity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DispatchReport {
    /// No handler bound to the verb
    Dropped { verb: String },
    /// Every bound handler ran
    Dispatched {
        verb: String,
        handlers: Vec<HandlerReport>,
    },
}

impl DispatchReport {
    pub fn verb(&self) -> &str {
        match self {
            DispatchReport::Dropped { verb } | DispatchReport::Dispatched { verb, .. } => verb,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, DispatchReport::Dropped { .. })
    }

    /// Handler reports in invocation order (empty when dropped)
    pub fn handler_reports(&self) -> &[HandlerReport] {
        match self {
            DispatchReport::Dropped { .. } => &[],
            DispatchReport::Dispatched { handlers, .. } => handlers,
        }
    }

    /// Number of handlers that reported a failed outcome
    pub fn failure_count(&self) -> usize {
        self.handler_reports()
            .iter()
            .filter(|report| !report.outcome.success)
            .count()
    }
}

/// A handler fault that aborted dispatch
#[derive(Debug, Clone, PartialEq, Error)]
#[error("handler '{handler}' for verb '{verb}' aborted dispatch: {error}")]
pub struct DispatchError {
    pub verb: String,
    pub handler: String,
    #[source]
    pub error: HandlerError,
    /// Handlers that completed before the fault
    pub completed: Vec<HandlerReport>,
}

impl DispatchError {
    pub fn is_interruption(&self) -> bool {
        self.error.is_interruption()
    }
}

/// Verb-keyed dispatcher over the shared registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    context: Arc<PipelineContext>,
}

impl Dispatcher {
    pub fn new(context: Arc<PipelineContext>) -> Self {
        Self { context }
    }

    /// Invoke every handler bound to `activity.verb`
    #[instrument(skip_all, fields(verb = %activity.verb))]
    pub async fn dispatch(
        &self,
        payload: Arc<Value>,
        activity: Arc<ActivityRecord>,
    ) -> Result<DispatchReport, DispatchError> {
        let verb = activity.verb.clone();

        // Snapshot so the registry lock is not held across handler awaits
        let handlers: Vec<HandlerEntry> = {
            let registry = self.context.registry().read().await;
            registry
                .handlers_for(&verb)
                .map(<[HandlerEntry]>::to_vec)
                .unwrap_or_default()
        };

        if handlers.is_empty() {
            self.drop_message(&verb, &payload).await;
            return Ok(DispatchReport::Dropped { verb });
        }

        let mut reports = Vec::with_capacity(handlers.len());
        for entry in &handlers {
            let start = Instant::now();
            // Sync handlers run inside `invoke`, so it is called within the guard
            let invocation = async { entry.invoke(payload.clone(), activity.clone()).await };
            let result = AssertUnwindSafe(invocation).catch_unwind().await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            self.context
                .stats()
                .timing(&format!("handler.{}", entry.name()), elapsed_ms);

            let outcome = match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(handler_error)) => {
                    return Err(self.abort(&verb, entry, handler_error, reports));
                }
                Err(panic_error) => {
                    let panic_msg = if let Some(s) = panic_error.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_error.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    return Err(self.abort(&verb, entry, HandlerError::Panicked(panic_msg), reports));
                }
            };

            if outcome.success {
                debug!(
                    handler = %entry.name(),
                    status_code = outcome.status_code,
                    elapsed_ms = elapsed_ms,
                    "handler completed"
                );
            } else {
                self.context
                    .pipeline_stats()
                    .handler_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!(
                    verb = %verb,
                    handler = %entry.name(),
                    status_code = outcome.status_code,
                    failure = %outcome.message,
                    "handler reported failure"
                );
            }

            reports.push(HandlerReport {
                handler: entry.name().to_string(),
                outcome,
                elapsed_ms,
            });
        }

        Ok(DispatchReport::Dispatched {
            verb,
            handlers: reports,
        })
    }

    async fn drop_message(&self, verb: &str, payload: &Value) {
        error!(verb = %verb, "no handler enabled for verb {}, dropping message", verb);

        if let Err(e) = self.context.dropped_log().append(payload).await {
            warn!(verb = %verb, error = %e, "could not write dropped message");
        }
        self.context.stats().incr(DROPPED);
        self.context
            .pipeline_stats()
            .dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    fn abort(
        &self,
        verb: &str,
        entry: &HandlerEntry,
        error: HandlerError,
        completed: Vec<HandlerReport>,
    ) -> DispatchError {
        if error.is_interruption() {
            info!(handler = %entry.name(), "handler requested interruption");
        } else {
            error!(
                verb = %verb,
                handler = %entry.name(),
                error = %error,
                "handler fault, skipping remaining handlers"
            );
        }

        DispatchError {
            verb: verb.to_string(),
            handler: entry.name().to_string(),
            error,
            completed,
        }
    }
}
