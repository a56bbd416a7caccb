//! # Handler Entries
//!
//! A handler is a named async function of `(payload, activity)` returning a
//! `DispatchOutcome`. Handlers are plain capabilities stored in a lookup
//! table; there is no handler type hierarchy.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::activity::ActivityRecord;

/// Status code reported by handlers that completed normally
pub const STATUS_OK: u16 = 200;

/// Result a handler reports for one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
}

impl DispatchOutcome {
    pub fn ok() -> Self {
        Self::success(STATUS_OK, "ok")
    }

    pub fn success(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code,
            message: message.into(),
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            message: message.into(),
        }
    }
}

impl<S: Into<String>> From<(bool, u16, S)> for DispatchOutcome {
    fn from((success, status_code, message): (bool, u16, S)) -> Self {
        Self {
            success,
            status_code,
            message: message.into(),
        }
    }
}

/// Faults outside the outcome contract.
///
/// A handler that cannot even produce a `DispatchOutcome` returns one of these;
/// `Interrupted` asks the whole pipeline to stop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error("handler fault: {0}")]
    Fault(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("interrupted")]
    Interrupted,
}

impl HandlerError {
    pub fn fault(reason: impl Into<String>) -> Self {
        Self::Fault(reason.into())
    }

    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

pub type HandlerResult = Result<DispatchOutcome, HandlerError>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Handler function type.
///
/// Inputs are shared so one decoded activity can be handed to every handler
/// bound to its verb without copying.
pub type ActivityHandler =
    Arc<dyn Fn(Arc<Value>, Arc<ActivityRecord>) -> HandlerFuture + Send + Sync>;

/// A named handler as stored in the registry
#[derive(Clone)]
pub struct HandlerEntry {
    name: String,
    handler: ActivityHandler,
}

impl HandlerEntry {
    /// Wrap an async handler
    ///
    /// ```rust
    /// use logistik::registry::{DispatchOutcome, HandlerEntry};
    ///
    /// let entry = HandlerEntry::new("audit", |_payload, activity| async move {
    ///     Ok(DispatchOutcome::success(200, format!("saw {}", activity.verb)))
    /// });
    /// assert_eq!(entry.name(), "audit");
    /// ```
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Value>, Arc<ActivityRecord>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |payload: Arc<Value>, activity: Arc<ActivityRecord>| {
                Box::pin(handler(payload, activity)) as HandlerFuture
            }),
        }
    }

    /// Wrap a synchronous handler
    pub fn from_sync<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value, &ActivityRecord) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |payload: Arc<Value>, activity: Arc<ActivityRecord>| {
                let result = handler(&payload, &activity);
                Box::pin(async move { result }) as HandlerFuture
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, payload: Arc<Value>, activity: Arc<ActivityRecord>) -> HandlerFuture {
        (self.handler)(payload, activity)
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
