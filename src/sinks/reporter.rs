//! # Error Reporting
//!
//! Where per-message failures go once they have been logged: an external
//! exception tracker in production, an in-memory list in tests.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::error;

use crate::pipeline::ProcessingStage;

/// Context captured for one failed message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Stage the message was in when it failed
    pub stage: ProcessingStage,
    pub error: String,
    /// Description of the raw message (`topic:partition:offset key=… value=…`)
    pub message: String,
    pub reported_at: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(
        stage: ProcessingStage,
        error: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            error: error.into(),
            message: message.into(),
            reported_at: Utc::now(),
        }
    }
}

pub trait ErrorReporter: Send + Sync + 'static {
    fn capture(&self, report: &ErrorReport);
}

/// Reports failures as error-level tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn capture(&self, report: &ErrorReport) {
        error!(
            stage = %report.stage,
            error = %report.error,
            raw_message = %report.message,
            reported_at = %report.reported_at.to_rfc3339(),
            "captured processing failure"
        );
    }
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingErrorReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl CollectingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ErrorReporter for CollectingErrorReporter {
    fn capture(&self, report: &ErrorReport) {
        self.reports.lock().push(report.clone());
    }
}
