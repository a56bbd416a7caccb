//! # Message Processor
//!
//! Runs one delivered message through decode and dispatch:
//!
//! ```text
//! received -> decoding -> decoded -> dispatching -> done
//!                 |                      |
//!                 v                      v
//!           decode_failed         dispatch_failed
//! ```
//!
//! Both failure exits are logged, forwarded to the error reporter and the
//! message is skipped. Interruption is the only thing that escapes.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, trace};

use crate::activity::ParseError;
use crate::dispatch::{DispatchError, DispatchReport, Dispatcher};
use crate::messaging::RawMessage;
use crate::pipeline::PipelineContext;
use crate::sinks::ErrorReport;

/// Where a message is in its processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Received,
    Decoding,
    Decoded,
    Dispatching,
    Done,
    DecodeFailed,
    DispatchFailed,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Received => "received",
            ProcessingStage::Decoding => "decoding",
            ProcessingStage::Decoded => "decoded",
            ProcessingStage::Dispatching => "dispatching",
            ProcessingStage::Done => "done",
            ProcessingStage::DecodeFailed => "decode_failed",
            ProcessingStage::DispatchFailed => "dispatch_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStage::Done | ProcessingStage::DecodeFailed | ProcessingStage::DispatchFailed
        )
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-message failure classification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("could not decode activity: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Dispatch(DispatchError),

    #[error("processing interrupted")]
    Interrupted,
}

impl From<DispatchError> for ProcessingError {
    fn from(error: DispatchError) -> Self {
        if error.is_interruption() {
            ProcessingError::Interrupted
        } else {
            ProcessingError::Dispatch(error)
        }
    }
}

/// Interruption requested while processing; the consume loop must stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("processing interrupted")]
pub struct Interrupted;

/// Final state of one message, for observability and tests
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Decoded and dispatched (or dropped)
    Completed(DispatchReport),
    DecodeFailed(ParseError),
    DispatchFailed(DispatchError),
}

impl MessageOutcome {
    pub fn stage(&self) -> ProcessingStage {
        match self {
            MessageOutcome::Completed(_) => ProcessingStage::Done,
            MessageOutcome::DecodeFailed(_) => ProcessingStage::DecodeFailed,
            MessageOutcome::DispatchFailed(_) => ProcessingStage::DispatchFailed,
        }
    }

    pub fn report(&self) -> Option<&DispatchReport> {
        match self {
            MessageOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.report().is_some_and(DispatchReport::is_dropped)
    }
}

/// Decode + dispatch for one message at a time
#[derive(Debug, Clone)]
pub struct MessageProcessor {
    context: Arc<PipelineContext>,
    dispatcher: Dispatcher,
}

impl MessageProcessor {
    pub fn new(context: Arc<PipelineContext>) -> Self {
        Self {
            dispatcher: Dispatcher::new(context.clone()),
            context,
        }
    }

    /// Process one message to completion. Only interruption is returned as
    /// an error; every other failure is recorded in the outcome.
    #[instrument(skip_all, fields(coordinates = %message.coordinates()))]
    pub async fn process_message(&self, message: &RawMessage) -> Result<MessageOutcome, Interrupted> {
        trace!(stage = %ProcessingStage::Received, "processing message");

        match self.try_process(message).await {
            Ok(report) => {
                self.context
                    .pipeline_stats()
                    .processed
                    .fetch_add(1, Ordering::Relaxed);
                trace!(stage = %ProcessingStage::Done, verb = %report.verb(), "message processed");
                Ok(MessageOutcome::Completed(report))
            }
            Err(ProcessingError::Parse(parse_error)) => {
                self.context
                    .pipeline_stats()
                    .parse_failures
                    .fetch_add(1, Ordering::Relaxed);
                error!(
                    stage = %ProcessingStage::DecodeFailed,
                    raw = %message,
                    error = %parse_error,
                    "could not parse message"
                );
                self.report(ProcessingStage::Decoding, &parse_error, message);
                Ok(MessageOutcome::DecodeFailed(parse_error))
            }
            Err(ProcessingError::Dispatch(dispatch_error)) => {
                self.context
                    .pipeline_stats()
                    .dispatch_failures
                    .fetch_add(1, Ordering::Relaxed);
                error!(
                    stage = %ProcessingStage::DispatchFailed,
                    raw = %message,
                    error = %dispatch_error,
                    "could not handle message"
                );
                self.report(ProcessingStage::Dispatching, &dispatch_error, message);
                Ok(MessageOutcome::DispatchFailed(dispatch_error))
            }
            Err(ProcessingError::Interrupted) => {
                info!("interrupted while processing message");
                Err(Interrupted)
            }
        }
    }

    async fn try_process(&self, message: &RawMessage) -> Result<DispatchReport, ProcessingError> {
        trace!(stage = %ProcessingStage::Decoding, "decoding");
        let (payload, activity) = self.context.decoder().decode_message(message)?;

        trace!(stage = %ProcessingStage::Decoded, verb = %activity.verb, "decoded");
        trace!(stage = %ProcessingStage::Dispatching, "dispatching");
        let report = self
            .dispatcher
            .dispatch(Arc::new(payload), Arc::new(activity))
            .await?;
        Ok(report)
    }

    fn report(&self, stage: ProcessingStage, error: &dyn std::error::Error, message: &RawMessage) {
        self.context.error_reporter().capture(&ErrorReport::new(
            stage,
            error.to_string(),
            message.to_string(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogistikConfig;
    use crate::registry::{DispatchOutcome, HandlerEntry, HandlerError, HandlerRegistry};
    use crate::error::{LogistikError, LogistikResult};
    use crate::sinks::{CollectingErrorReporter, DroppedMessageLog, MemoryDroppedLog};
    use crate::stats::{InMemoryStats, DROPPED};

    fn processor(registry: HandlerRegistry) -> (MessageProcessor, Arc<CollectingErrorReporter>) {
        let reporter = Arc::new(CollectingErrorReporter::new());
        let context = Arc::new(
            PipelineContext::builder(LogistikConfig::default())
                .registry(registry)
                .dropped_log(Arc::new(MemoryDroppedLog::new()))
                .error_reporter(reporter.clone())
                .build(),
        );
        (MessageProcessor::new(context), reporter)
    }

    fn message(value: &str) -> RawMessage {
        RawMessage::new("activities", 0, 7, None, value.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_decode_failure_is_reported_and_skipped() {
        let (processor, reporter) = processor(HandlerRegistry::new());

        let outcome = processor.process_message(&message("{}")).await.unwrap();

        assert_eq!(outcome.stage(), ProcessingStage::DecodeFailed);
        assert!(matches!(outcome, MessageOutcome::DecodeFailed(ParseError::MissingVerb)));
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stage, ProcessingStage::Decoding);
        assert!(reports[0].message.starts_with("activities:0:7"));
    }

    #[tokio::test]
    async fn test_dispatch_fault_is_reported_and_skipped() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                "post",
                HandlerEntry::new("broken", |_, _| async { Err(HandlerError::fault("boom")) }),
            )
            .unwrap();
        let (processor, reporter) = processor(registry);

        let outcome = processor
            .process_message(&message(r#"{"verb":"post"}"#))
            .await
            .unwrap();

        assert_eq!(outcome.stage(), ProcessingStage::DispatchFailed);
        assert_eq!(reporter.reports()[0].stage, ProcessingStage::Dispatching);
    }

    #[tokio::test]
    async fn test_interruption_escapes() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                "post",
                HandlerEntry::new("stop", |_, _| async { Err(HandlerError::Interrupted) }),
            )
            .unwrap();
        let (processor, reporter) = processor(registry);

        let result = processor
            .process_message(&message(r#"{"verb":"post"}"#))
            .await;

        assert_eq!(result, Err(Interrupted));
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn test_successful_dispatch_completes() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(
                "post",
                HandlerEntry::from_sync("ok", |_, _| Ok(DispatchOutcome::ok())),
            )
            .unwrap();
        let (processor, reporter) = processor(registry);

        let outcome = processor
            .process_message(&message(r#"{"verb":"post","actor":"u1"}"#))
            .await
            .unwrap();

        assert_eq!(outcome.stage(), ProcessingStage::Done);
        assert!(!outcome.is_dropped());
        assert_eq!(outcome.report().unwrap().handler_reports().len(), 1);
        assert!(reporter.is_empty());
    }

    struct FailingDroppedLog;

    #[async_trait::async_trait]
    impl DroppedMessageLog for FailingDroppedLog {
        async fn append(&self, _payload: &serde_json::Value) -> LogistikResult<()> {
            Err(LogistikError::Sink("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_dropped_log_failure_still_counts_the_drop() {
        let reporter = Arc::new(CollectingErrorReporter::new());
        let stats = Arc::new(InMemoryStats::new());
        let context = Arc::new(
            PipelineContext::builder(LogistikConfig::default())
                .registry(HandlerRegistry::new())
                .dropped_log(Arc::new(FailingDroppedLog))
                .error_reporter(reporter.clone())
                .stats(stats.clone())
                .build(),
        );
        let processor = MessageProcessor::new(context.clone());

        let outcome = processor
            .process_message(&message(r#"{"verb":"unknown"}"#))
            .await
            .unwrap();

        assert_eq!(outcome.stage(), ProcessingStage::Done);
        assert!(outcome.is_dropped());
        assert_eq!(stats.counter(DROPPED), 1);
        assert_eq!(context.pipeline_stats().get_dropped(), 1);
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ProcessingStage::DecodeFailed.to_string(), "decode_failed");
        assert!(ProcessingStage::Done.is_terminal());
        assert!(!ProcessingStage::Dispatching.is_terminal());
    }
}
