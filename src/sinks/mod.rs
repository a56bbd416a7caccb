//! Outbound sinks used by the pipeline: the dropped-message log and the
//! error reporter.

pub mod dropped;
pub mod reporter;

pub use dropped::{
    DroppedMessageLog, JsonLinesDroppedLog, MemoryDroppedLog, TracingDroppedLog, DROPPED_TARGET,
};
pub use reporter::{CollectingErrorReporter, ErrorReport, ErrorReporter, TracingErrorReporter};
