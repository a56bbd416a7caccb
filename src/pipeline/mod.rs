//! Message pipeline: shared context, per-message processing and the consume
//! loop that drives it.

pub mod consumer;
pub mod context;
pub mod processor;

pub use consumer::{shutdown_signal, ConsumeLoop, StopReason};
pub use context::{dropped_log_from_config, PipelineContext, PipelineContextBuilder};
pub use processor::{
    Interrupted, MessageOutcome, MessageProcessor, ProcessingError, ProcessingStage,
};
