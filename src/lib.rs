#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Logistik
//!
//! Activity router: consumes activity-stream events from a broker topic,
//! decodes each one and fans it out to the handlers registered for its verb.
//!
//! ## Pipeline
//!
//! ```text
//! broker ──► ConsumeLoop ──► MessageProcessor ──► ActivityDecoder
//!                                   │
//!                                   ▼
//!                              Dispatcher ──► handlers bound to the verb
//!                                   │
//!                                   └──► dropped-message log + `dropped` counter
//! ```
//!
//! Messages are processed strictly one at a time. A malformed message or a
//! failing handler never stops the loop; it stops on interruption, end of
//! stream or a broker receive fault.
//!
//! ## Module Organization
//!
//! - [`activity`] - Activity record model and decoder
//! - [`messaging`] - Broker traits, raw messages and providers
//! - [`registry`] - Handler entries and the verb-keyed registry
//! - [`dispatch`] - Verb-keyed fan-out to handlers
//! - [`pipeline`] - Shared context, message processing and the consume loop
//! - [`sinks`] - Dropped-message log and error reporting
//! - [`stats`] - Counters
//! - [`config`] - Layered configuration
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use logistik::config::LogistikConfig;
//! use logistik::messaging::InMemoryBroker;
//! use logistik::pipeline::{ConsumeLoop, PipelineContext};
//! use logistik::registry::{DispatchOutcome, HandlerEntry, HandlerRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = HandlerRegistry::new();
//! registry.register(
//!     "post",
//!     HandlerEntry::new("search-index", |_payload, activity| async move {
//!         Ok(DispatchOutcome::success(200, format!("indexed {}", activity.verb)))
//!     }),
//! )?;
//!
//! let context = Arc::new(
//!     PipelineContext::builder(LogistikConfig::default())
//!         .registry(registry)
//!         .build(),
//! );
//! let consume_loop = ConsumeLoop::new(context, Arc::new(InMemoryBroker::new()));
//! consume_loop.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod pipeline;
pub mod registry;
pub mod sinks;
pub mod stats;

pub use activity::{ActivityDecoder, ActivityObject, ActivityRecord, ParseError};
pub use crate::config::{ConfigManager, ConfigurationError, LogistikConfig};
pub use dispatch::{DispatchError, DispatchReport, Dispatcher, HandlerReport};
pub use error::{LogistikError, LogistikResult};
pub use messaging::{ConsumerError, MessageBroker, MessageConsumer, RawMessage};
pub use pipeline::{
    ConsumeLoop, MessageOutcome, MessageProcessor, PipelineContext, ProcessingError,
    ProcessingStage, StopReason,
};
pub use registry::{DispatchOutcome, HandlerEntry, HandlerError, HandlerRegistry};
pub use stats::{InMemoryStats, Stats, TimingSummary};
