//! # Handler Registry
//!
//! Verb-keyed table of activity handlers.
//!
//! ## Overview
//!
//! - **HandlerEntry**: a named async (or sync) function of `(payload, activity)`
//! - **DispatchOutcome**: `(success, status_code, message)` reported by a handler
//! - **HandlerRegistry**: verb → handlers in registration order
//!
//! Any number of independent handlers may be bound to a verb. The registry
//! owner builds it before the pipeline starts; the dispatcher takes a
//! read-only snapshot per dispatch.

pub mod handler;
pub mod handler_registry;

pub use handler::{
    ActivityHandler, DispatchOutcome, HandlerEntry, HandlerError, HandlerFuture, HandlerResult,
    STATUS_OK,
};
pub use handler_registry::{HandlerRegistry, RegistryError};
