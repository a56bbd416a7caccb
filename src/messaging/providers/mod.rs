//! # Broker Providers
//!
//! - `in_memory`: topic log in process memory (tests, local development)
//! - `lines`: newline-delimited payloads from any async reader (stdin)

pub mod in_memory;
pub mod lines;

pub use in_memory::{InMemoryBroker, InMemoryConsumer};
pub use lines::{LinesBroker, LinesConsumer};
