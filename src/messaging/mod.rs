//! # Messaging Module
//!
//! Provider-agnostic broker consumption for the activity pipeline.
//!
//! ## Module Structure
//!
//! - `message` - `RawMessage`, the unit a broker delivers
//! - `traits` - `MessageBroker` / `MessageConsumer` and `SubscriptionConfig`
//! - `errors` - consumer error types
//! - `providers` - in-memory and line-delimited brokers

pub mod errors;
pub mod message;
pub mod providers;
pub mod traits;

pub use errors::ConsumerError;
pub use message::RawMessage;
pub use providers::{InMemoryBroker, InMemoryConsumer, LinesBroker, LinesConsumer};
pub use traits::{MessageBroker, MessageConsumer, OffsetReset, SubscriptionConfig};
