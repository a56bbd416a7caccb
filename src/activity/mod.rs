//! # Activities
//!
//! Activity-streams records and the decoder that produces them from broker
//! payloads.

pub mod decoder;
pub mod record;

pub use decoder::{ActivityDecoder, ParseError};
pub use record::{ActivityObject, ActivityRecord};
