//! # Activity Decoder
//!
//! Turns a broker payload into `(payload, ActivityRecord)`. Decoding is
//! all-or-nothing: either a complete record comes back or a `ParseError`
//! describing why the payload is not an activity.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::record::ActivityRecord;
use crate::messaging::RawMessage;

/// Reasons a payload cannot be decoded as an activity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("payload is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("activity has no verb")]
    MissingVerb,

    #[error("activity verb must be a non-empty string, got {found}")]
    InvalidVerb { found: String },

    #[error("payload does not match the activity shape: {reason}")]
    InvalidShape { reason: String },
}

impl ParseError {
    pub fn invalid_json(reason: impl Into<String>) -> Self {
        Self::InvalidJson {
            reason: reason.into(),
        }
    }

    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }
}

/// Decoder for activity-streams payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityDecoder;

impl ActivityDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode the value of a delivered message
    pub fn decode_message(&self, message: &RawMessage) -> Result<(Value, ActivityRecord), ParseError> {
        self.decode_bytes(&message.value)
    }

    /// Deserialize raw bytes as JSON, then validate them as an activity
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<(Value, ActivityRecord), ParseError> {
        let payload: Value = serde_json::from_slice(bytes).map_err(|e| {
            debug!(error = %e, "could not deserialize message value as JSON");
            ParseError::invalid_json(e.to_string())
        })?;

        self.decode_value(payload)
    }

    /// Validate an already-deserialized payload as an activity
    pub fn decode_value(&self, payload: Value) -> Result<(Value, ActivityRecord), ParseError> {
        let activity = parse_activity(&payload).map_err(|e| {
            debug!(error = %e, "could not parse message as activity stream");
            e
        })?;

        debug!(verb = %activity.verb, "decoded activity");
        Ok((payload, activity))
    }
}

fn parse_activity(payload: &Value) -> Result<ActivityRecord, ParseError> {
    let fields = payload.as_object().ok_or(ParseError::NotAnObject {
        found: json_type_name(payload),
    })?;

    match fields.get("verb") {
        None | Some(Value::Null) => return Err(ParseError::MissingVerb),
        Some(Value::String(verb)) if !verb.trim().is_empty() => {}
        Some(other) => {
            return Err(ParseError::InvalidVerb {
                found: other.to_string(),
            })
        }
    }

    serde_json::from_value(payload.clone()).map_err(|e| ParseError::invalid_shape(e.to_string()))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
