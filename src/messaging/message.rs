//! # Raw Broker Messages
//!
//! The unit a broker delivers to the consume loop. Messages are immutable once
//! delivered; the pipeline only ever borrows them.

use std::fmt;

use chrono::{DateTime, Utc};

/// A message as delivered by the broker, before any decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub partition: i32,
    /// Monotonic, unique per partition
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    /// Broker-side timestamp, when the provider has one
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawMessage {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        key: Option<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key,
            value: value.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Payload as text, lossy for non UTF-8 bytes
    pub fn value_text(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    pub fn key_text(&self) -> Option<String> {
        self.key
            .as_ref()
            .map(|k| String::from_utf8_lossy(k).into_owned())
    }

    /// `topic:partition:offset`
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.topic, self.partition, self.offset)
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: key={} value={}",
            self.coordinates(),
            self.key_text().as_deref().unwrap_or("None"),
            self.value_text()
        )
    }
}
