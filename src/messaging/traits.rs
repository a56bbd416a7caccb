//! # Broker Traits
//!
//! The consumption contract the pipeline needs from a broker client: open a
//! subscription, then pull messages one at a time.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ConsumerError;
use super::message::RawMessage;

/// Where a consumer group with no committed position starts reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    Earliest,
    #[default]
    Latest,
}

/// Parameters for opening a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionConfig {
    pub topic: String,
    pub group_id: String,
    pub bootstrap_servers: Vec<String>,
    /// Idle connections are closed after this long
    pub idle_timeout: Duration,
    /// Offsets are committed as soon as a message is handed out
    pub auto_commit: bool,
    pub offset_reset: OffsetReset,
}

impl SubscriptionConfig {
    pub fn new(topic: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            group_id: group_id.into(),
            bootstrap_servers: Vec::new(),
            idle_timeout: Duration::from_secs(9 * 60),
            auto_commit: true,
            offset_reset: OffsetReset::default(),
        }
    }

    pub fn with_bootstrap_servers(mut self, servers: Vec<String>) -> Self {
        self.bootstrap_servers = servers;
        self
    }

    pub fn with_offset_reset(mut self, offset_reset: OffsetReset) -> Self {
        self.offset_reset = offset_reset;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConsumerError> {
        if self.topic.trim().is_empty() {
            return Err(ConsumerError::invalid_configuration("topic cannot be empty"));
        }
        if self.group_id.trim().is_empty() {
            return Err(ConsumerError::invalid_configuration(
                "group_id cannot be empty",
            ));
        }
        Ok(())
    }
}

/// An open subscription yielding messages in delivery order.
///
/// `recv` suspends until a message is available. `Ok(None)` means the stream
/// has ended and no further messages will arrive. Implementations must be
/// cancellation safe: dropping a pending `recv` future must not lose a message
/// that was never returned.
#[async_trait]
pub trait MessageConsumer: Send {
    async fn recv(&mut self) -> Result<Option<RawMessage>, ConsumerError>;

    fn topic(&self) -> &str;

    fn group_id(&self) -> &str;
}

/// A broker client able to open subscriptions
#[async_trait]
pub trait MessageBroker: Send + Sync + 'static {
    async fn subscribe(
        &self,
        config: &SubscriptionConfig,
    ) -> Result<Box<dyn MessageConsumer>, ConsumerError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
