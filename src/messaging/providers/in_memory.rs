//! # In-Memory Broker
//!
//! Topic log kept in process memory, for tests and local development.
//!
//! ## Semantics
//!
//! - **Partitions**: messages are assigned a partition by key hash (keyless
//!   messages go to partition 0) and get a per-partition monotonic offset
//! - **Consumer groups**: each group id owns one committed position per topic;
//!   consumers sharing a group share that position, distinct groups each see
//!   the full stream
//! - **Auto-commit**: the position advances as soon as a message is handed out
//! - **Close**: closing a topic ends every subscription once it has drained

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::messaging::errors::ConsumerError;
use crate::messaging::message::RawMessage;
use crate::messaging::traits::{MessageBroker, MessageConsumer, OffsetReset, SubscriptionConfig};

#[derive(Debug)]
struct TopicState {
    messages: Vec<RawMessage>,
    next_offsets: Vec<i64>,
    group_positions: HashMap<String, usize>,
    closed: bool,
}

impl TopicState {
    fn new(partitions: usize) -> Self {
        Self {
            messages: Vec::new(),
            next_offsets: vec![0; partitions],
            group_positions: HashMap::new(),
            closed: false,
        }
    }
}

#[derive(Debug)]
struct TopicLog {
    state: Mutex<TopicState>,
    notify: Notify,
}

impl TopicLog {
    fn new(partitions: usize) -> Self {
        Self {
            state: Mutex::new(TopicState::new(partitions)),
            notify: Notify::new(),
        }
    }
}

/// In-memory broker
///
/// ```rust
/// use logistik::messaging::{
///     InMemoryBroker, MessageBroker, MessageConsumer, OffsetReset, SubscriptionConfig,
/// };
///
/// # tokio_test::block_on(async {
/// let broker = InMemoryBroker::new();
/// broker.publish("activities", None, r#"{"verb":"post"}"#);
///
/// let config = SubscriptionConfig::new("activities", "router-a")
///     .with_offset_reset(OffsetReset::Earliest);
/// let mut consumer = broker.subscribe(&config).await.unwrap();
///
/// let message = consumer.recv().await.unwrap().unwrap();
/// assert_eq!(message.offset, 0);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    topics: Arc<Mutex<HashMap<String, Arc<TopicLog>>>>,
    partitions: usize,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_partitions(1)
    }

    pub fn with_partitions(partitions: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            partitions: partitions.max(1),
        }
    }

    fn topic_log(&self, topic: &str) -> Arc<TopicLog> {
        let mut topics = self.topics.lock();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TopicLog::new(self.partitions)))
            .clone()
    }

    fn partition_for(&self, key: Option<&[u8]>) -> usize {
        match key {
            None => 0,
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % self.partitions as u64) as usize
            }
        }
    }

    /// Append a message to a topic, returning its `(partition, offset)`
    pub fn publish(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        value: impl Into<Vec<u8>>,
    ) -> (i32, i64) {
        let partition = self.partition_for(key);
        let log = self.topic_log(topic);

        let coordinates = {
            let mut state = log.state.lock();
            let offset = state.next_offsets[partition];
            state.next_offsets[partition] += 1;

            let message = RawMessage::new(
                topic,
                partition as i32,
                offset,
                key.map(<[u8]>::to_vec),
                value,
            )
            .with_timestamp(Utc::now());
            state.messages.push(message);
            (partition as i32, offset)
        };

        log.notify.notify_waiters();
        coordinates
    }

    /// Serialize a JSON value and publish it
    pub fn publish_json(&self, topic: &str, key: Option<&[u8]>, value: &serde_json::Value) -> (i32, i64) {
        self.publish(topic, key, value.to_string())
    }

    /// End the stream for every subscriber of a topic once drained
    pub fn close(&self, topic: &str) {
        let log = self.topic_log(topic);
        log.state.lock().closed = true;
        log.notify.notify_waiters();
        debug!(topic = %topic, "in-memory topic closed");
    }

    /// Committed position of a consumer group, if it has subscribed
    pub fn committed_position(&self, topic: &str, group_id: &str) -> Option<usize> {
        let log = self.topics.lock().get(topic).cloned()?;
        let position = log.state.lock().group_positions.get(group_id).copied();
        position
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn subscribe(
        &self,
        config: &SubscriptionConfig,
    ) -> Result<Box<dyn MessageConsumer>, ConsumerError> {
        config.validate()?;

        let log = self.topic_log(&config.topic);
        {
            let mut state = log.state.lock();
            let start = match config.offset_reset {
                OffsetReset::Earliest => 0,
                OffsetReset::Latest => state.messages.len(),
            };
            state
                .group_positions
                .entry(config.group_id.clone())
                .or_insert(start);
        }

        info!(
            topic = %config.topic,
            group_id = %config.group_id,
            offset_reset = ?config.offset_reset,
            "in-memory subscription opened"
        );

        Ok(Box::new(InMemoryConsumer {
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
            log,
        }))
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

/// Subscription handed out by `InMemoryBroker`
#[derive(Debug)]
pub struct InMemoryConsumer {
    topic: String,
    group_id: String,
    log: Arc<TopicLog>,
}

enum Poll {
    Ready(RawMessage),
    Ended,
    Pending,
}

impl InMemoryConsumer {
    fn poll_next(&self) -> Poll {
        let mut state = self.log.state.lock();
        let position = state.group_positions.get(&self.group_id).copied().unwrap_or(0);

        if let Some(message) = state.messages.get(position).cloned() {
            state.group_positions.insert(self.group_id.clone(), position + 1);
            return Poll::Ready(message);
        }

        if state.closed {
            Poll::Ended
        } else {
            Poll::Pending
        }
    }
}

#[async_trait]
impl MessageConsumer for InMemoryConsumer {
    async fn recv(&mut self) -> Result<Option<RawMessage>, ConsumerError> {
        loop {
            // Register interest before checking so a publish between the
            // check and the await is not missed.
            let notified = self.log.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.poll_next() {
                Poll::Ready(message) => return Ok(Some(message)),
                Poll::Ended => return Ok(None),
                Poll::Pending => notified.await,
            }
        }
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }
}
