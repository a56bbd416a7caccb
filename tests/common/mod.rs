//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use logistik::config::LogistikConfig;
use logistik::messaging::{
    ConsumerError, InMemoryBroker, MessageBroker, MessageConsumer, OffsetReset, RawMessage,
    SubscriptionConfig,
};
use logistik::pipeline::{ConsumeLoop, PipelineContext};
use logistik::registry::{DispatchOutcome, HandlerEntry, HandlerRegistry};
use logistik::sinks::{CollectingErrorReporter, MemoryDroppedLog};
use logistik::stats::InMemoryStats;

pub const TOPIC: &str = "activities";

/// Names of handlers in the order they were invoked
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Handler that records its name and returns a fixed outcome
pub fn recording_handler(name: &str, calls: &CallLog, outcome: DispatchOutcome) -> HandlerEntry {
    let calls = calls.clone();
    let label = name.to_string();
    HandlerEntry::from_sync(name, move |_payload, _activity| {
        calls.lock().push(label.clone());
        Ok(outcome.clone())
    })
}

/// Config that reads topics from the beginning, so tests can publish before
/// the loop subscribes
pub fn test_config() -> LogistikConfig {
    let mut config = LogistikConfig::default();
    config.service.name = "logistik-test".to_string();
    config.service.environment = "test".to_string();
    config.kafka.topic = TOPIC.to_string();
    config.kafka.offset_reset = OffsetReset::Earliest;
    config
}

/// In-memory broker plus a context wired to inspectable sinks
pub struct Harness {
    pub broker: InMemoryBroker,
    pub context: Arc<PipelineContext>,
    pub dropped: Arc<MemoryDroppedLog>,
    pub reporter: Arc<CollectingErrorReporter>,
    pub stats: Arc<InMemoryStats>,
}

impl Harness {
    pub fn new(registry: HandlerRegistry) -> Self {
        let dropped = Arc::new(MemoryDroppedLog::new());
        let reporter = Arc::new(CollectingErrorReporter::new());
        let stats = Arc::new(InMemoryStats::new());

        let context = Arc::new(
            PipelineContext::builder(test_config())
                .registry(registry)
                .dropped_log(dropped.clone())
                .error_reporter(reporter.clone())
                .stats(stats.clone())
                .build(),
        );

        Self {
            broker: InMemoryBroker::new(),
            context,
            dropped,
            reporter,
            stats,
        }
    }

    pub fn publish(&self, payload: &str) {
        self.broker.publish(TOPIC, None, payload);
    }

    pub fn publish_json(&self, payload: &Value) {
        self.broker.publish_json(TOPIC, None, payload);
    }

    pub fn consume_loop(&self) -> ConsumeLoop {
        ConsumeLoop::new(self.context.clone(), Arc::new(self.broker.clone()))
    }
}

/// Broker whose consumers fail on the first receive
#[derive(Debug, Default)]
pub struct FailingBroker;

struct FailingConsumer {
    topic: String,
    group_id: String,
}

#[async_trait]
impl MessageConsumer for FailingConsumer {
    async fn recv(&mut self) -> Result<Option<RawMessage>, ConsumerError> {
        Err(ConsumerError::receive(&self.topic, "connection reset by peer"))
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }
}

#[async_trait]
impl MessageBroker for FailingBroker {
    async fn subscribe(
        &self,
        config: &SubscriptionConfig,
    ) -> Result<Box<dyn MessageConsumer>, ConsumerError> {
        Ok(Box::new(FailingConsumer {
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
        }))
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}
