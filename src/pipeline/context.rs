//! # Pipeline Context
//!
//! Everything the consume loop, processor and dispatcher share, built once at
//! startup and passed around behind an `Arc`.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::activity::ActivityDecoder;
use crate::config::{DroppedLogConfig, LogistikConfig};
use crate::error::LogistikResult;
use crate::registry::{HandlerEntry, HandlerRegistry, RegistryError};
use crate::sinks::{
    DroppedMessageLog, ErrorReporter, JsonLinesDroppedLog, TracingDroppedLog, TracingErrorReporter,
};
use crate::stats::{InMemoryStats, PipelineStats, Stats};

/// Shared collaborators of the pipeline
pub struct PipelineContext {
    config: LogistikConfig,
    registry: Arc<RwLock<HandlerRegistry>>,
    dropped_log: Arc<dyn DroppedMessageLog>,
    error_reporter: Arc<dyn ErrorReporter>,
    stats: Arc<dyn Stats>,
    pipeline_stats: Arc<PipelineStats>,
    decoder: ActivityDecoder,
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("service", &self.config.service.name)
            .field("topic", &self.config.kafka.topic)
            .field("pipeline_stats", &self.pipeline_stats)
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    pub fn builder(config: LogistikConfig) -> PipelineContextBuilder {
        PipelineContextBuilder::new(config)
    }

    /// Context with sinks chosen by configuration and an empty registry
    pub async fn from_config(config: LogistikConfig) -> LogistikResult<Self> {
        let dropped_log = dropped_log_from_config(&config.dropped_log).await?;
        Ok(Self::builder(config).dropped_log(dropped_log).build())
    }

    pub fn config(&self) -> &LogistikConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RwLock<HandlerRegistry>> {
        &self.registry
    }

    /// Bind a handler through the shared registry
    pub async fn register_handler(
        &self,
        verb: &str,
        entry: HandlerEntry,
    ) -> Result<(), RegistryError> {
        self.registry.write().await.register(verb, entry)
    }

    pub fn dropped_log(&self) -> &Arc<dyn DroppedMessageLog> {
        &self.dropped_log
    }

    pub fn error_reporter(&self) -> &Arc<dyn ErrorReporter> {
        &self.error_reporter
    }

    pub fn stats(&self) -> &Arc<dyn Stats> {
        &self.stats
    }

    pub fn pipeline_stats(&self) -> &Arc<PipelineStats> {
        &self.pipeline_stats
    }

    pub fn decoder(&self) -> &ActivityDecoder {
        &self.decoder
    }
}

/// File sink when a path is configured, tracing target otherwise
pub async fn dropped_log_from_config(
    config: &DroppedLogConfig,
) -> LogistikResult<Arc<dyn DroppedMessageLog>> {
    match &config.path {
        Some(path) => {
            let log = JsonLinesDroppedLog::open(path).await?;
            info!(path = %log.path().display(), "dropped messages go to file");
            Ok(Arc::new(log))
        }
        None => Ok(Arc::new(TracingDroppedLog)),
    }
}

pub struct PipelineContextBuilder {
    config: LogistikConfig,
    registry: Option<Arc<RwLock<HandlerRegistry>>>,
    dropped_log: Option<Arc<dyn DroppedMessageLog>>,
    error_reporter: Option<Arc<dyn ErrorReporter>>,
    stats: Option<Arc<dyn Stats>>,
}

impl PipelineContextBuilder {
    fn new(config: LogistikConfig) -> Self {
        Self {
            config,
            registry: None,
            dropped_log: None,
            error_reporter: None,
            stats: None,
        }
    }

    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(Arc::new(RwLock::new(registry)));
        self
    }

    /// Share a registry the caller keeps a handle to
    pub fn shared_registry(mut self, registry: Arc<RwLock<HandlerRegistry>>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn dropped_log(mut self, dropped_log: Arc<dyn DroppedMessageLog>) -> Self {
        self.dropped_log = Some(dropped_log);
        self
    }

    pub fn error_reporter(mut self, error_reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = Some(error_reporter);
        self
    }

    pub fn stats(mut self, stats: Arc<dyn Stats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn build(self) -> PipelineContext {
        PipelineContext {
            config: self.config,
            registry: self.registry.unwrap_or_default(),
            dropped_log: self
                .dropped_log
                .unwrap_or_else(|| Arc::new(TracingDroppedLog)),
            error_reporter: self
                .error_reporter
                .unwrap_or_else(|| Arc::new(TracingErrorReporter)),
            stats: self.stats.unwrap_or_else(|| Arc::new(InMemoryStats::new())),
            pipeline_stats: Arc::new(PipelineStats::new()),
            decoder: ActivityDecoder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DispatchOutcome;

    #[tokio::test]
    async fn test_builder_defaults() {
        let context = PipelineContext::builder(LogistikConfig::default()).build();

        assert!(context.registry().read().await.is_empty());
        assert_eq!(context.pipeline_stats().get_received(), 0);
        assert_eq!(context.config().kafka.topic, "activities");
    }

    #[tokio::test]
    async fn test_register_through_context() {
        let context = PipelineContext::builder(LogistikConfig::default()).build();
        context
            .register_handler(
                "post",
                HandlerEntry::from_sync("audit", |_, _| Ok(DispatchOutcome::ok())),
            )
            .await
            .unwrap();

        assert!(context.registry().read().await.contains_verb("post"));
    }

    #[tokio::test]
    async fn test_from_config_opens_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LogistikConfig::default();
        config.dropped_log.path = Some(dir.path().join("dropped.jsonl"));

        let context = PipelineContext::from_config(config).await.unwrap();
        context
            .dropped_log()
            .append(&serde_json::json!({"verb": "unknown"}))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(dir.path().join("dropped.jsonl")).unwrap();
        assert_eq!(contents.trim(), r#"{"verb":"unknown"}"#);
    }
}
