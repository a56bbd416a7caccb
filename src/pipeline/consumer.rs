//! # Consume Loop
//!
//! Pulls messages from a broker subscription and processes them one at a
//! time. Each run joins under a fresh consumer group (`<service>-<uuid>`) so
//! every instance sees the whole stream.
//!
//! The loop stops when:
//! - the shutdown future resolves while waiting for the next message
//! - a handler requests interruption
//! - the subscription reports end of stream
//! - the broker returns a receive error (the only case that is an `Err`)

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::error::LogistikResult;
use crate::messaging::{MessageBroker, MessageConsumer};
use crate::pipeline::{MessageProcessor, PipelineContext};

/// Why a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Interrupted,
    EndOfStream,
}

/// Sequential consume loop over one subscription
pub struct ConsumeLoop {
    context: Arc<PipelineContext>,
    broker: Arc<dyn MessageBroker>,
    processor: MessageProcessor,
}

impl std::fmt::Debug for ConsumeLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumeLoop")
            .field("provider", &self.broker.provider_name())
            .field("context", &self.context)
            .finish()
    }
}

impl ConsumeLoop {
    pub fn new(context: Arc<PipelineContext>, broker: Arc<dyn MessageBroker>) -> Self {
        Self {
            processor: MessageProcessor::new(context.clone()),
            context,
            broker,
        }
    }

    /// Run until Ctrl+C / SIGTERM, end of stream or a broker fault
    pub async fn run(&self) -> LogistikResult<StopReason> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, end of stream or a broker fault.
    ///
    /// `shutdown` is only observed while waiting for the next message; a
    /// message already being processed is finished first.
    pub async fn run_until<F>(&self, shutdown: F) -> LogistikResult<StopReason>
    where
        F: Future<Output = ()> + Send,
    {
        let subscription = self.context.config().subscription_config();

        info!(
            provider = %self.broker.provider_name(),
            bootstrap_servers = ?subscription.bootstrap_servers,
            "bootstrapping on {}",
            subscription.bootstrap_servers.join(",")
        );
        info!(topic = %subscription.topic, "consuming from topic {}", subscription.topic);
        info!(group_id = %subscription.group_id, "using group id {}", subscription.group_id);

        let mut consumer = self.broker.subscribe(&subscription).await.map_err(|e| {
            error!(error = %e, "could not open subscription");
            e
        })?;

        let reason = self.consume(&mut *consumer, shutdown).await?;

        let stats = self.context.pipeline_stats();
        info!(
            reason = ?reason,
            received = stats.get_received(),
            processed = stats.get_processed(),
            parse_failures = stats.get_parse_failures(),
            dispatch_failures = stats.get_dispatch_failures(),
            dropped = stats.get_dropped(),
            "consume loop stopped"
        );
        Ok(reason)
    }

    async fn consume<F>(
        &self,
        consumer: &mut dyn MessageConsumer,
        shutdown: F,
    ) -> LogistikResult<StopReason>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("interrupted, shutting down");
                    return Ok(StopReason::Interrupted);
                }
                received = consumer.recv() => received,
            };

            let message = match received {
                Ok(Some(message)) => message,
                Ok(None) => {
                    warn!(topic = %consumer.topic(), "subscription exhausted, stopping");
                    return Ok(StopReason::EndOfStream);
                }
                Err(e) => {
                    error!(topic = %consumer.topic(), error = %e, "receive failed");
                    return Err(e.into());
                }
            };

            self.context
                .pipeline_stats()
                .received
                .fetch_add(1, Ordering::Relaxed);
            debug!("{}", message);

            if self.processor.process_message(&message).await.is_err() {
                info!("interrupted, shutting down");
                return Ok(StopReason::Interrupted);
            }
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
