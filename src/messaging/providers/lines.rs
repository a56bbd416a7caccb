//! # Line-Delimited Broker
//!
//! Treats any async line source (stdin, a file, a socket) as a single-partition
//! topic: one payload per line, offset = line index. Blank lines are skipped
//! but still consume an offset. End of input ends the stream.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::messaging::errors::ConsumerError;
use crate::messaging::message::RawMessage;
use crate::messaging::traits::{MessageBroker, MessageConsumer, SubscriptionConfig};

/// Broker over a line source. The source can be subscribed to once.
pub struct LinesBroker<R> {
    reader: Mutex<Option<R>>,
}

impl<R> std::fmt::Debug for LinesBroker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinesBroker")
            .field("available", &self.reader.lock().is_some())
            .finish()
    }
}

impl<R> LinesBroker<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }
}

impl LinesBroker<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> MessageBroker for LinesBroker<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn subscribe(
        &self,
        config: &SubscriptionConfig,
    ) -> Result<Box<dyn MessageConsumer>, ConsumerError> {
        config.validate()?;

        let reader = self
            .reader
            .lock()
            .take()
            .ok_or_else(|| ConsumerError::subscription(&config.topic, "line source already consumed"))?;

        info!(
            topic = %config.topic,
            group_id = %config.group_id,
            "line-delimited subscription opened"
        );

        Ok(Box::new(LinesConsumer {
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
            lines: reader.lines(),
            next_offset: 0,
        }))
    }

    fn provider_name(&self) -> &'static str {
        "lines"
    }
}

/// Subscription over a line source
pub struct LinesConsumer<R> {
    topic: String,
    group_id: String,
    lines: Lines<R>,
    next_offset: i64,
}

#[async_trait]
impl<R> MessageConsumer for LinesConsumer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Result<Option<RawMessage>, ConsumerError> {
        loop {
            // `next_line` is cancellation safe.
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| ConsumerError::receive(&self.topic, e.to_string()))?;

            let Some(line) = line else {
                return Ok(None);
            };

            let offset = self.next_offset;
            self.next_offset += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Ok(Some(RawMessage::new(
                self.topic.clone(),
                0,
                offset,
                None,
                line.into_bytes(),
            )));
        }
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_become_messages() {
        let input: &[u8] = b"{\"verb\":\"post\"}\n\n{\"verb\":\"join\"}\n";
        let broker = LinesBroker::new(BufReader::new(input));
        let mut consumer = broker
            .subscribe(&SubscriptionConfig::new("stdin", "cli"))
            .await
            .unwrap();

        let first = consumer.recv().await.unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.value_text(), "{\"verb\":\"post\"}");

        let second = consumer.recv().await.unwrap().unwrap();
        assert_eq!(second.offset, 2);
        assert_eq!(second.topic, "stdin");

        assert!(consumer.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_source_can_only_be_subscribed_once() {
        let input: &[u8] = b"";
        let broker = LinesBroker::new(BufReader::new(input));
        let config = SubscriptionConfig::new("stdin", "cli");

        assert!(broker.subscribe(&config).await.is_ok());
        assert!(matches!(
            broker.subscribe(&config).await,
            Err(ConsumerError::Subscription { .. })
        ));
    }
}
