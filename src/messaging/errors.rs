//! # Consumer Error Types
//!
//! Errors raised by broker providers. Any of these reaching the consume loop
//! is a connection-management fault and ends the run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsumerError {
    #[error("Subscription to topic {topic} failed: {reason}")]
    Subscription { topic: String, reason: String },

    #[error("Receive from topic {topic} failed: {message}")]
    Receive { topic: String, message: String },

    #[error("Invalid subscription configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ConsumerError {
    pub fn subscription(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Subscription {
            topic: topic.into(),
            reason: reason.into(),
        }
    }

    pub fn receive(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Receive {
            topic: topic.into(),
            message: message.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_error_display() {
        let err = ConsumerError::receive("activities", "broken pipe");
        assert_eq!(
            err.to_string(),
            "Receive from topic activities failed: broken pipe"
        );

        let err = ConsumerError::subscription("activities", "line source already consumed");
        assert!(err.to_string().contains("already consumed"));
    }
}
