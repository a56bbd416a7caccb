//! Crate-level error type.
//!
//! Each concern owns a focused `thiserror` enum (`ParseError`, `HandlerError`,
//! `ProcessingError`, `ConsumerError`, `ConfigurationError`); `LogistikError`
//! is what the public entry points return once those are folded together.

use thiserror::Error;

use crate::activity::ParseError;
use crate::config::ConfigurationError;
use crate::messaging::ConsumerError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum LogistikError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Consumer error: {0}")]
    Consumer(#[from] ConsumerError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Sink error: {0}")]
    Sink(String),
}

impl From<std::io::Error> for LogistikError {
    fn from(error: std::io::Error) -> Self {
        LogistikError::Sink(error.to_string())
    }
}

pub type LogistikResult<T> = Result<T, LogistikError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: LogistikError = RegistryError::EmptyVerb.into();
        assert_eq!(err.to_string(), "Registry error: verb cannot be empty");

        let err: LogistikError = ConsumerError::receive("activities", "connection reset").into();
        assert!(err.to_string().starts_with("Consumer error:"));
        assert!(err.to_string().contains("activities"));
    }
}
