//! # Configuration
//!
//! Layered configuration for the activity router: built-in defaults, then an
//! optional TOML file, then `LOGISTIK_*` environment variables.
//!
//! ```rust,no_run
//! use logistik::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let kafka = &manager.config().kafka;
//! println!("consuming {} from {:?}", kafka.topic, kafka.hosts);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::{OffsetReset, SubscriptionConfig};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{detect_environment, ConfigLoader, ConfigManager};

/// Default idle connection timeout: 9 minutes
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 9 * 60 * 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogistikConfig {
    pub service: ServiceConfig,
    pub kafka: KafkaConfig,
    pub dropped_log: DroppedLogConfig,
}

impl LogistikConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.service.validate()?;
        self.kafka.validate()?;
        Ok(())
    }

    /// Subscription parameters for this run, with a fresh group id
    pub fn subscription_config(&self) -> SubscriptionConfig {
        SubscriptionConfig::new(
            self.kafka.topic.clone(),
            self.kafka.group_id(&self.service.name),
        )
        .with_bootstrap_servers(self.kafka.hosts.clone())
        .with_idle_timeout(self.kafka.idle_timeout())
        .with_offset_reset(self.kafka.offset_reset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name, used as the consumer group prefix
    pub name: String,
    pub environment: String,
    /// Verbs the built-in logging handler is bound to
    pub log_verbs: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "logistik".to_string(),
            environment: "development".to_string(),
            log_verbs: Vec::new(),
        }
    }
}

impl ServiceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "service.name",
                "service configuration",
            ));
        }
        if self.log_verbs.iter().any(|verb| verb.trim().is_empty()) {
            return Err(ConfigurationError::invalid_value(
                "service.log_verbs",
                format!("{:?}", self.log_verbs),
                "verbs cannot be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Bootstrap servers, `host:port`
    pub hosts: Vec<String>,
    pub topic: String,
    pub idle_timeout_ms: u64,
    pub offset_reset: OffsetReset,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:9092".to_string()],
            topic: "activities".to_string(),
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            offset_reset: OffsetReset::default(),
        }
    }
}

impl KafkaConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.hosts.iter().all(|host| host.trim().is_empty()) {
            return Err(ConfigurationError::missing_required_field(
                "kafka.hosts",
                "kafka configuration",
            ));
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "kafka.topic",
                "kafka configuration",
            ));
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "kafka.idle_timeout_ms",
                "0",
                "idle timeout must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Unique consumer group for one run, so every instance sees the full stream
    pub fn group_id(&self, service_name: &str) -> String {
        format!("{}-{}", service_name, Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroppedLogConfig {
    /// JSON-lines file for dropped payloads; logged via tracing when unset
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LogistikConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kafka.idle_timeout(), Duration::from_secs(540));
        assert_eq!(config.kafka.offset_reset, OffsetReset::Latest);
        assert!(config.dropped_log.path.is_none());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = LogistikConfig::default();
        config.kafka.hosts.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequiredField { .. })
        ));

        let mut config = LogistikConfig::default();
        config.kafka.idle_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));

        let mut config = LogistikConfig::default();
        config.service.name = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_group_id_is_unique_per_call() {
        let kafka = KafkaConfig::default();
        let first = kafka.group_id("router");
        let second = kafka.group_id("router");

        assert!(first.starts_with("router-"));
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first["router-".len()..]).is_ok());
    }

    #[test]
    fn test_subscription_config_from_kafka_section() {
        let mut config = LogistikConfig::default();
        config.kafka.hosts = vec!["k1:9092".to_string(), "k2:9092".to_string()];
        config.kafka.offset_reset = OffsetReset::Earliest;

        let subscription = config.subscription_config();
        assert_eq!(subscription.topic, "activities");
        assert!(subscription.group_id.starts_with("logistik-"));
        assert_eq!(subscription.bootstrap_servers.len(), 2);
        assert!(subscription.auto_commit);
        assert_eq!(subscription.offset_reset, OffsetReset::Earliest);
    }
}
