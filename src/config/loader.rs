//! Configuration Loader
//!
//! Merges defaults, an optional TOML file and `LOGISTIK_*` environment
//! variables (`__` separates nesting levels, e.g. `LOGISTIK_KAFKA__TOPIC`).

use std::env;
use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat, Map};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::LogistikConfig;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_VAR: &str = "LOGISTIK_CONFIG";
/// File read when present and no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "config/logistik.toml";
pub const ENV_PREFIX: &str = "LOGISTIK";

/// LOGISTIK_ENV || ENVIRONMENT || 'development'
pub fn detect_environment() -> String {
    env::var("LOGISTIK_ENV")
        .or_else(|_| env::var("ENVIRONMENT"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "development".to_string())
}

/// Loaded, validated configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: LogistikConfig,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from `LOGISTIK_CONFIG` (required) or `config/logistik.toml` (optional)
    pub fn load() -> ConfigResult<Self> {
        let loader = match env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => ConfigLoader::new().with_file(path),
            _ => ConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
        };
        loader.load()
    }

    pub fn config(&self) -> &LogistikConfig {
        &self.config
    }

    pub fn into_config(self) -> LogistikConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.config.service.environment
    }

    /// File the configuration was read from, if one was found
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

/// Builder over the configuration sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    file_required: bool,
    environment: String,
    env_vars: Option<Map<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            file_required: false,
            environment: detect_environment(),
            env_vars: None,
        }
    }

    /// Read this file; loading fails if it is missing
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = true;
        self
    }

    /// Read this file if it exists
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self.file_required = false;
        self
    }

    /// Environment name used as the `service.environment` default
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Use these variables instead of the process environment
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn load(self) -> ConfigResult<ConfigManager> {
        let mut defaults = LogistikConfig::default();
        defaults.service.environment = self.environment.clone();

        let mut builder = Config::builder().add_source(Config::try_from(&defaults)?);

        let mut source_file = None;
        if let Some(path) = &self.file {
            if path.is_file() {
                source_file = Some(path.clone());
            } else if self.file_required {
                return Err(ConfigurationError::config_file_not_found(path.clone()));
            }
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(self.file_required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("kafka.hosts")
                .with_list_parse_key("service.log_verbs")
                .try_parsing(true)
                .source(self.env_vars),
        );

        let config: LogistikConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %config.service.environment,
            file = ?source_file,
            "configuration sources merged"
        );
        info!(
            service = %config.service.name,
            environment = %config.service.environment,
            topic = %config.kafka.topic,
            hosts = ?config.kafka.hosts,
            "Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            source_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::OffsetReset;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_defaults_without_file() {
        let manager = ConfigLoader::new()
            .with_optional_file("/nonexistent/logistik.toml")
            .with_environment("test")
            .with_env_vars(no_env())
            .load()
            .unwrap();

        assert!(manager.source_file().is_none());
        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().kafka.topic, "activities");
    }

    #[test]
    fn test_required_file_must_exist() {
        let result = ConfigLoader::new()
            .with_file("/nonexistent/logistik.toml")
            .with_env_vars(no_env())
            .load();

        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let file = toml_file(
            r#"
[service]
name = "activity-router"
log_verbs = ["post", "join"]

[kafka]
hosts = ["k1:9092", "k2:9092"]
topic = "community-events"
offset_reset = "earliest"

[dropped_log]
path = "/var/log/logistik/dropped.jsonl"
"#,
        );

        let manager = ConfigLoader::new()
            .with_file(file.path())
            .with_env_vars(no_env())
            .load()
            .unwrap();
        let config = manager.config();

        assert_eq!(manager.source_file(), Some(file.path()));
        assert_eq!(config.service.name, "activity-router");
        assert_eq!(config.service.log_verbs, vec!["post", "join"]);
        assert_eq!(config.kafka.hosts, vec!["k1:9092", "k2:9092"]);
        assert_eq!(config.kafka.topic, "community-events");
        assert_eq!(config.kafka.offset_reset, OffsetReset::Earliest);
        assert_eq!(config.kafka.idle_timeout_ms, crate::config::DEFAULT_IDLE_TIMEOUT_MS);
        assert_eq!(
            config.dropped_log.path.as_deref(),
            Some(Path::new("/var/log/logistik/dropped.jsonl"))
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("[kafka]\ntopic = \"from-file\"\n");

        let manager = ConfigLoader::new()
            .with_file(file.path())
            .with_env_vars([
                ("LOGISTIK_KAFKA__TOPIC", "from-env"),
                ("LOGISTIK_KAFKA__HOSTS", "a:9092,b:9092"),
                ("LOGISTIK_KAFKA__IDLE_TIMEOUT_MS", "1000"),
                ("LOGISTIK_SERVICE__NAME", "router-env"),
            ])
            .load()
            .unwrap();
        let config = manager.config();

        assert_eq!(config.kafka.topic, "from-env");
        assert_eq!(config.kafka.hosts, vec!["a:9092", "b:9092"]);
        assert_eq!(config.kafka.idle_timeout_ms, 1000);
        assert_eq!(config.service.name, "router-env");
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = toml_file("[kafka]\nidle_timeout_ms = 0\n");

        let result = ConfigLoader::new()
            .with_file(file.path())
            .with_env_vars(no_env())
            .load();

        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_toml_is_a_load_error() {
        let file = toml_file("[kafka\ntopic = ");

        let result = ConfigLoader::new()
            .with_file(file.path())
            .with_env_vars(no_env())
            .load();

        assert!(matches!(result, Err(ConfigurationError::LoadError { .. })));
    }
}
