//! Configuration management for the kstats agent

use kstats_core::Config as CoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration for the kstats agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Receiver, API, exporter and observability configuration
    #[serde(flatten)]
    pub core: CoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Show target in logs
    pub show_target: bool,

    /// Show thread IDs in logs
    pub show_thread_ids: bool,

    /// Show line numbers in logs
    pub show_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_line_numbers: false,
        }
    }
}

impl AgentConfig {
    /// Load configuration with precedence environment > file > defaults.
    ///
    /// The file is `path` when given, otherwise `KSTATS_CONFIG` or
    /// `./kstats.yaml` when present.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(kstats_core::Error::from)?);

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path.to_path_buf())),
            None => match std::env::var("KSTATS_CONFIG") {
                Ok(env_path) => builder.add_source(config::File::from(PathBuf::from(env_path))),
                Err(_) => builder.add_source(config::File::with_name("./kstats.yaml").required(false)),
            },
        };

        builder = builder.add_source(
            config::Environment::with_prefix("KSTATS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AgentConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| crate::AgentError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| crate::AgentError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| crate::AgentError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        self.core
            .validate()
            .map_err(|e| crate::AgentError::Config(format!("Core config validation failed: {}", e)))?;

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(crate::AgentError::Config(format!("Invalid log level: {}", self.logging.level))),
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            _ => return Err(crate::AgentError::Config(format!("Invalid log format: {}", self.logging.format))),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kstats_core::{AuthType, MetadataLabel};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.core.receiver.collection_interval_seconds, 10);
        assert!(config.core.k8s_api.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_agent_config_validation() {
        let mut config = AgentConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.core.receiver.kubelet.endpoint = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("kstats.yaml");

        let mut config = AgentConfig::default();
        config.core.receiver.extra_metadata_labels = vec![MetadataLabel::VolumeType];
        config.core.observability.enabled = true;
        config.logging.format = "json".to_string();

        config.to_file(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = AgentConfig::load(Some(config_path.as_path())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
receiver:
  collection_interval_seconds: 30
  kubelet:
    endpoint: "http://127.0.0.1:10255"
    auth_type: none
logging:
  level: debug
"#
        )
        .unwrap();

        let config = AgentConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.core.receiver.collection_interval_seconds, 30);
        assert_eq!(config.core.receiver.kubelet.auth_type, AuthType::None);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_load_applies_env_over_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "observability:\n  enabled: false").unwrap();

        std::env::set_var("KSTATS_OBSERVABILITY__ENABLED", "true");
        let config = AgentConfig::load(Some(file.path()));
        std::env::remove_var("KSTATS_OBSERVABILITY__ENABLED");

        assert!(config.unwrap().core.observability.enabled);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "receiver:\n  collection_interval_seconds: 0").unwrap();

        assert!(AgentConfig::load(Some(file.path())).is_err());
    }
}
