//! Configuration builder for flexible configuration loading

use crate::{Config, ConfigError, ConfigResult};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// Configuration builder for loading configuration from multiple sources
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add a configuration file source
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> ConfigResult<Config> {
        // Defaults form the base layer; files and env override it.
        let defaults = Config::default();
        let defaults_value = serde_yaml::to_value(&defaults)
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .separator(&self.env_separator)
                            .try_parsing(true),
                    );
                }
            }
        }

        let config = self.inner.build()?;
        let result: Config = config.try_deserialize()?;

        Self::validate(&result)?;

        Ok(result)
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Validate the configuration
    fn validate(config: &Config) -> ConfigResult<()> {
        if config.supervisor.heartbeat_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "Heartbeat timeout must be greater than 0",
            ));
        }

        if config.supervisor.heartbeat_timeout_secs <= config.heartbeat.interval_secs {
            return Err(ConfigError::validation(
                "Heartbeat timeout must be greater than the heartbeat interval",
            ));
        }

        if config.supervisor.check_interval_secs == 0 {
            return Err(ConfigError::validation(
                "Supervisor check interval must be greater than 0",
            ));
        }

        if config.heartbeat.interval_secs == 0 {
            return Err(ConfigError::validation(
                "Heartbeat interval must be greater than 0",
            ));
        }

        if config.target.max_filename_bytes < 16 {
            return Err(ConfigError::validation(
                "Maximum filename length must be at least 16 bytes",
            ));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&config.logging.level.as_str()) {
            return Err(ConfigError::validation(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relocp_types::VerifyMethod;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.verification.method, VerifyMethod::Hash);
        assert_eq!(config.supervisor.max_restarts, 3);
    }

    #[test]
    fn test_builder_yaml_file() {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            temp_file,
            r#"
verification:
  method: size
supervisor:
  max_restarts: 5
"#
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .add_source_file(temp_file.path())
            .build()
            .unwrap();

        assert_eq!(config.verification.method, VerifyMethod::Size);
        assert_eq!(config.supervisor.max_restarts, 5);
        // Unspecified fields keep defaults
        assert_eq!(config.heartbeat.interval_secs, 30);
    }

    #[test]
    fn test_builder_validation() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
supervisor:
  heartbeat_timeout_secs: 0
"#
        )
        .unwrap();

        let result = ConfigBuilder::new()
            .add_source_file(temp_file.path())
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Heartbeat timeout"));
    }

    #[test]
    fn test_timeout_must_exceed_interval() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
heartbeat:
  interval_secs: 120
supervisor:
  heartbeat_timeout_secs: 60
"#
        )
        .unwrap();

        let result = ConfigBuilder::new()
            .add_source_file(temp_file.path())
            .build();

        assert!(result.is_err());
    }
}
