//! Accumulator configuration
//!
//! Settings can come from a TOML file or from the environment:
//!
//! ```toml
//! metric_expiration_ms = 300000
//! ```
//!
//! - `METRIC_EXPIRATION_MS`: how long a timeseries is served after its last
//!   update (default: 5 minutes)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default time a timeseries is served after it was last updated
pub const DEFAULT_METRIC_EXPIRATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccumulatorConfig {
    /// Duration for which a metric is served after it was updated
    #[serde(rename = "metric_expiration_ms", with = "duration_millis")]
    pub metric_expiration: Duration,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        AccumulatorConfig {
            metric_expiration: DEFAULT_METRIC_EXPIRATION,
        }
    }
}

impl AccumulatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let metric_expiration = std::env::var("METRIC_EXPIRATION_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_METRIC_EXPIRATION);

        AccumulatorConfig { metric_expiration }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AccumulatorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Configuration for tests (short expiration)
    pub fn test() -> Self {
        AccumulatorConfig {
            metric_expiration: Duration::from_secs(1),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metric_expiration.is_zero() {
            return Err(ConfigError::Invalid(
                "metric_expiration_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error type for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io(std::io::Error),
    /// Config file is not valid TOML for this schema
    Parse(toml::de::Error),
    /// A value is out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AccumulatorConfig::default();
        assert_eq!(config.metric_expiration, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = AccumulatorConfig::from_toml_str("metric_expiration_ms = 1500").unwrap();
        assert_eq!(config.metric_expiration, Duration::from_millis(1500));

        // Missing keys fall back to defaults
        let config = AccumulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, AccumulatorConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AccumulatorConfig::from_toml_str("metric_expiration_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AccumulatorConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AccumulatorConfig::from_toml_str("metric_expiration_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "metric_expiration_ms = 60000").unwrap();

        let config = AccumulatorConfig::load(file.path()).unwrap();
        assert_eq!(config.metric_expiration, Duration::from_secs(60));

        let missing = AccumulatorConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_toml_roundtrip_uses_millis() {
        let rendered = toml::to_string(&AccumulatorConfig::test()).unwrap();
        assert_eq!(rendered.trim(), "metric_expiration_ms = 1000");
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("METRIC_EXPIRATION_MS", "2500");
        assert_eq!(
            AccumulatorConfig::from_env().metric_expiration,
            Duration::from_millis(2500)
        );

        std::env::set_var("METRIC_EXPIRATION_MS", "not-a-number");
        assert_eq!(
            AccumulatorConfig::from_env().metric_expiration,
            DEFAULT_METRIC_EXPIRATION
        );
        std::env::remove_var("METRIC_EXPIRATION_MS");
    }
}
