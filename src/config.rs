//! scalewatch.toml configuration
//!
//! ```toml
//! [stabilizer]
//! tolerance_epsilon = 0.05
//! stability_threshold_ms = 2000
//! timer_policy = "hold_from_first_match"
//!
//! [transport]
//! channel = "pf/scale"
//! host = "192.168.1.20"   # discovered from the local IPv4 address when absent
//! port = 3000
//! client_id = "scalewatch"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{
    DEFAULT_CHANNEL, DEFAULT_CLIENT_ID, DEFAULT_PORT, DEFAULT_STABILITY_THRESHOLD_MS,
    DEFAULT_TOLERANCE_EPSILON,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub stabilizer: StabilizerConfig,
    pub transport: TransportConfig,
}

/// How a reading that matches its predecessor drives the stability timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPolicy {
    /// Start on the first match, keep running while readings match,
    /// clear on the first mismatch.
    #[default]
    HoldFromFirstMatch,
    /// Restart on every match and never clear on mismatch. This is how the
    /// original scale firmware listener behaved; with it a weight only
    /// settles when a differing reading arrives after a quiet period.
    RestartOnMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    pub tolerance_epsilon: f64,
    pub stability_threshold_ms: u64,
    pub timer_policy: TimerPolicy,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            tolerance_epsilon: DEFAULT_TOLERANCE_EPSILON,
            stability_threshold_ms: DEFAULT_STABILITY_THRESHOLD_MS,
            timer_policy: TimerPolicy::default(),
        }
    }
}

impl StabilizerConfig {
    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.stability_threshold_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub port: u16,
    pub client_id: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            host: None,
            port: DEFAULT_PORT,
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

impl ScaleConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScaleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the engine or transport cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let epsilon = self.stabilizer.tolerance_epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance_epsilon must be a finite non-negative number, got {epsilon}"
            )));
        }
        if self.transport.channel.trim().is_empty() {
            return Err(ConfigError::Invalid("channel must not be empty".to_string()));
        }
        if self.transport.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ScaleConfig::default();
        assert_eq!(config.stabilizer.tolerance_epsilon, 0.05);
        assert_eq!(config.stabilizer.stability_threshold(), Duration::from_secs(2));
        assert_eq!(config.stabilizer.timer_policy, TimerPolicy::HoldFromFirstMatch);
        assert_eq!(config.transport.channel, "pf/scale");
        assert_eq!(config.transport.host, None);
    }

    #[test]
    fn test_parse_partial() {
        let config = ScaleConfig::from_toml_str(
            r#"
[stabilizer]
tolerance_epsilon = 0.1
timer_policy = "restart_on_match"

[transport]
host = "10.0.0.5"
"#,
        )
        .unwrap();
        assert_eq!(config.stabilizer.tolerance_epsilon, 0.1);
        assert_eq!(config.stabilizer.stability_threshold_ms, 2000);
        assert_eq!(config.stabilizer.timer_policy, TimerPolicy::RestartOnMatch);
        assert_eq!(config.transport.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.transport.port, 3000);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = ScaleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScaleConfig::default());
    }

    #[test]
    fn test_negative_epsilon_rejected() {
        let err = ScaleConfig::from_toml_str("[stabilizer]\ntolerance_epsilon = -0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_blank_channel_rejected() {
        let err = ScaleConfig::from_toml_str("[transport]\nchannel = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = ScaleConfig::from_toml_str("[stabilizer]\ntimer_policy = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_render_and_reload() {
        let mut config = ScaleConfig::default();
        config.transport.host = Some("127.0.0.1".to_string());
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("[stabilizer]"));
        assert!(rendered.contains("hold_from_first_match"));
        assert_eq!(ScaleConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalewatch.toml");
        std::fs::write(&path, "[transport]\nchannel = \"lab/scale-2\"\n").unwrap();
        let config = ScaleConfig::from_file(&path).unwrap();
        assert_eq!(config.transport.channel, "lab/scale-2");
    }

    #[test]
    fn test_missing_file() {
        let err = ScaleConfig::from_file(Path::new("/nonexistent/scalewatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
