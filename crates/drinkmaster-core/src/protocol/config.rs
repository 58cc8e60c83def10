//! Transport configuration
//!
//! Settings can come from serde (a settings file handed over by the service)
//! or from the process environment, using the same variable names the
//! dispenser service has always used.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ConfigError, DEFAULT_BAUD_RATE, DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS};

/// Serial port name, e.g. `/dev/ttyUSB0` or `COM3`
pub const ENV_PORT: &str = "UART_PORT";
/// Baud rate
pub const ENV_BAUD: &str = "UART_BAUD";
/// Per-read timeout in seconds
pub const ENV_READ_TIMEOUT: &str = "UART_TIMEOUT";
/// Overall handshake deadline in seconds
pub const ENV_HANDSHAKE_TIMEOUT: &str = "UART_DONE_TIMEOUT";
/// Separate `received` window of the older two-window handshake; ignored
pub const ENV_LEGACY_RESPONSE_TIMEOUT: &str = "UART_RESPONSE_TIMEOUT";

/// Transport configuration as supplied by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Serial port name
    pub port_name: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Upper bound for one `read_line` call in milliseconds
    pub read_timeout_ms: u64,
    /// Deadline for the whole handshake in milliseconds
    pub handshake_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port_name: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }
}

/// Validated link parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Serial port name, trimmed and non-empty
    pub port_name: String,
    /// Baud rate, non-zero
    pub baud_rate: u32,
    /// Upper bound for one `read_line` call
    pub read_timeout: Duration,
    /// Deadline for the whole handshake
    pub handshake_timeout: Duration,
}

impl TransportConfig {
    /// Config for a given port with default timing
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: Some(port_name.into()),
            ..Self::default()
        }
    }

    /// Load from the process environment.
    ///
    /// A missing port is not reported here; it surfaces from
    /// [`TransportConfig::validate`] when a dispense is attempted.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source using the environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            port_name: lookup(ENV_PORT)
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            ..Self::default()
        };

        if let Some(raw) = lookup(ENV_BAUD) {
            config.baud_rate = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_BAUD, &raw, e))?;
        }
        if let Some(raw) = lookup(ENV_READ_TIMEOUT) {
            config.read_timeout_ms = parse_seconds(ENV_READ_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HANDSHAKE_TIMEOUT) {
            config.handshake_timeout_ms = parse_seconds(ENV_HANDSHAKE_TIMEOUT, &raw)?;
        }
        if lookup(ENV_LEGACY_RESPONSE_TIMEOUT).is_some() {
            debug!(
                "{} is set but ignored; {} bounds the whole handshake",
                ENV_LEGACY_RESPONSE_TIMEOUT, ENV_HANDSHAKE_TIMEOUT
            );
        }

        Ok(config)
    }

    /// Check that every required parameter is present and usable
    pub fn validate(&self) -> Result<LinkSettings, ConfigError> {
        let port_name = self
            .port_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPort)?;

        if self.baud_rate == 0 {
            return Err(ConfigError::invalid("baud_rate", "0", "must be positive"));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "read_timeout_ms",
                "0",
                "must be positive",
            ));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "handshake_timeout_ms",
                "0",
                "must be positive",
            ));
        }

        Ok(LinkSettings {
            port_name: port_name.to_string(),
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
        })
    }
}

/// Parse fractional seconds into whole milliseconds
fn parse_seconds(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(key, raw, e))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::invalid(key, raw, "must be a positive number of seconds"));
    }

    let millis = (secs * 1000.0).round();
    if millis < 1.0 {
        return Err(ConfigError::invalid(key, raw, "shorter than one millisecond"));
    }
    Ok(millis as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = TransportConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TransportConfig::default());
        assert_eq!(config.validate(), Err(ConfigError::MissingPort));
    }

    #[test]
    fn test_reads_all_variables() {
        let config = TransportConfig::from_lookup(lookup(&[
            (ENV_PORT, "/dev/ttyUSB0"),
            (ENV_BAUD, "9600"),
            (ENV_READ_TIMEOUT, "0.5"),
            (ENV_HANDSHAKE_TIMEOUT, "90"),
            (ENV_LEGACY_RESPONSE_TIMEOUT, "10"),
        ]))
        .unwrap();

        let settings = config.validate().unwrap();
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout, Duration::from_millis(500));
        assert_eq!(settings.handshake_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_blank_port_is_missing() {
        let config = TransportConfig::from_lookup(lookup(&[(ENV_PORT, "   ")])).unwrap();
        assert_eq!(config.port_name, None);
        assert_eq!(config.validate(), Err(ConfigError::MissingPort));
    }

    #[test]
    fn test_rejects_garbage_values() {
        let err = TransportConfig::from_lookup(lookup(&[(ENV_BAUD, "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_BAUD));

        let err =
            TransportConfig::from_lookup(lookup(&[(ENV_HANDSHAKE_TIMEOUT, "-3")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_baud_rejected_on_validate() {
        let config = TransportConfig {
            baud_rate: 0,
            ..TransportConfig::for_port("COM3")
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_deserialize_partial_settings() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"port_name": "/dev/ttyACM0", "handshake_timeout_ms": 5000}"#)
                .unwrap();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
        assert_eq!(config.handshake_timeout_ms, 5000);
    }
}
