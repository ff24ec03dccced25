//! Application settings.

use crate::dns::ResolverConfig;
use crate::error::{Error, Result};
use crate::icmp::{EchoConfig, MAX_PAYLOAD};
use crate::scanner::{HttpConfig, TcpConfig};
use serde::{Deserialize, Serialize};

/// Settings for every prober, as stored in `config.json`.
///
/// Every section and field is optional in the file; missing values take
/// the prober defaults.
///
/// ```json
/// {
///   "resolver": { "servers": ["1.1.1.1", "8.8.8.8"], "timeout_ms": 3000, "retries": 2 },
///   "echo": { "count": 5, "family": "v4" },
///   "tcp": { "connect_timeout_ms": 3000 },
///   "http": { "timeout_ms": 5000, "follow_redirects": false }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub echo: EchoConfig,
    #[serde(default)]
    pub tcp: TcpConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl AppConfig {
    /// Reject settings no probe could run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.resolver.servers.is_empty() {
            return Err(Error::config("resolver.servers must not be empty"));
        }
        if self.resolver.servers.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::config("resolver.servers contains an empty entry"));
        }
        if self.resolver.timeout.is_zero() {
            return Err(Error::config("resolver.timeout_ms must be positive"));
        }
        if self.echo.count == 0 {
            return Err(Error::config("echo.count must be at least 1"));
        }
        if self.echo.size > MAX_PAYLOAD {
            return Err(Error::config(format!(
                "echo.size must not exceed {MAX_PAYLOAD} bytes"
            )));
        }
        if self.echo.timeout.is_zero() {
            return Err(Error::config("echo.timeout_ms must be positive"));
        }
        if self.echo.ttl == 0 || self.echo.ttl > 255 {
            return Err(Error::config("echo.ttl must be between 1 and 255"));
        }
        if self.tcp.connect_timeout.is_zero() {
            return Err(Error::config("tcp.connect_timeout_ms must be positive"));
        }
        if self.http.timeout.is_zero() {
            return Err(Error::config("http.timeout_ms must be positive"));
        }
        if self.http.method.trim().is_empty() {
            return Err(Error::config("http.method must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"echo": {"count": 10}}"#).unwrap();
        assert_eq!(config.echo.count, 10);
        assert_eq!(config.echo.size, 56);
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.resolver.servers.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.echo.count = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.echo.size = MAX_PAYLOAD + 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.echo.ttl = 300;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.tcp.connect_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.http.method = " ".into();
        assert!(config.validate().is_err());
    }
}
