//! ICMP probe types.

use crate::error::ProbeError;
use crate::serde_helpers::{display_opt, millis};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Default time to wait for each reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of echo requests per scan.
pub const DEFAULT_COUNT: u32 = 3;

/// Default payload size in bytes.
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

/// Default outgoing TTL / hop limit.
pub const DEFAULT_TTL: u32 = 64;

/// Largest echo payload that fits a single IPv4 datagram.
pub const MAX_PAYLOAD: usize = 65_507;

/// Address family of an echo session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    #[default]
    V4,
    V6,
}

impl IpFamily {
    /// Family of a concrete address.
    #[must_use]
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Check if `ip` belongs to this family.
    #[must_use]
    pub fn matches(self, ip: &IpAddr) -> bool {
        Self::of(ip) == self
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "ipv4"),
            Self::V6 => write!(f, "ipv6"),
        }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn default_size() -> usize {
    DEFAULT_PAYLOAD_SIZE
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// Echo prober configuration.
///
/// Raw ICMP sockets need root or `CAP_NET_RAW`; without them every scan
/// ends in [`ProbeError::Socket`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoConfig {
    /// Time to wait for each reply (default: 2s)
    #[serde(default = "default_timeout", rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Echo requests per scan (default: 3)
    #[serde(default = "default_count")]
    pub count: u32,
    /// Payload size in bytes (default: 56)
    #[serde(default = "default_size")]
    pub size: usize,
    /// Outgoing TTL or IPv6 hop limit (default: 64)
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Address family to resolve and probe (default: v4)
    #[serde(default)]
    pub family: IpFamily,
    /// Echo identifier; derived from the process id when absent
    #[serde(default)]
    pub identifier: Option<u16>,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            count: DEFAULT_COUNT,
            size: DEFAULT_PAYLOAD_SIZE,
            ttl: DEFAULT_TTL,
            family: IpFamily::V4,
            identifier: None,
        }
    }
}

impl EchoConfig {
    /// Set the per-reply timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of echo requests.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the payload size.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the outgoing TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Probe over IPv6.
    #[must_use]
    pub fn with_ipv6(mut self) -> Self {
        self.family = IpFamily::V6;
        self
    }

    /// Use a fixed echo identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// Result of one echo scan.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProbeResult {
    /// Resolved target address, absent when resolution failed
    pub ip: Option<IpAddr>,
    /// At least one matching reply arrived
    pub alive: bool,
    /// Average round-trip time over matched replies
    #[serde(rename = "rtt_ms", with = "millis")]
    pub rtt: Duration,
    /// Echo requests attempted
    pub sent: u32,
    /// Matching replies received
    pub received: u32,
    /// Lost requests as a percentage of `sent`
    pub loss: f64,
    /// Terminal error, if any
    #[serde(serialize_with = "display_opt")]
    pub error: Option<ProbeError>,
}

impl ProbeResult {
    /// Build a result from session counters.
    ///
    /// `received` is clamped to `sent`; `total_rtt` is the sum over matched
    /// replies.
    #[must_use]
    pub fn from_counts(ip: IpAddr, sent: u32, received: u32, total_rtt: Duration) -> Self {
        let received = received.min(sent);
        let rtt = if received > 0 {
            total_rtt / received
        } else {
            Duration::ZERO
        };
        let loss = if sent == 0 {
            0.0
        } else {
            f64::from(sent - received) / f64::from(sent) * 100.0
        };

        Self {
            ip: Some(ip),
            alive: received > 0,
            rtt,
            sent,
            received,
            loss,
            error: None,
        }
    }

    /// Create a failed result with no statistics.
    #[must_use]
    pub fn failure(ip: Option<IpAddr>, error: ProbeError) -> Self {
        Self {
            ip,
            alive: false,
            rtt: Duration::ZERO,
            sent: 0,
            received: 0,
            loss: 0.0,
            error: Some(error),
        }
    }

    /// Check if the scan finished without a terminal error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn test_partial_loss() {
        let result = ProbeResult::from_counts(localhost(), 5, 3, Duration::from_millis(30));
        assert!((result.loss - 40.0).abs() < f64::EPSILON);
        assert!(result.alive);
        assert_eq!(result.rtt, Duration::from_millis(10));
    }

    #[test]
    fn test_total_loss() {
        let result = ProbeResult::from_counts(localhost(), 5, 0, Duration::ZERO);
        assert!((result.loss - 100.0).abs() < f64::EPSILON);
        assert!(!result.alive);
        assert_eq!(result.rtt, Duration::ZERO);
    }

    #[test]
    fn test_received_never_exceeds_sent() {
        let result = ProbeResult::from_counts(localhost(), 2, 5, Duration::from_millis(4));
        assert_eq!(result.received, 2);
        assert!(result.loss.abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_sent_has_zero_loss() {
        let result = ProbeResult::from_counts(localhost(), 0, 0, Duration::ZERO);
        assert!(result.loss.abs() < f64::EPSILON);
        assert!(!result.alive);
    }

    #[test]
    fn test_failure_result() {
        let result = ProbeResult::failure(None, ProbeError::Resolve("no such host".into()));
        assert!(!result.alive);
        assert!(!result.is_success());
        assert_eq!(result.sent, 0);
    }

    #[test]
    fn test_echo_config_defaults() {
        let config = EchoConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.count, 3);
        assert_eq!(config.size, 56);
        assert_eq!(config.ttl, 64);
        assert_eq!(config.family, IpFamily::V4);
        assert_eq!(config.identifier, None);

        let parsed: EchoConfig = serde_json::from_str(r#"{"family": "v6", "count": 5}"#).unwrap();
        assert_eq!(parsed.family, IpFamily::V6);
        assert_eq!(parsed.count, 5);
        assert_eq!(parsed.size, 56);
    }

    #[test]
    fn test_family_matches() {
        assert!(IpFamily::V4.matches(&localhost()));
        assert!(IpFamily::V6.matches(&"::1".parse().unwrap()));
        assert!(!IpFamily::V6.matches(&localhost()));
    }
}
