//! TCP connect probe.
//!
//! Connects to `target:port`, measures how long the handshake took and
//! passively reads whatever banner the service volunteers.

use crate::error::{Error, Result};
use crate::serde_helpers::millis;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default connection timeout (3 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default time to wait for a banner after connecting.
pub const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_secs(1);

/// Most banner bytes read.
const BANNER_LIMIT: usize = 512;

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_banner_timeout() -> Duration {
    DEFAULT_BANNER_TIMEOUT
}

/// Configuration for the TCP probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TcpConfig {
    /// Connection timeout (default: 3s)
    #[serde(
        default = "default_connect_timeout",
        rename = "connect_timeout_ms",
        with = "millis"
    )]
    pub connect_timeout: Duration,
    /// Banner wait after connecting (default: 1s)
    #[serde(
        default = "default_banner_timeout",
        rename = "banner_timeout_ms",
        with = "millis"
    )]
    pub banner_timeout: Duration,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
        }
    }
}

impl TcpConfig {
    /// Set the connection timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Outcome of one TCP probe.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TcpProbeResult {
    /// Time spent connecting (or until the connect failed)
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
    /// The handshake completed
    pub open: bool,
    /// Text the service sent unprompted
    pub banner: Option<String>,
}

/// TCP connect probe.
#[derive(Debug, Clone, Default)]
pub struct TcpProbe {
    config: TcpConfig,
}

impl TcpProbe {
    #[must_use]
    pub fn new(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Probe `target:port`.
    ///
    /// A refused or timed-out connection is a normal `open = false`
    /// outcome; only an unresolvable target is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] when the target cannot be resolved.
    pub async fn probe(&self, target: &str, port: u16) -> Result<TcpProbeResult> {
        let host = target.trim_start_matches('[').trim_end_matches(']');
        let start = Instant::now();
        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| Error::network(format!("resolve {host}: {e}")))?
            .next()
            .ok_or_else(|| Error::network(format!("no address for {host}")))?;

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::debug!(%addr, error = %e, "TCP connect failed");
                return Ok(closed(start.elapsed()));
            }
            Err(_) => {
                tracing::debug!(%addr, timeout_ms = self.config.connect_timeout.as_millis(), "TCP connect timed out");
                return Ok(closed(start.elapsed()));
            }
        };
        let duration = start.elapsed();

        let banner = self.read_banner(stream).await;
        Ok(TcpProbeResult {
            duration,
            open: true,
            banner,
        })
    }

    async fn read_banner(&self, mut stream: TcpStream) -> Option<String> {
        let mut buf = vec![0u8; BANNER_LIMIT];
        let len = match timeout(self.config.banner_timeout, stream.read(&mut buf)).await {
            Ok(Ok(len)) => len,
            _ => return None,
        };
        let banner = String::from_utf8_lossy(&buf[..len]).trim().to_string();
        (!banner.is_empty()).then_some(banner)
    }
}

fn closed(duration: Duration) -> TcpProbeResult {
    TcpProbeResult {
        duration,
        open: false,
        banner: None,
    }
}
