//! DNS types and data structures.
//!
//! This module provides the resolver configuration and the result of
//! a single resolution walk.

use crate::error::ResolveError;
use crate::serde_helpers::{display_opt, millis};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

/// Default DNS server used when none is configured.
pub const DEFAULT_DNS_SERVER: &str = "114.114.114.114:53";

/// Port appended to server endpoints that do not carry one.
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Default timeout for a single query/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of extra rounds through the server pool.
pub const DEFAULT_RETRIES: u32 = 2;

fn default_servers() -> Vec<String> {
    vec![DEFAULT_DNS_SERVER.to_string()]
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

/// Resolver configuration.
///
/// Built once and handed to [`NameResolver::new`](super::NameResolver::new),
/// which normalizes the server endpoints. The resolver never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// DNS server endpoints, `host` or `host:port`, tried in order
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    /// Timeout for one exchange with one server (default: 5s)
    #[serde(default = "default_timeout", rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Extra rounds through the server pool after the first (default: 2)
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl ResolverConfig {
    /// Replace the server pool.
    #[must_use]
    pub fn with_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-exchange timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Append the default DNS port to an endpoint that lacks one.
///
/// Accepts bare IPv4/IPv6 addresses (bracketed or not), `host:port`
/// and plain host names.
///
/// # Example
///
/// ```
/// use netprobe::dns::with_default_port;
///
/// assert_eq!(with_default_port("8.8.8.8"), "8.8.8.8:53");
/// assert_eq!(with_default_port("::1"), "[::1]:53");
/// assert_eq!(with_default_port("dns.example:5353"), "dns.example:5353");
/// ```
#[must_use]
pub fn with_default_port(server: &str) -> String {
    let server = server.trim();
    if server.parse::<SocketAddr>().is_ok() {
        return server.to_string();
    }

    let bare = server.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return SocketAddr::new(ip, DEFAULT_DNS_PORT).to_string();
    }

    match server.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
            server.to_string()
        }
        _ => format!("{server}:{DEFAULT_DNS_PORT}"),
    }
}

/// Result of resolving one domain.
///
/// `aliases` keeps the CNAME chain in the order it was walked and `cname`
/// is its last element (empty without aliases). When neither address list
/// has an entry, `error` is set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolveResult {
    /// Fully-qualified domain under query
    pub domain: String,
    /// CNAME targets in chain order
    pub aliases: Vec<String>,
    /// Final CNAME target, empty when there is no alias
    pub cname: String,
    /// IPv4 addresses without duplicates, in answer order
    pub ipv4: Vec<Ipv4Addr>,
    /// IPv6 addresses without duplicates, in answer order
    pub ipv6: Vec<Ipv6Addr>,
    /// Wall time of the whole walk
    #[serde(rename = "elapsed_ms", with = "millis")]
    pub elapsed: Duration,
    /// Terminal error, if any
    #[serde(serialize_with = "display_opt")]
    pub error: Option<ResolveError>,
}

impl ResolveResult {
    pub(crate) fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            aliases: Vec::new(),
            cname: String::new(),
            ipv4: Vec::new(),
            ipv6: Vec::new(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub(crate) fn push_ipv4(&mut self, ip: Ipv4Addr) {
        if !self.ipv4.contains(&ip) {
            self.ipv4.push(ip);
        }
    }

    pub(crate) fn push_ipv6(&mut self, ip: Ipv6Addr) {
        if !self.ipv6.contains(&ip) {
            self.ipv6.push(ip);
        }
    }

    /// Check if the walk finished without a terminal error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Check if any address record was found.
    #[must_use]
    pub fn has_addresses(&self) -> bool {
        !self.ipv4.is_empty() || !self.ipv6.is_empty()
    }

    /// All addresses, IPv4 first.
    #[must_use]
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.ipv4
            .iter()
            .map(|ip| IpAddr::V4(*ip))
            .chain(self.ipv6.iter().map(|ip| IpAddr::V6(*ip)))
            .collect()
    }
}
