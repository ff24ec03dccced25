//! Scanner registry.
//!
//! Binds a target to a thin scan object whose `scan` runs the underlying
//! prober once and condenses its result into a dashboard summary. A
//! terminal prober error is returned unchanged instead of a summary.

use crate::config::AppConfig;
use crate::dns::{NameResolver, ResolveResult, ResolverConfig};
use crate::error::{Error, Result};
use crate::icmp::{EchoConfig, EchoProber};
use crate::scanner::http::{HttpCheck, HttpConfig};
use crate::scanner::tcp::{TcpConfig, TcpProbe};
use crate::serde_helpers::millis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Resolver timeout used by dashboard DNS scans.
pub const DNS_SCAN_TIMEOUT: Duration = Duration::from_secs(3);

/// Echo requests per dashboard ICMP scan.
pub const ICMP_SCAN_COUNT: u32 = 5;

/// Request timeout used by dashboard web scans.
pub const WEB_SCAN_TIMEOUT: Duration = Duration::from_secs(5);

/// Factory for scan objects sharing one set of prober settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerRegistry {
    resolver: ResolverConfig,
    echo: EchoConfig,
    tcp: TcpConfig,
    http: HttpConfig,
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default().with_timeout(DNS_SCAN_TIMEOUT),
            echo: EchoConfig::default().with_count(ICMP_SCAN_COUNT),
            tcp: TcpConfig::default(),
            http: HttpConfig::default().with_timeout(WEB_SCAN_TIMEOUT),
        }
    }
}

impl ScannerRegistry {
    /// Build a registry from loaded settings.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            resolver: config.resolver.clone(),
            echo: config.echo.clone(),
            tcp: config.tcp.clone(),
            http: config.http.clone(),
        }
    }

    /// DNS scan of `domain`, matched against `expected`.
    #[must_use]
    pub fn dns(&self, domain: impl Into<String>, expected: impl Into<String>) -> DnsScanner {
        DnsScanner {
            domain: domain.into(),
            expected: expected.into(),
            config: self.resolver.clone(),
        }
    }

    /// ICMP scan of `target`.
    #[must_use]
    pub fn icmp(&self, target: impl Into<String>) -> IcmpScanner {
        IcmpScanner {
            target: target.into(),
            config: self.echo.clone(),
        }
    }

    /// TCP scan of `target:port`.
    #[must_use]
    pub fn tcp(&self, target: impl Into<String>, port: u16) -> TcpScanner {
        TcpScanner {
            target: target.into(),
            port,
            config: self.tcp.clone(),
        }
    }

    /// HTTP scan of `url`.
    #[must_use]
    pub fn web(&self, url: impl Into<String>) -> WebScanner {
        WebScanner {
            url: url.into(),
            config: self.http.clone(),
        }
    }
}

/// Dashboard view of a DNS scan.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DnsScanSummary {
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    pub a_records: Vec<Ipv4Addr>,
    pub aaaa_records: Vec<Ipv6Addr>,
    pub cname: String,
    /// The expected value is one of the addresses or the final CNAME
    pub matched: bool,
    pub checked_at: DateTime<Utc>,
}

/// Dashboard view of an ICMP scan.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IcmpScanSummary {
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    pub alive: bool,
    pub loss: f64,
    pub checked_at: DateTime<Utc>,
}

/// Dashboard view of a TCP scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TcpScanSummary {
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    pub open: bool,
    pub banner: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Dashboard view of a web scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebScanSummary {
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
    pub accessible: bool,
    pub status: u16,
    pub title: String,
    pub checked_at: DateTime<Utc>,
}

/// DNS scan bound to one domain and its expected value.
#[derive(Debug, Clone)]
pub struct DnsScanner {
    domain: String,
    expected: String,
    config: ResolverConfig,
}

impl DnsScanner {
    /// Resolve the domain and compare against the expected value.
    ///
    /// # Errors
    ///
    /// Returns the resolver's terminal error unchanged.
    pub async fn scan(&self) -> Result<DnsScanSummary> {
        let result = NameResolver::new(self.config.clone())
            .resolve(&self.domain)
            .await;
        if let Some(err) = result.error {
            return Err(err.into());
        }

        Ok(DnsScanSummary {
            matched: matches_expected(&result, &self.expected),
            delay: result.elapsed,
            a_records: result.ipv4,
            aaaa_records: result.ipv6,
            cname: result.cname,
            checked_at: Utc::now(),
        })
    }
}

/// ICMP scan bound to one target.
#[derive(Debug, Clone)]
pub struct IcmpScanner {
    target: String,
    config: EchoConfig,
}

impl IcmpScanner {
    /// Run one echo session against the target.
    ///
    /// # Errors
    ///
    /// Returns the prober's terminal error unchanged. Packet loss alone is
    /// not an error.
    pub async fn scan(&self) -> Result<IcmpScanSummary> {
        let result = EchoProber::new(self.config.clone()).scan(&self.target).await;
        if let Some(err) = result.error {
            return Err(err.into());
        }

        Ok(IcmpScanSummary {
            delay: result.rtt,
            alive: result.alive,
            loss: result.loss,
            checked_at: Utc::now(),
        })
    }
}

/// TCP scan bound to one endpoint.
#[derive(Debug, Clone)]
pub struct TcpScanner {
    target: String,
    port: u16,
    config: TcpConfig,
}

impl TcpScanner {
    /// Connect to the target port.
    ///
    /// # Errors
    ///
    /// Returns an error only when the target cannot be resolved.
    pub async fn scan(&self) -> Result<TcpScanSummary> {
        let result = TcpProbe::new(self.config.clone())
            .probe(&self.target, self.port)
            .await?;

        Ok(TcpScanSummary {
            delay: result.duration,
            open: result.open,
            banner: result.banner,
            checked_at: Utc::now(),
        })
    }
}

/// Web scan bound to one URL.
#[derive(Debug, Clone)]
pub struct WebScanner {
    url: String,
    config: HttpConfig,
}

impl WebScanner {
    /// Request the URL once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] when no response arrived, or the client
    /// construction error.
    pub async fn scan(&self) -> Result<WebScanSummary> {
        let result = HttpCheck::new(self.config.clone())?.check(&self.url).await;
        if let Some(err) = result.error {
            return Err(Error::network(err));
        }
        let Some(status) = result.status else {
            return Err(Error::network("no response"));
        };

        Ok(WebScanSummary {
            delay: result.elapsed,
            accessible: result.available,
            status,
            title: result.title,
            checked_at: Utc::now(),
        })
    }
}

/// Compare `expected` with the resolved addresses and the final CNAME.
///
/// Addresses are compared as parsed IPs; names ignore case and a trailing dot.
#[must_use]
pub fn matches_expected(result: &ResolveResult, expected: &str) -> bool {
    let expected = expected.trim();
    if let Ok(ip) = expected.parse() {
        return result.addresses().contains(&ip);
    }

    let name = |s: &str| s.trim_end_matches('.').to_ascii_lowercase();
    !result.cname.is_empty() && name(&result.cname) == name(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ProbeError, ResolveError};

    fn resolved() -> ResolveResult {
        ResolveResult {
            domain: "www.example.com.".into(),
            aliases: vec!["edge.cdn.example.net.".into()],
            cname: "edge.cdn.example.net.".into(),
            ipv4: vec![Ipv4Addr::new(203, 0, 113, 10)],
            ipv6: vec!["2001:db8::10".parse().unwrap()],
            elapsed: Duration::from_millis(12),
            error: None,
        }
    }

    #[test]
    fn test_registry_defaults_follow_dashboard_wrappers() {
        let registry = ScannerRegistry::default();
        assert_eq!(registry.resolver.timeout, DNS_SCAN_TIMEOUT);
        assert_eq!(registry.echo.count, ICMP_SCAN_COUNT);
        assert_eq!(registry.http.timeout, WEB_SCAN_TIMEOUT);
    }

    #[test]
    fn test_matches_expected_addresses() {
        let result = resolved();
        assert!(matches_expected(&result, "203.0.113.10"));
        assert!(matches_expected(&result, "2001:db8::10"));
        assert!(!matches_expected(&result, "203.0.113.11"));
    }

    #[test]
    fn test_matches_expected_cname() {
        let result = resolved();
        assert!(matches_expected(&result, "edge.cdn.example.net"));
        assert!(matches_expected(&result, "EDGE.cdn.example.net."));
        assert!(!matches_expected(&result, "other.example.net"));
    }

    #[test]
    fn test_empty_cname_never_matches_name() {
        let mut result = resolved();
        result.cname.clear();
        assert!(!matches_expected(&result, ""));
    }

    #[tokio::test]
    async fn test_dns_scan_surfaces_resolver_error() {
        let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let registry = ScannerRegistry::from_config(&AppConfig {
            resolver: ResolverConfig::default()
                .with_servers([silent.local_addr().unwrap().to_string()])
                .with_timeout(Duration::from_millis(50))
                .with_retries(0),
            ..AppConfig::default()
        });

        let err = registry.dns("example.com", "192.0.2.1").scan().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Resolve(ResolveError::AllServersFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_icmp_scan_surfaces_session_error() {
        let registry = ScannerRegistry::default();
        let err = registry.icmp("::1").scan().await.unwrap_err();
        assert!(matches!(err, Error::Probe(ProbeError::Resolve(_))));
    }

    #[tokio::test]
    async fn test_tcp_scan_reports_closed_port() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let summary = ScannerRegistry::default()
            .tcp("127.0.0.1", port)
            .scan()
            .await
            .unwrap();
        assert!(!summary.open);
        assert!(summary.banner.is_none());
    }

    #[tokio::test]
    async fn test_web_scan_summarizes_response() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let body = "<title>Dashboard</title>";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });

        let summary = ScannerRegistry::default()
            .web(format!("http://{addr}/"))
            .scan()
            .await
            .unwrap();
        assert!(summary.accessible);
        assert_eq!(summary.status, 200);
        assert_eq!(summary.title, "Dashboard");
    }

    #[tokio::test]
    async fn test_web_scan_without_response_is_error() {
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = ScannerRegistry::default()
            .web(format!("http://127.0.0.1:{port}/"))
            .scan()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
