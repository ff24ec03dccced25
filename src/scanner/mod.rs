//! Scanner module.
//!
//! Thin scan wrappers consumed by the dashboard:
//! - Registry handing out DNS, ICMP, TCP and web scanners
//! - TCP connect probe with passive banner read
//! - HTTP availability check with title scraping

pub mod http;
pub mod registry;
pub mod tcp;

pub use http::{HttpCheck, HttpCheckResult, HttpConfig};
pub use registry::{
    matches_expected, DnsScanSummary, DnsScanner, IcmpScanSummary, IcmpScanner, ScannerRegistry,
    TcpScanSummary, TcpScanner, WebScanSummary, WebScanner,
};
pub use tcp::{TcpConfig, TcpProbe, TcpProbeResult};
