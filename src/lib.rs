//! netprobe - DNS and ICMP reachability probing.
//!
//! This crate provides both a library API and a CLI tool for:
//! - Resolving domains while following CNAME chains, with multi-server failover
//! - Measuring ICMP echo round-trip time and packet loss
//! - Checking whether TCP ports accept connections
//! - Checking HTTP endpoints for status and page title
//! - Multiple output formats (table, JSON, CSV, TSV)
//!
//! # Library Usage
//!
//! ```ignore
//! use netprobe::{EchoConfig, EchoProber, NameResolver, ResolverConfig};
//!
//! // Resolve through a CNAME chain
//! let resolver = NameResolver::new(ResolverConfig::default().with_servers(["1.1.1.1"]));
//! let result = resolver.resolve("www.example.com").await;
//! println!("{} -> {:?}", result.cname, result.ipv4);
//!
//! // Ping a host
//! let mut prober = EchoProber::new(EchoConfig::default().with_count(5));
//! let stats = prober.scan("example.com").await;
//! println!("loss {:.0}%, avg {:?}", stats.loss, stats.rtt);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Resolve domains concurrently
//! netprobe resolve www.example.com github.com --dns 8.8.8.8 --dns 1.1.1.1
//!
//! # Check that a domain resolves to an expected target
//! netprobe resolve cdn.example.com --expect example.edgesuite.net.
//!
//! # ICMP echo (needs ping_group_range or CAP_NET_RAW)
//! netprobe ping example.com -c 5
//! netprobe ping -6 ::1 --format json
//!
//! # TCP connect
//! netprobe tcp example.com 443
//!
//! # HTTP check
//! netprobe web https://example.com --format json
//! ```
//!
//! # Features
//!
//! - **CNAME Following**: Bounded chain walk with loop detection
//! - **Failover**: Retry rounds across a pool of DNS servers
//! - **Echo Statistics**: Average RTT and loss percentage per session
//! - **IPv4/IPv6 Support**: Works with both address families

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod icmp;
pub mod scanner;
mod serde_helpers;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::{AppConfig, ConfigLoader};
pub use dns::{NameResolver, ResolveResult, ResolverConfig};
pub use error::{Error, ProbeError, ResolveError, Result};
pub use icmp::{EchoConfig, EchoProber, IpFamily, ProbeResult};
pub use scanner::{HttpCheck, ScannerRegistry, TcpProbe};
