//! Command-line interface (CLI) argument parsing module.
//!
//! This module provides CLI argument parsing using `clap`.
//! It supports DNS resolution, ICMP echo probing, TCP connect probing,
//! HTTP checks, printing the effective configuration and generating shell
//! completions.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;

/// CLI argument parser using clap derive macro.
///
/// # Example
///
/// ```ignore
/// let cli = Cli::parse();
/// match cli.command {
///     Commands::Resolve { domains, .. } => { /* ... */ }
///     Commands::Ping { targets, .. } => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "netprobe",
    version,
    about = "DNS and ICMP reachability prober",
    long_about = "Probe targets once for dashboard telemetry: CNAME-following DNS resolution, ICMP echo statistics, TCP connect and HTTP checks",
    infer_subcommands = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Settings file (JSON)
    #[arg(long, global = true, env = "NETPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands.
///
/// This enum represents different output formats that can be used
/// when displaying probe results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default, human-readable)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// TSV format (tab-separated)
    Tsv,
}

impl OutputFormat {
    /// Get all available output format names.
    #[must_use]
    pub fn names() -> &'static [&'static str] {
        &["table", "json", "csv", "tsv"]
    }

    /// Field separator for delimited formats.
    #[must_use]
    pub fn separator(self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Tsv => Some('\t'),
            Self::Table | Self::Json => None,
        }
    }

    /// Quote a field for delimited output when it contains the separator,
    /// a quote or a line break. Embedded quotes are doubled.
    #[must_use]
    pub fn escape(self, field: &str) -> Cow<'_, str> {
        let Some(sep) = self.separator() else {
            return Cow::Borrowed(field);
        };
        if field.contains([sep, '"', '\n', '\r']) {
            Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(field)
        }
    }

    /// Join fields into one delimited record.
    #[must_use]
    pub fn record<S: AsRef<str>>(self, fields: &[S]) -> String {
        let sep = self.separator().unwrap_or(',').to_string();
        fields
            .iter()
            .map(|f| self.escape(f.as_ref()))
            .collect::<Vec<_>>()
            .join(&sep)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            _ => Err(format!(
                "Unknown format: {}. Valid options are: {:?}",
                s,
                Self::names()
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
        }
    }
}

/// Available commands for the netprobe CLI.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve domains, following CNAME chains
    ///
    /// Domains are resolved concurrently against the configured server pool.
    #[command(alias = "r")]
    Resolve {
        /// Domains to resolve
        #[arg(required = true)]
        domains: Vec<String>,

        /// DNS servers (host or host:port), replaces the configured pool
        #[arg(long = "dns")]
        dns_servers: Vec<String>,

        /// Timeout per exchange in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Extra rounds through the server pool
        #[arg(short, long)]
        retries: Option<u32>,

        /// Expected address or CNAME; reports whether each domain matches
        #[arg(long)]
        expect: Option<String>,
    },

    /// Send ICMP echo requests
    ///
    /// Needs an unprivileged ICMP socket (ping_group_range) or CAP_NET_RAW.
    #[command(alias = "p")]
    Ping {
        /// Targets (IP address or host name)
        #[arg(required = true)]
        targets: Vec<String>,

        /// Number of echo requests per target
        #[arg(short, long)]
        count: Option<u32>,

        /// Timeout per reply in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Payload size in bytes
        #[arg(short, long)]
        size: Option<usize>,

        /// Outgoing TTL
        #[arg(long)]
        ttl: Option<u32>,

        /// Probe over IPv6
        #[arg(short = '6', long = "ipv6")]
        ipv6: bool,
    },

    /// Check whether a TCP port accepts connections
    #[command(alias = "t")]
    Tcp {
        /// Target host or IP address
        target: String,

        /// Port to connect to
        port: u16,

        /// Connection timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Check that a URL answers with a 2xx or 3xx status
    #[command(alias = "w")]
    Web {
        /// URL to request
        url: String,

        /// Request timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Request method
        #[arg(short = 'X', long)]
        method: Option<String>,

        /// Report redirects instead of following them
        #[arg(long)]
        no_redirect: bool,

        /// Accept invalid TLS certificates
        #[arg(short = 'k', long)]
        insecure: bool,
    },

    /// Show the effective configuration
    ///
    /// Prints the merged settings as JSON, or writes them to a file.
    #[command(alias = "c")]
    Config {
        /// Write to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Parse CLI arguments.
///
/// # Returns
///
/// Returns the parsed `Cli` struct.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("CSV".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert_eq!("tsv".parse::<OutputFormat>(), Ok(OutputFormat::Tsv));
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_separator() {
        assert_eq!(OutputFormat::Csv.separator(), Some(','));
        assert_eq!(OutputFormat::Tsv.separator(), Some('\t'));
        assert_eq!(OutputFormat::Table.separator(), None);
    }

    #[test]
    fn test_record_quotes_fields_with_separators() {
        let fields = ["example.com", "SSH-2.0, OpenSSH", "say \"hi\"", "two\nlines"];
        assert_eq!(
            OutputFormat::Csv.record(&fields),
            "example.com,\"SSH-2.0, OpenSSH\",\"say \"\"hi\"\"\",\"two\nlines\""
        );
        assert_eq!(
            OutputFormat::Tsv.record(&["a,b", "c\td"]),
            "a,b\t\"c\td\""
        );
        assert_eq!(OutputFormat::Table.escape("a,b"), "a,b");
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "netprobe", "resolve", "example.com", "github.com", "--dns", "1.1.1.1", "--dns",
            "8.8.8.8:53", "--expect", "192.0.2.1",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve {
                domains,
                dns_servers,
                expect,
                timeout,
                ..
            } => {
                assert_eq!(domains, vec!["example.com", "github.com"]);
                assert_eq!(dns_servers, vec!["1.1.1.1", "8.8.8.8:53"]);
                assert_eq!(expect.as_deref(), Some("192.0.2.1"));
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ping_flags() {
        let cli = Cli::try_parse_from(["netprobe", "--format", "json", "ping", "-6", "-c", "5", "::1"])
            .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Ping {
                targets,
                count,
                ipv6,
                ..
            } => {
                assert_eq!(targets, vec!["::1"]);
                assert_eq!(count, Some(5));
                assert!(ipv6);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_web_flags() {
        let cli = Cli::try_parse_from([
            "netprobe", "web", "https://example.com", "-X", "HEAD", "--no-redirect", "-k",
        ])
        .unwrap();
        match cli.command {
            Commands::Web {
                url,
                method,
                no_redirect,
                insecure,
                timeout,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(method.as_deref(), Some("HEAD"));
                assert!(no_redirect);
                assert!(insecure);
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_requires_domain() {
        assert!(Cli::try_parse_from(["netprobe", "resolve"]).is_err());
    }
}
