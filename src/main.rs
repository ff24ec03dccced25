//! netprobe - DNS and ICMP reachability prober
//!
//! Binary entry point for the netprobe CLI application.

#![warn(clippy::all, warnings)]
#![warn(clippy::pedantic, clippy::nursery)]

use clap::CommandFactory;
use futures::future::join_all;
use netprobe::cli::{Cli, Commands, OutputFormat};
use netprobe::config::{AppConfig, ConfigLoader};
use netprobe::dns::{NameResolver, ResolveResult};
use netprobe::error::Result;
use netprobe::icmp::{EchoProber, IpFamily, ProbeResult};
use netprobe::scanner::{matches_expected, HttpCheck, TcpProbe, TcpProbeResult};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set up logging based on verbosity level.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `quiet` - Enable error-level only logging
fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .init();
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn join_ips<T: ToString>(ips: &[T], sep: &str) -> String {
    ips.iter().map(ToString::to_string).collect::<Vec<_>>().join(sep)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A resolve result with the optional expectation check, as printed.
#[derive(Serialize)]
struct ResolveRow<'a> {
    #[serde(flatten)]
    result: &'a ResolveResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<bool>,
}

/// Resolve every domain concurrently over one shared resolver.
///
/// # Arguments
///
/// * `config` - Effective settings, after command-line overrides
/// * `domains` - Domains to resolve
/// * `expect` - Optional expected address or CNAME
/// * `format` - Output format
async fn run_resolve(
    config: &AppConfig,
    domains: &[String],
    expect: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!(
        servers = ?config.resolver.servers,
        count = domains.len(),
        "resolving"
    );

    let resolver = NameResolver::new(config.resolver.clone());
    let results = join_all(domains.iter().map(|d| resolver.resolve(d))).await;

    let rows: Vec<ResolveRow<'_>> = results
        .iter()
        .map(|result| ResolveRow {
            result,
            matched: expect.map(|e| matches_expected(result, e)),
        })
        .collect();

    match format {
        OutputFormat::Table => print_resolve_table(&rows),
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv | OutputFormat::Tsv => {
            print_resolve_delimited(&rows, format, expect.is_some());
        }
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some domains did not resolve");
    }
    Ok(())
}

fn print_resolve_table(rows: &[ResolveRow<'_>]) {
    println!(
        "{:<4} {:<28} {:<32} {:<34} {:>10}  Status",
        "#", "Domain", "CNAME", "Addresses", "Time"
    );
    println!("{}", "-".repeat(120));

    for (idx, row) in rows.iter().enumerate() {
        let r = row.result;
        let addresses = join_ips(&r.addresses(), ", ");
        let status = match (&r.error, row.matched) {
            (Some(err), _) => err.to_string(),
            (None, Some(true)) => "ok (matched)".to_string(),
            (None, Some(false)) => "ok (no match)".to_string(),
            (None, None) => "ok".to_string(),
        };
        println!(
            "{:<4} {:<28} {:<32} {:<34} {:>7.1} ms  {}",
            idx + 1,
            r.domain,
            r.cname,
            addresses,
            millis(r.elapsed),
            status
        );
        for alias in &r.aliases {
            println!("{:<4}   -> {alias}", "");
        }
    }
}

fn print_resolve_delimited(rows: &[ResolveRow<'_>], format: OutputFormat, with_match: bool) {
    let mut header = vec!["domain", "cname", "ipv4", "ipv6", "elapsed_ms", "error"];
    if with_match {
        header.push("matched");
    }
    println!("{}", format.record(&header));

    for row in rows {
        let r = row.result;
        let mut fields = vec![
            r.domain.clone(),
            r.cname.clone(),
            join_ips(&r.ipv4, " "),
            join_ips(&r.ipv6, " "),
            format!("{:.1}", millis(r.elapsed)),
            r.error.as_ref().map(ToString::to_string).unwrap_or_default(),
        ];
        if let Some(matched) = row.matched {
            fields.push(matched.to_string());
        }
        println!("{}", format.record(&fields));
    }
}

/// A probe result labelled with the target it was run against.
#[derive(Serialize)]
struct PingRow {
    target: String,
    #[serde(flatten)]
    result: ProbeResult,
}

/// Probe each target in turn, one session per target.
///
/// Targets run sequentially: every session reads raw ICMP traffic and
/// would otherwise count another session's replies as foreign.
async fn run_ping(config: &AppConfig, targets: &[String], format: OutputFormat) -> Result<()> {
    let mut rows = Vec::with_capacity(targets.len());
    for target in targets {
        let mut prober = EchoProber::new(config.echo.clone());
        tracing::info!(%target, count = config.echo.count, "pinging");
        let result = prober.scan(target).await;
        rows.push(PingRow {
            target: target.clone(),
            result,
        });
    }

    match format {
        OutputFormat::Table => {
            println!(
                "{:<4} {:<24} {:<40} {:>5} {:>5} {:>7} {:>10}  Status",
                "#", "Target", "IP", "Sent", "Recv", "Loss", "Avg RTT"
            );
            println!("{}", "-".repeat(110));
            for (idx, row) in rows.iter().enumerate() {
                let r = &row.result;
                let status = match (&r.error, r.alive) {
                    (Some(err), _) => err.to_string(),
                    (None, true) => "alive".to_string(),
                    (None, false) => "unreachable".to_string(),
                };
                println!(
                    "{:<4} {:<24} {:<40} {:>5} {:>5} {:>6.1}% {:>7.2} ms  {}",
                    idx + 1,
                    row.target,
                    r.ip.map(|ip| ip.to_string()).unwrap_or_default(),
                    r.sent,
                    r.received,
                    r.loss,
                    millis(r.rtt),
                    status
                );
            }
        }
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv | OutputFormat::Tsv => {
            println!(
                "{}",
                format.record(&["target", "ip", "alive", "sent", "received", "loss", "rtt_ms", "error"])
            );
            for row in &rows {
                let r = &row.result;
                let fields = [
                    row.target.clone(),
                    r.ip.map(|ip| ip.to_string()).unwrap_or_default(),
                    r.alive.to_string(),
                    r.sent.to_string(),
                    r.received.to_string(),
                    format!("{:.1}", r.loss),
                    format!("{:.3}", millis(r.rtt)),
                    r.error.as_ref().map(ToString::to_string).unwrap_or_default(),
                ];
                println!("{}", format.record(&fields));
            }
        }
    }

    Ok(())
}

/// A TCP probe result labelled with its endpoint.
#[derive(Serialize)]
struct TcpRow<'a> {
    target: &'a str,
    port: u16,
    #[serde(flatten)]
    result: TcpProbeResult,
}

/// Run a single TCP connect probe.
async fn run_tcp(config: &AppConfig, target: &str, port: u16, format: OutputFormat) -> Result<()> {
    let probe = TcpProbe::new(config.tcp.clone());
    let row = TcpRow {
        target,
        port,
        result: probe.probe(target, port).await?,
    };

    match format {
        OutputFormat::Table => {
            let state = if row.result.open { "open" } else { "closed" };
            println!(
                "{target}:{port} {state} ({:.1} ms)",
                millis(row.result.duration)
            );
            if let Some(banner) = &row.result.banner {
                println!("banner: {banner}");
            }
        }
        OutputFormat::Json => print_json(&row)?,
        OutputFormat::Csv | OutputFormat::Tsv => {
            println!("{}", format.record(&["target", "port", "open", "duration_ms", "banner"]));
            let fields = [
                target.to_string(),
                port.to_string(),
                row.result.open.to_string(),
                format!("{:.1}", millis(row.result.duration)),
                row.result.banner.clone().unwrap_or_default(),
            ];
            println!("{}", format.record(&fields));
        }
    }

    Ok(())
}

/// Run a single HTTP check.
async fn run_web(config: &AppConfig, url: &str, format: OutputFormat) -> Result<()> {
    let check = HttpCheck::new(config.http.clone())?;
    let result = check.check(url).await;

    match format {
        OutputFormat::Table => {
            let status = result
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let state = if result.available { "available" } else { "unavailable" };
            println!(
                "{url} {state} status={status} ({:.1} ms)",
                millis(result.elapsed)
            );
            println!("title: {}", result.title);
            if let Some(err) = &result.error {
                println!("error: {err}");
            }
        }
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Csv | OutputFormat::Tsv => {
            println!(
                "{}",
                format.record(&["url", "available", "status", "elapsed_ms", "title", "error"])
            );
            let fields = [
                result.url.clone(),
                result.available.to_string(),
                result.status.map(|s| s.to_string()).unwrap_or_default(),
                format!("{:.1}", millis(result.elapsed)),
                result.title.clone(),
                result.error.clone().unwrap_or_default(),
            ];
            println!("{}", format.record(&fields));
        }
    }

    if let Some(err) = &result.error {
        tracing::warn!(%url, "{err}");
    }
    Ok(())
}

/// Print the effective settings, or save them when `output` is given.
fn run_config(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            ConfigLoader::save(config, &path)?;
            println!("Saved to: {}", path.display());
        }
        None => print_json(config)?,
    }
    Ok(())
}

/// Fold command-line overrides into the loaded settings.
fn apply_overrides(config: &mut AppConfig, command: &Commands) {
    match command {
        Commands::Resolve {
            dns_servers,
            timeout,
            retries,
            ..
        } => {
            if !dns_servers.is_empty() {
                config.resolver.servers.clone_from(dns_servers);
            }
            if let Some(secs) = timeout {
                config.resolver.timeout = Duration::from_secs(*secs);
            }
            if let Some(retries) = retries {
                config.resolver.retries = *retries;
            }
        }
        Commands::Ping {
            count,
            timeout,
            size,
            ttl,
            ipv6,
            ..
        } => {
            if let Some(count) = count {
                config.echo.count = *count;
            }
            if let Some(secs) = timeout {
                config.echo.timeout = Duration::from_secs(*secs);
            }
            if let Some(size) = size {
                config.echo.size = *size;
            }
            if let Some(ttl) = ttl {
                config.echo.ttl = *ttl;
            }
            if *ipv6 {
                config.echo.family = IpFamily::V6;
            }
        }
        Commands::Tcp {
            timeout: Some(secs),
            ..
        } => {
            config.tcp.connect_timeout = Duration::from_secs(*secs);
        }
        Commands::Web {
            timeout,
            method,
            no_redirect,
            insecure,
            ..
        } => {
            if let Some(secs) = timeout {
                config.http.timeout = Duration::from_secs(*secs);
            }
            if let Some(method) = method {
                config.http.method.clone_from(method);
            }
            if *no_redirect {
                config.http.follow_redirects = false;
            }
            if *insecure {
                config.http.skip_tls_verify = true;
            }
        }
        Commands::Tcp { .. } | Commands::Config { .. } | Commands::Completions { .. } => {}
    }
}

/// Main entry point for the netprobe CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = netprobe::cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.command);
    config.validate()?;
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Commands::Resolve {
            domains, expect, ..
        } => {
            run_resolve(&config, &domains, expect.as_deref(), cli.format).await?;
        }

        Commands::Ping { targets, .. } => {
            run_ping(&config, &targets, cli.format).await?;
        }

        Commands::Tcp { target, port, .. } => {
            run_tcp(&config, &target, port, cli.format).await?;
        }

        Commands::Web { url, .. } => {
            run_web(&config, &url, cli.format).await?;
        }

        Commands::Config { output } => {
            run_config(&config, output)?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
