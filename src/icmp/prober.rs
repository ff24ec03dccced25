//! ICMP echo prober.
//!
//! [`EchoProber`] sends a bounded series of echo requests to one address
//! and turns the answered ones into round-trip statistics.

#![allow(clippy::missing_errors_doc)]

use crate::error::ProbeError;
use crate::icmp::channel::{EchoChannel, PingChannel};
use crate::icmp::types::{EchoConfig, IpFamily, ProbeResult, MAX_PAYLOAD};
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;

/// Pause between consecutive echo requests.
pub const INTER_PACKET_INTERVAL: Duration = Duration::from_millis(10);

/// ICMP echo prober.
///
/// Each instance owns an identifier and a sequence counter that keeps
/// counting across scans. [`scan`](Self::scan) takes `&mut self`, so one
/// instance serves one scan at a time; run concurrent scans on separate
/// instances.
///
/// # Example
///
/// ```ignore
/// let mut prober = EchoProber::new(EchoConfig::default().with_count(5));
/// let result = prober.scan("1.1.1.1").await;
/// println!("alive={} loss={}%", result.alive, result.loss);
/// ```
#[derive(Debug, Clone)]
pub struct EchoProber {
    config: EchoConfig,
    identifier: u16,
    sequence: u16,
}

/// Why a single echo attempt did not count.
#[derive(Debug)]
enum Lost {
    Timeout,
    Failed(String),
}

impl std::fmt::Display for Lost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Counters of one echo session.
#[derive(Debug, Default)]
struct Tally {
    sent: u32,
    received: u32,
    total_rtt: Duration,
}

impl EchoProber {
    /// Create a prober; without a configured identifier, the low 16 bits
    /// of the process id are used.
    #[must_use]
    pub fn new(config: EchoConfig) -> Self {
        let identifier = config.identifier.unwrap_or_else(default_identifier);
        Self {
            config,
            identifier,
            sequence: 0,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &EchoConfig {
        &self.config
    }

    /// Echo identifier carried by every request.
    #[must_use]
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Last sequence number sent.
    #[must_use]
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Probe one address (IP literal or host name).
    ///
    /// Never fails outright: resolution and session failures are returned
    /// in [`ProbeResult::error`]; lost packets only raise the loss.
    pub async fn scan(&mut self, address: &str) -> ProbeResult {
        let target = match resolve_target(address, self.config.family).await {
            Ok(ip) => ip,
            Err(err) => return ProbeResult::failure(None, err),
        };

        if let Err(err) = self.check_payload() {
            return ProbeResult::failure(Some(target), err);
        }

        let mut channel = match PingChannel::open(target, self.identifier, &self.config).await {
            Ok(channel) => channel,
            Err(e) => return ProbeResult::failure(Some(target), ProbeError::Socket(e.to_string())),
        };

        match self.run_session(&mut channel, target).await {
            Ok(tally) => {
                ProbeResult::from_counts(target, tally.sent, tally.received, tally.total_rtt)
            }
            Err(err) => ProbeResult::failure(Some(target), err),
        }
    }

    fn check_payload(&self) -> Result<(), ProbeError> {
        if self.config.size > MAX_PAYLOAD {
            return Err(ProbeError::Marshal(format!(
                "payload of {} bytes exceeds {MAX_PAYLOAD}",
                self.config.size
            )));
        }
        Ok(())
    }

    async fn run_session<C: EchoChannel>(
        &mut self,
        channel: &mut C,
        target: IpAddr,
    ) -> Result<Tally, ProbeError> {
        self.check_payload()?;
        let data = payload(self.config.size);
        let mut tally = Tally::default();

        for _ in 0..self.config.count {
            self.sequence = self.sequence.wrapping_add(1);
            let sequence = self.sequence;

            tally.sent += 1;
            match self.attempt(channel, sequence, &data).await {
                Ok(rtt) => {
                    tally.received += 1;
                    tally.total_rtt += rtt;
                }
                Err(lost) => {
                    tracing::debug!(%target, seq = sequence, "echo lost: {lost}");
                }
            }

            tokio::time::sleep(INTER_PACKET_INTERVAL).await;
        }

        Ok(tally)
    }

    /// One request and the wait for its reply.
    async fn attempt<C: EchoChannel>(
        &self,
        channel: &mut C,
        sequence: u16,
        data: &[u8],
    ) -> Result<Duration, Lost> {
        timeout(self.config.timeout, channel.echo(sequence, data))
            .await
            .map_err(|_| Lost::Timeout)?
            .map_err(Lost::Failed)
    }
}

impl Default for EchoProber {
    fn default() -> Self {
        Self::new(EchoConfig::default())
    }
}

/// Low 16 bits of the process id.
#[must_use]
pub fn default_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Request payload: a repeating 0..=255 byte pattern.
fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i & 0xff) as u8).collect()
}

/// Resolve `address` to an address of `family`.
async fn resolve_target(address: &str, family: IpFamily) -> Result<IpAddr, ProbeError> {
    let host = address.trim().trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        return if family.matches(&ip) {
            Ok(ip)
        } else {
            Err(ProbeError::Resolve(format!("{ip} is not an {family} address")))
        };
    }

    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| ProbeError::Resolve(format!("{host}: {e}")))?;
    addrs
        .map(|addr| addr.ip())
        .find(|ip| family.matches(ip))
        .ok_or_else(|| ProbeError::Resolve(format!("no {family} address for {host}")))
}
