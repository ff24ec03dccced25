//! Echo channel backed by `surge-ping`.
//!
//! Opening a channel needs either an unprivileged ICMP datagram socket
//! (`net.ipv4.ping_group_range`) or root / `CAP_NET_RAW` for a raw socket.

use crate::icmp::types::{EchoConfig, IpFamily};
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use surge_ping::{Client, Config, Pinger, ICMP};

/// One echo request/reply exchange with a fixed target.
pub(crate) trait EchoChannel {
    /// Send the request with `sequence` and wait for its reply.
    ///
    /// Returns the round-trip time, or a description of why the exchange
    /// failed.
    async fn echo(&mut self, sequence: u16, payload: &[u8]) -> Result<Duration, String>;
}

/// ICMP channel to one target, owning its client so the reply task stays alive.
pub(crate) struct PingChannel {
    _client: Client,
    pinger: Pinger,
}

impl PingChannel {
    /// Open a socket of the target's family and bind a pinger to it.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) async fn open(target: IpAddr, identifier: u16, config: &EchoConfig) -> io::Result<Self> {
        let kind = match IpFamily::of(&target) {
            IpFamily::V4 => ICMP::V4,
            IpFamily::V6 => ICMP::V6,
        };
        let client = Client::new(&Config::builder().kind(kind).ttl(config.ttl).build())?;

        let mut pinger = client
            .pinger(target, surge_ping::PingIdentifier(identifier))
            .await;
        pinger.timeout(config.timeout);

        Ok(Self {
            _client: client,
            pinger,
        })
    }
}

impl EchoChannel for PingChannel {
    async fn echo(&mut self, sequence: u16, payload: &[u8]) -> Result<Duration, String> {
        self.pinger
            .ping(surge_ping::PingSequence(sequence), payload)
            .await
            .map(|(_packet, rtt)| rtt)
            .map_err(|e| e.to_string())
    }
}
