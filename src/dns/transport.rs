//! Failover DNS transport.
//!
//! Sends single-question queries over UDP, walking the configured server
//! pool in order for `retries + 1` rounds.

use crate::error::ResolveError;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use trust_dns_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_resolver::proto::rr::{Name, RecordType};

/// Unit of the linear backoff applied between rounds.
const BACKOFF_UNIT: Duration = Duration::from_millis(100);

/// Largest UDP response accepted.
const MAX_RESPONSE_SIZE: usize = 4096;

/// UDP transport over an ordered pool of DNS servers.
#[derive(Debug, Clone)]
pub(crate) struct FailoverTransport {
    servers: Vec<String>,
    timeout: Duration,
    retries: u32,
}

impl FailoverTransport {
    pub(crate) fn new(servers: Vec<String>, timeout: Duration, retries: u32) -> Self {
        Self {
            servers,
            timeout,
            retries,
        }
    }

    /// Query `name` for `record_type`, failing over across servers and rounds.
    ///
    /// Returns the first `NOERROR` response. Any other response code counts
    /// as a failed attempt for that server.
    pub(crate) async fn exchange(
        &self,
        name: &Name,
        record_type: RecordType,
    ) -> Result<Message, ResolveError> {
        if self.servers.is_empty() {
            return Err(ResolveError::NoServers);
        }

        let mut last_err = None;
        for round in 0..=self.retries {
            for server in &self.servers {
                match self.exchange_with(server, name, record_type).await {
                    Ok(response) if response.response_code() == ResponseCode::NoError => {
                        return Ok(response);
                    }
                    Ok(response) => {
                        let err = ResolveError::Status {
                            server: server.clone(),
                            code: response.response_code().to_string(),
                        };
                        tracing::debug!(%server, %name, ?record_type, "{err}");
                        last_err = Some(err);
                    }
                    Err(err) => {
                        tracing::debug!(%server, %name, ?record_type, round, "{err}");
                        last_err = Some(err);
                    }
                }
            }

            if round < self.retries {
                tokio::time::sleep(backoff(round)).await;
            }
        }

        Err(ResolveError::AllServersFailed(Box::new(
            last_err.unwrap_or(ResolveError::NoServers),
        )))
    }

    /// One query/response exchange with one server, bounded by the timeout.
    async fn exchange_with(
        &self,
        server: &str,
        name: &Name,
        record_type: RecordType,
    ) -> Result<Message, ResolveError> {
        let request = build_query(name, record_type);
        let id = request.id();
        let bytes = request
            .to_vec()
            .map_err(|e| transport_error(server, &e))?;

        let response = timeout(self.timeout, send_and_receive(server, &bytes))
            .await
            .map_err(|_| ResolveError::Timeout {
                server: server.to_string(),
            })?
            .map_err(|e| transport_error(server, &e))?;

        let message = Message::from_vec(&response).map_err(|e| transport_error(server, &e))?;
        if message.id() != id {
            return Err(ResolveError::Transport {
                server: server.to_string(),
                reason: format!("response id {} does not match query id {id}", message.id()),
            });
        }
        Ok(message)
    }
}

/// Build a recursion-desired query carrying exactly one question.
fn build_query(name: &Name, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name.clone(), record_type));
    message
}

async fn send_and_receive(server: &str, request: &[u8]) -> std::io::Result<Vec<u8>> {
    let addr = tokio::net::lookup_host(server).await?.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no address for server")
    })?;

    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await?;
    socket.send(request).await?;

    let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
    let len = socket.recv(&mut buf).await?;
    buf.truncate(len);
    Ok(buf)
}

/// Pause after `round`: 100ms after the first, 200ms after the second, ...
fn backoff(round: u32) -> Duration {
    BACKOFF_UNIT * (round + 1)
}

fn transport_error(server: &str, err: &impl std::fmt::Display) -> ResolveError {
    ResolveError::Transport {
        server: server.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_has_single_question() {
        let name = Name::from_ascii("example.com.").unwrap();
        let message = build_query(&name, RecordType::CNAME);

        assert_eq!(message.queries().len(), 1);
        assert_eq!(message.queries()[0].query_type(), RecordType::CNAME);
        assert_eq!(message.queries()[0].name(), &name);
        assert!(message.recursion_desired());
        assert_eq!(message.message_type(), MessageType::Query);
    }

    #[tokio::test]
    async fn test_empty_pool_reports_no_servers() {
        let transport = FailoverTransport::new(vec![], Duration::from_millis(10), 2);
        let name = Name::from_ascii("example.com.").unwrap();
        let err = transport.exchange(&name, RecordType::A).await.unwrap_err();
        assert_eq!(err, ResolveError::NoServers);
    }

    #[tokio::test]
    async fn test_silent_servers_exhaust_all_rounds() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = silent.local_addr().unwrap().to_string();
        let transport = FailoverTransport::new(vec![server.clone()], Duration::from_millis(50), 1);
        let name = Name::from_ascii("example.com.").unwrap();

        let err = transport.exchange(&name, RecordType::A).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::AllServersFailed(Box::new(ResolveError::Timeout { server }))
        );
    }

    #[test]
    fn test_backoff_grows_from_one_unit() {
        assert_eq!(backoff(0), Duration::from_millis(100));
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(4), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_rounds_are_separated_by_backoff() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = silent.local_addr().unwrap().to_string();
        let transport = FailoverTransport::new(vec![server], Duration::from_millis(10), 2);
        let name = Name::from_ascii("example.com.").unwrap();

        let start = std::time::Instant::now();
        let _ = transport.exchange(&name, RecordType::A).await;

        // 100ms after round 0 and 200ms after round 1, none after the last.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
