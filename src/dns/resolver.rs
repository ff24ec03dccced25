//! CNAME-chain resolution.
//!
//! [`NameResolver`] walks the alias chain of a domain one hop at a time,
//! asking the server pool for A and CNAME records of the current name,
//! until it reaches address records, a dangling alias, a loop or the hop
//! limit.

use crate::dns::transport::FailoverTransport;
use crate::dns::types::{with_default_port, ResolveResult, ResolverConfig};
use crate::error::ResolveError;
use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Instant;
use trust_dns_resolver::proto::op::Message;
use trust_dns_resolver::proto::rr::{Name, RData, RecordType};

/// Maximum number of names visited in one walk.
pub const MAX_HOPS: usize = 10;

/// DNS resolver that follows CNAME chains with server failover.
///
/// The resolver holds only configuration, so one instance can serve
/// concurrent [`resolve`](Self::resolve) calls.
///
/// # Example
///
/// ```ignore
/// let resolver = NameResolver::new(ResolverConfig::default().with_servers(["1.1.1.1", "8.8.8.8"]));
/// let result = resolver.resolve("github.com").await;
/// if let Some(err) = &result.error {
///     eprintln!("{err}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct NameResolver {
    config: ResolverConfig,
    transport: FailoverTransport,
}

/// Records of interest from one hop's answers.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Answer {
    Alias(String),
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl NameResolver {
    /// Create a resolver, appending the default port to bare server hosts.
    #[must_use]
    pub fn new(mut config: ResolverConfig) -> Self {
        config.servers = config
            .servers
            .iter()
            .map(|s| with_default_port(s))
            .collect();
        let transport =
            FailoverTransport::new(config.servers.clone(), config.timeout, config.retries);
        Self { config, transport }
    }

    /// The normalized configuration in use.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a single domain.
    ///
    /// Never fails outright; the terminal error, if any, is carried in
    /// [`ResolveResult::error`] next to whatever was collected before it.
    pub async fn resolve(&self, domain: &str) -> ResolveResult {
        let start = Instant::now();
        let mut result = ResolveResult::new(fqdn(domain));

        let walked = self.walk(&mut result).await;
        set_cname(&mut result);
        if let Err(err) = walked {
            tracing::debug!(domain = %result.domain, "resolution failed: {err}");
            result.error = Some(err);
        }

        result.elapsed = start.elapsed();
        result
    }

    async fn walk(&self, result: &mut ResolveResult) -> Result<(), ResolveError> {
        let mut current = result.domain.clone();
        let mut visited = HashSet::new();

        for _ in 0..MAX_HOPS {
            if !visited.insert(current.to_ascii_lowercase()) {
                return Err(ResolveError::CnameLoop(current));
            }

            let name = parse_name(&current)?;
            let answers = self.lookup_hop(&name).await?;

            let mut next_target = None;
            for answer in answers {
                match answer {
                    Answer::Alias(target) => {
                        result.aliases.push(target.clone());
                        next_target = Some(target);
                    }
                    Answer::V4(ip) => result.push_ipv4(ip),
                    Answer::V6(ip) => result.push_ipv6(ip),
                }
            }

            match next_target {
                None if !result.ipv4.is_empty() => return Ok(()),
                Some(target) => current = target,
                None => {
                    self.lookup_ipv6(&name, result).await;
                    break;
                }
            }
        }

        if result.has_addresses() {
            Ok(())
        } else {
            Err(ResolveError::NoRecords)
        }
    }

    /// A then CNAME for one name, merged without duplicate records.
    async fn lookup_hop(&self, name: &Name) -> Result<Vec<Answer>, ResolveError> {
        let mut answers = Vec::new();
        for record_type in [RecordType::A, RecordType::CNAME] {
            let response = self.transport.exchange(name, record_type).await?;
            for answer in extract_answers(&response) {
                if !answers.contains(&answer) {
                    answers.push(answer);
                }
            }
        }
        Ok(answers)
    }

    /// Best-effort AAAA lookup; failures are ignored.
    async fn lookup_ipv6(&self, name: &Name, result: &mut ResolveResult) {
        match self.transport.exchange(name, RecordType::AAAA).await {
            Ok(response) => {
                for answer in extract_answers(&response) {
                    if let Answer::V6(ip) = answer {
                        result.push_ipv6(ip);
                    }
                }
            }
            Err(err) => tracing::debug!(%name, "AAAA lookup ignored: {err}"),
        }
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

fn extract_answers(response: &Message) -> Vec<Answer> {
    response
        .answers()
        .iter()
        .filter_map(|record| match record.data()? {
            RData::A(ip) => Some(Answer::V4(*ip)),
            RData::AAAA(ip) => Some(Answer::V6(*ip)),
            RData::CNAME(target) => Some(Answer::Alias(target.to_ascii())),
            _ => None,
        })
        .collect()
}

fn set_cname(result: &mut ResolveResult) {
    if let Some(last) = result.aliases.last() {
        result.cname.clone_from(last);
    }
}

/// Canonical trailing-dot form of a domain.
fn fqdn(domain: &str) -> String {
    let domain = domain.trim();
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    }
}

fn parse_name(name: &str) -> Result<Name, ResolveError> {
    Name::from_ascii(name).map_err(|e| ResolveError::InvalidName {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
