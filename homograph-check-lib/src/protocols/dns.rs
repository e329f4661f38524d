//! DNS resolution for variant domains.

use super::DomainResolver;
use crate::error::ResolutionError;
use crate::utils::to_ascii_domain;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

/// A/AAAA resolution through a Tokio trust-dns resolver.
///
/// Unicode variants are resolved through their punycode form.
#[derive(Clone)]
pub struct SystemResolver {
    resolver: TokioAsyncResolver,
}

impl SystemResolver {
    /// Resolver using the default upstream configuration.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Resolver whose per-query timeout is `timeout`. Retries are disabled
    /// so one call maps to one attempt.
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainResolver for SystemResolver {
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>, ResolutionError> {
        let ascii = to_ascii_domain(domain)
            .ok_or_else(|| ResolutionError::NetworkError(format!("'{}' is not IDNA-encodable", domain)))?;

        // trailing dot keeps the search list out of the query
        let fqdn = format!("{}.", ascii);
        let lookup = self.resolver.lookup_ip(fqdn.as_str()).await.map_err(map_resolve_error)?;

        let addresses: BTreeSet<IpAddr> = lookup.iter().collect();
        if addresses.is_empty() {
            return Err(ResolutionError::NotFound);
        }
        Ok(addresses)
    }
}

fn map_resolve_error(err: ResolveError) -> ResolutionError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => ResolutionError::NotFound,
        ResolveErrorKind::Timeout => ResolutionError::Timeout,
        _ => ResolutionError::NetworkError(err.to_string()),
    }
}
