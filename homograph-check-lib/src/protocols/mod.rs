//! Lookup collaborators used by the analysis pipeline.
//!
//! The orchestrator only sees the two traits defined here. Production
//! implementations resolve through the system DNS configuration and look up
//! registration data over RDAP with a fallback to the system `whois`
//! command; tests plug in in-memory fixtures.

/// DNS resolution through trust-dns
pub mod dns;

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// WHOIS protocol implementation
pub mod whois;

/// Registry mappings and bootstrap discovery
pub mod registry;

pub use dns::SystemResolver;
pub use rdap::{extract_registration, RdapClient};
pub use registry::{extract_tld, get_rdap_endpoint, get_rdap_registry_map};
pub use whois::{is_whois_available, parse_whois_registration, WhoisClient};

use crate::error::{RegistrationError, ResolutionError};
use crate::types::Registration;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Duration;

/// Resolves a domain name to its addresses.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    /// Resolve `domain`. An empty answer is reported as `NotFound`.
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>, ResolutionError>;
}

/// Retrieves registration metadata for a domain.
#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError>;
}

/// RDAP first, then WHOIS.
///
/// A `NotFound` answer from RDAP is authoritative and is returned as is.
/// Any other RDAP failure falls through to WHOIS; when WHOIS cannot be used
/// either, the RDAP error is reported.
#[derive(Clone)]
pub struct FallbackLookup {
    rdap: Option<RdapClient>,
    whois: Option<WhoisClient>,
}

impl FallbackLookup {
    /// Build the default chain for the enabled protocol features.
    pub fn new(timeout: Duration) -> Result<Self, crate::error::HomographError> {
        let rdap = if cfg!(feature = "rdap") {
            Some(RdapClient::with_config(timeout, cfg!(feature = "bootstrap"))?)
        } else {
            None
        };
        let whois = if cfg!(feature = "whois") {
            Some(WhoisClient::with_timeout(timeout))
        } else {
            None
        };
        Ok(Self { rdap, whois })
    }

    pub fn from_parts(rdap: Option<RdapClient>, whois: Option<WhoisClient>) -> Self {
        Self { rdap, whois }
    }
}

#[async_trait]
impl RegistrationLookup for FallbackLookup {
    async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError> {
        let rdap_error = match &self.rdap {
            Some(rdap) => match rdap.lookup(domain).await {
                Ok(registration) => return Ok(registration),
                Err(RegistrationError::NotFound) => return Err(RegistrationError::NotFound),
                Err(e) => {
                    tracing::debug!(domain, error = %e, "RDAP lookup failed, trying WHOIS");
                    Some(e)
                }
            },
            None => None,
        };

        match &self.whois {
            Some(whois) => match whois.lookup(domain).await {
                Err(RegistrationError::Unavailable(msg)) => {
                    Err(rdap_error.unwrap_or(RegistrationError::Unavailable(msg)))
                }
                other => other,
            },
            None => Err(rdap_error.unwrap_or_else(|| {
                RegistrationError::Unavailable("no registration protocol enabled".to_string())
            })),
        }
    }
}
