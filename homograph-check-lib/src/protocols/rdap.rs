//! RDAP (Registration Data Access Protocol) implementation.
//!
//! RDAP answers with structured JSON, so registrar and lifecycle dates can
//! be read without the text heuristics WHOIS needs.

use super::RegistrationLookup;
use crate::error::{HomographError, RegistrationError};
use crate::protocols::registry::{extract_tld, get_rdap_endpoint};
use crate::types::{LookupMethod, Registration};
use crate::utils::to_ascii_domain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::time::Duration;

/// RDAP client for registration lookups.
#[derive(Clone)]
pub struct RdapClient {
    /// HTTP client for making RDAP requests
    http_client: reqwest::Client,
    /// Timeout for one RDAP request
    timeout: Duration,
    /// Whether to use IANA bootstrap for unknown TLDs
    use_bootstrap: bool,
}

impl RdapClient {
    /// Create a new RDAP client with default settings.
    pub fn new() -> Result<Self, HomographError> {
        Self::with_config(Duration::from_secs(10), true)
    }

    /// Create a new RDAP client with custom settings.
    pub fn with_config(timeout: Duration, use_bootstrap: bool) -> Result<Self, HomographError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("homograph-check/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                HomographError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            timeout,
            use_bootstrap,
        })
    }

    /// Fetch registration data for `domain`.
    ///
    /// # Errors
    ///
    /// - `NotFound` on HTTP 404
    /// - `RateLimited` on HTTP 429
    /// - `ParseError` when the body is not RDAP JSON
    /// - `Timeout` when the request exceeds the client timeout
    /// - `Unavailable` when no endpoint serves the TLD or the transport fails
    pub async fn fetch(&self, domain: &str) -> Result<Registration, RegistrationError> {
        let ascii = to_ascii_domain(domain)
            .ok_or_else(|| RegistrationError::Unavailable(format!("'{}' is not IDNA-encodable", domain)))?;
        let tld = extract_tld(&ascii).map_err(|e| RegistrationError::Unavailable(e.to_string()))?;
        let endpoint = get_rdap_endpoint(&tld, self.use_bootstrap)
            .await
            .map_err(|e| RegistrationError::Unavailable(e.to_string()))?;

        let rdap_url = format!("{}{}", endpoint, ascii);
        tracing::debug!(url = %rdap_url, "RDAP request");

        let response = tokio::time::timeout(self.timeout, self.http_client.get(&rdap_url).send())
            .await
            .map_err(|_| RegistrationError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    RegistrationError::Timeout
                } else {
                    RegistrationError::Unavailable(format!("request failed: {}", e))
                }
            })?;

        match response.status() {
            StatusCode::OK => {
                let json = response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| RegistrationError::ParseError(format!("invalid JSON: {}", e)))?;
                extract_registration(&json)
            }
            StatusCode::NOT_FOUND => Err(RegistrationError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => Err(RegistrationError::RateLimited),
            code => Err(RegistrationError::Unavailable(format!(
                "RDAP server returned {}",
                code
            ))),
        }
    }
}

#[async_trait]
impl RegistrationLookup for RdapClient {
    async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError> {
        self.fetch(domain).await
    }
}

/// Extract registration data from an RDAP domain object.
///
/// The registrar comes from the entity with the `registrar` role (vCard
/// `fn`, then public ID, then handle); dates come from the `registration`
/// and `expiration` events.
pub fn extract_registration(json: &serde_json::Value) -> Result<Registration, RegistrationError> {
    if !json.is_object() {
        return Err(RegistrationError::ParseError(
            "RDAP response is not an object".to_string(),
        ));
    }

    let mut registration = Registration {
        method: LookupMethod::Rdap,
        ..Registration::default()
    };

    if let Some(entities) = json.get("entities").and_then(|e| e.as_array()) {
        for entity in entities {
            let is_registrar = entity
                .get("roles")
                .and_then(|r| r.as_array())
                .map(|roles| roles.iter().any(|role| role.as_str() == Some("registrar")))
                .unwrap_or(false);

            if is_registrar {
                registration.registrar =
                    extract_vcard_name(entity).or_else(|| extract_entity_identifier(entity));
                if registration.registrar.is_some() {
                    break;
                }
            }
        }
    }

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            if let (Some(action), Some(date)) = (
                event.get("eventAction").and_then(|a| a.as_str()),
                event.get("eventDate").and_then(|d| d.as_str()),
            ) {
                match action {
                    "registration" => registration.created_at = parse_rdap_date(date),
                    "expiration" => registration.expires_at = parse_rdap_date(date),
                    _ => {}
                }
            }
        }
    }

    Ok(registration)
}

fn parse_rdap_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Extract organization name from vCard format in RDAP entity.
fn extract_vcard_name(entity: &serde_json::Value) -> Option<String> {
    let items = entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|a| a.as_array())?;

    items.iter().find_map(|item| {
        let item = item.as_array()?;
        if item.len() >= 4 && item.first().and_then(|f| f.as_str()) == Some("fn") {
            item.get(3).and_then(|n| n.as_str()).map(String::from)
        } else {
            None
        }
    })
}

/// Extract entity identifier from publicIds or handle.
fn extract_entity_identifier(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
        .or_else(|| entity.get("handle").and_then(|h| h.as_str()))
        .map(String::from)
}
