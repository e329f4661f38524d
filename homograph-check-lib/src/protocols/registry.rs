//! RDAP endpoint discovery.
//!
//! Endpoints come from a built-in table first. TLDs missing from it are
//! looked up in the IANA RDAP bootstrap file, which is fetched once and
//! cached process-wide for 24 hours. TLDs absent from the bootstrap file are
//! remembered until the next fetch. A failed fetch is not retried for five
//! minutes, and only one fetch runs at a time.

use crate::error::HomographError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Bootstrap cache TTL: RDAP endpoints rarely change
const BOOTSTRAP_TTL: Duration = Duration::from_secs(24 * 3600);

/// How long lookups skip the bootstrap fetch after it failed
const FAILURE_BACKOFF: Duration = Duration::from_secs(300);

/// Built-in RDAP endpoints, covering the TLDs most variants land on.
const RDAP_ENDPOINTS: &[(&str, &str)] = &[
    ("com", "https://rdap.verisign.com/com/v1/domain/"),
    ("net", "https://rdap.verisign.com/net/v1/domain/"),
    ("org", "https://rdap.publicinterestregistry.org/rdap/domain/"),
    ("info", "https://rdap.identitydigital.services/rdap/domain/"),
    ("biz", "https://rdap.nic.biz/domain/"),
    ("app", "https://pubapi.registry.google/rdap/domain/"),
    ("dev", "https://pubapi.registry.google/rdap/domain/"),
    ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
    ("tech", "https://rdap.centralnic.com/tech/domain/"),
    ("online", "https://rdap.centralnic.com/online/domain/"),
    ("site", "https://rdap.centralnic.com/site/domain/"),
    ("website", "https://rdap.centralnic.com/website/domain/"),
    ("store", "https://rdap.centralnic.com/store/domain/"),
    ("shop", "https://rdap.gmoregistry.net/rdap/domain/"),
    ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
    ("io", "https://rdap.identitydigital.services/rdap/domain/"),
    ("me", "https://rdap.identitydigital.services/rdap/domain/"),
    ("live", "https://rdap.identitydigital.services/rdap/domain/"),
    ("email", "https://rdap.identitydigital.services/rdap/domain/"),
    ("today", "https://rdap.identitydigital.services/rdap/domain/"),
    ("world", "https://rdap.identitydigital.services/rdap/domain/"),
    ("us", "https://rdap.nic.us/domain/"),
    ("uk", "https://rdap.nominet.uk/domain/"),
    ("de", "https://rdap.denic.de/domain/"),
    ("ca", "https://rdap.ca.fury.ca/rdap/domain/"),
    ("au", "https://rdap.cctld.au/rdap/domain/"),
    ("fr", "https://rdap.nic.fr/domain/"),
    ("nl", "https://rdap.sidn.nl/domain/"),
    ("br", "https://rdap.registro.br/domain/"),
    ("in", "https://rdap.nixiregistry.in/rdap/domain/"),
];

#[derive(Debug)]
struct BootstrapCache {
    /// TLD -> RDAP endpoint URL
    endpoints: HashMap<String, String>,
    /// TLDs the last fetch had no endpoint for
    missing: HashSet<String>,
    last_fetch: Option<Instant>,
    last_failure: Option<Instant>,
}

impl BootstrapCache {
    fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            missing: HashSet::new(),
            last_fetch: None,
            last_failure: None,
        }
    }

    fn is_stale(&self) -> bool {
        match self.last_fetch {
            Some(t) => t.elapsed() > BOOTSTRAP_TTL,
            None => true,
        }
    }

    fn in_backoff(&self) -> bool {
        self.last_failure
            .is_some_and(|t| t.elapsed() < FAILURE_BACKOFF)
    }

    /// `Ok(true)` when a fetch is due, `Ok(false)` when the cache is fresh,
    /// and a `NetworkError` while a recent failure is backing off.
    fn should_fetch(&self) -> Result<bool, HomographError> {
        if !self.is_stale() {
            return Ok(false);
        }
        if self.in_backoff() {
            return Err(HomographError::network(
                "RDAP bootstrap registry unavailable, retrying later",
            ));
        }
        Ok(true)
    }
}

lazy_static::lazy_static! {
    static ref BOOTSTRAP_CACHE: Mutex<BootstrapCache> = Mutex::new(BootstrapCache::new());
    static ref FETCH_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
}

fn lock_cache() -> Result<std::sync::MutexGuard<'static, BootstrapCache>, HomographError> {
    BOOTSTRAP_CACHE
        .lock()
        .map_err(|_| HomographError::internal("Failed to acquire bootstrap cache lock"))
}

/// The built-in TLD -> endpoint table.
pub fn get_rdap_registry_map() -> HashMap<&'static str, &'static str> {
    RDAP_ENDPOINTS.iter().copied().collect()
}

/// Find the RDAP base URL for `tld`.
///
/// # Errors
///
/// `ConfigError` when no endpoint is known (and bootstrap is disabled or
/// does not list the TLD), `NetworkError` when the bootstrap fetch fails.
pub async fn get_rdap_endpoint(tld: &str, use_bootstrap: bool) -> Result<String, HomographError> {
    let tld = tld.to_lowercase();

    if let Some((_, endpoint)) = RDAP_ENDPOINTS.iter().find(|(t, _)| *t == tld) {
        return Ok(endpoint.to_string());
    }

    if !use_bootstrap {
        return Err(HomographError::config(format!(
            "No known RDAP endpoint for '.{}' and bootstrap disabled",
            tld
        )));
    }

    let needs_fetch = {
        let cache = lock_cache()?;
        if !cache.is_stale() {
            if let Some(endpoint) = cache.endpoints.get(&tld) {
                return Ok(endpoint.clone());
            }
            if cache.missing.contains(&tld) {
                return Err(HomographError::config(format!(
                    "'.{}' is not in the IANA RDAP bootstrap registry",
                    tld
                )));
            }
        }
        cache.is_stale()
    };

    if needs_fetch {
        initialize_bootstrap().await?;
    }

    let mut cache = lock_cache()?;
    match cache.endpoints.get(&tld) {
        Some(endpoint) => Ok(endpoint.clone()),
        None => {
            cache.missing.insert(tld.clone());
            Err(HomographError::config(format!(
                "'.{}' is not in the IANA RDAP bootstrap registry",
                tld
            )))
        }
    }
}

/// Fetch the IANA bootstrap file unless the cache is still fresh.
///
/// Concurrent callers wait for the fetch in progress instead of starting
/// their own.
pub async fn initialize_bootstrap() -> Result<(), HomographError> {
    let _fetching = FETCH_LOCK.lock().await;
    if !lock_cache()?.should_fetch()? {
        return Ok(());
    }

    match fetch_bootstrap().await {
        Ok(endpoints) => {
            tracing::debug!(tlds = endpoints.len(), "loaded RDAP bootstrap registry");
            let mut cache = lock_cache()?;
            cache.endpoints = endpoints;
            cache.missing.clear();
            cache.last_fetch = Some(Instant::now());
            cache.last_failure = None;
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "RDAP bootstrap fetch failed");
            lock_cache()?.last_failure = Some(Instant::now());
            Err(e)
        }
    }
}

async fn fetch_bootstrap() -> Result<HashMap<String, String>, HomographError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| {
            HomographError::network_with_source("Failed to create HTTP client", e.to_string())
        })?;

    let response = client.get(BOOTSTRAP_URL).send().await.map_err(|e| {
        HomographError::network_with_source("Failed to fetch RDAP bootstrap registry", e.to_string())
    })?;

    if !response.status().is_success() {
        return Err(HomographError::network(format!(
            "RDAP bootstrap registry returned HTTP {}",
            response.status()
        )));
    }

    let json: serde_json::Value = response.json().await?;
    parse_bootstrap(&json)
}

/// Parse the IANA bootstrap JSON (`services: [[tlds], [urls]]`) into a
/// TLD -> endpoint map, using the first URL of each service.
pub fn parse_bootstrap(json: &serde_json::Value) -> Result<HashMap<String, String>, HomographError> {
    let services = json
        .get("services")
        .and_then(|s| s.as_array())
        .ok_or_else(|| HomographError::parse("Invalid bootstrap JSON: missing 'services' array"))?;

    let mut endpoints = HashMap::new();
    for service in services.iter().filter_map(|s| s.as_array()) {
        let (Some(tlds), Some(url)) = (
            service.first().and_then(|t| t.as_array()),
            service
                .get(1)
                .and_then(|u| u.as_array())
                .and_then(|urls| urls.first())
                .and_then(|u| u.as_str()),
        ) else {
            continue;
        };

        let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
        for tld in tlds.iter().filter_map(|t| t.as_str()) {
            endpoints.insert(tld.to_lowercase(), endpoint.clone());
        }
    }
    Ok(endpoints)
}

/// The last label of a domain, which keys the RDAP bootstrap registry.
pub fn extract_tld(domain: &str) -> Result<String, HomographError> {
    match domain.trim_end_matches('.').rsplit_once('.') {
        Some((name, tld)) if !name.is_empty() && !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(HomographError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tld() {
        assert_eq!(extract_tld("example.com").unwrap(), "com");
        assert_eq!(extract_tld("example.co.uk").unwrap(), "uk");
        assert_eq!(extract_tld("xn--xample-2of.COM").unwrap(), "com");
        assert!(extract_tld("invalid").is_err());
        assert!(extract_tld("").is_err());
    }

    #[test]
    fn test_builtin_endpoints_are_https() {
        for (tld, endpoint) in get_rdap_registry_map() {
            assert!(endpoint.starts_with("https://"), "'{}' must use HTTPS", tld);
            assert!(endpoint.ends_with("/domain/"), "'{}' must end with /domain/", tld);
        }
    }

    #[tokio::test]
    async fn test_builtin_endpoint_lookup() {
        let endpoint = get_rdap_endpoint("COM", false).await.unwrap();
        assert!(endpoint.contains("verisign.com"));
    }

    #[tokio::test]
    async fn test_unknown_tld_without_bootstrap() {
        let result = get_rdap_endpoint("unknowntld123", false).await;
        assert!(matches!(result, Err(HomographError::ConfigError { .. })));
    }

    #[test]
    fn test_parse_bootstrap() {
        let json = serde_json::json!({
            "version": "1.0",
            "services": [
                [["top", "WIN"], ["https://rdap.example-registry.net/rdap/"]],
                [["club"], ["https://rdap.other.example/", "http://fallback.example/"]],
                ["malformed"]
            ]
        });
        let endpoints = parse_bootstrap(&json).unwrap();
        assert_eq!(
            endpoints.get("win").map(String::as_str),
            Some("https://rdap.example-registry.net/rdap/domain/")
        );
        assert_eq!(
            endpoints.get("club").map(String::as_str),
            Some("https://rdap.other.example/domain/")
        );
        assert_eq!(endpoints.len(), 3);
    }

    #[test]
    fn test_parse_bootstrap_rejects_missing_services() {
        assert!(parse_bootstrap(&serde_json::json!({"version": "1.0"})).is_err());
    }

    #[test]
    fn test_fresh_cache_is_stale() {
        let cache = BootstrapCache::new();
        assert!(cache.is_stale());
        assert!(cache.should_fetch().unwrap());
    }

    #[test]
    fn test_failed_fetch_backs_off() {
        let mut cache = BootstrapCache::new();
        cache.last_failure = Some(Instant::now());
        assert!(cache.in_backoff());
        assert!(matches!(
            cache.should_fetch(),
            Err(HomographError::NetworkError { .. })
        ));

        cache.last_failure = Instant::now().checked_sub(FAILURE_BACKOFF + Duration::from_secs(1));
        assert!(!cache.in_backoff());
        assert!(cache.should_fetch().unwrap());
    }

    #[test]
    fn test_fresh_cache_skips_fetch_even_after_failure() {
        let mut cache = BootstrapCache::new();
        cache.last_fetch = Some(Instant::now());
        cache.last_failure = Some(Instant::now());
        assert!(!cache.should_fetch().unwrap());
    }
}
