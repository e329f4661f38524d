//! WHOIS fallback for registration lookups.
//!
//! Uses the system `whois` command. WHOIS answers are free text that differs
//! per registry, so the registrar and dates are picked out with a set of
//! line patterns covering the common formats.

use super::RegistrationLookup;
use crate::error::RegistrationError;
use crate::types::{LookupMethod, Registration};
use crate::utils::to_ascii_domain;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;
use tokio::process::Command;

lazy_static! {
    static ref REGISTRAR_RE: Regex = Regex::new(
        r"(?im)^\s*(?:registrar|sponsoring registrar|registrar name|registrar organization)\s*:\s*(\S.*?)\s*$"
    )
    .expect("valid registrar pattern");
    static ref CREATED_RE: Regex = Regex::new(
        r"(?im)^\s*(?:creation date|created on|created|registered on|registration time|domain registration date|registered)\s*:\s*(\S.*?)\s*$"
    )
    .expect("valid creation pattern");
    static ref EXPIRES_RE: Regex = Regex::new(
        r"(?im)^\s*(?:registry expiry date|registrar registration expiration date|expiry date|expiration date|expiration time|expires on|expires|paid-till)\s*:\s*(\S.*?)\s*$"
    )
    .expect("valid expiry pattern");
}

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "throttled",
    "rate-limited",
];

const NO_SERVER_PATTERNS: &[&str] = &[
    "no whois server is known",
    "no whois server",
    "invalid tld",
    "unknown tld",
    "no such tld",
];

const NOT_FOUND_PATTERNS: &[&str] = &[
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "status: available",
    "status: free",
    "not registered",
    "no matching record",
    "no object found",
    "the queried object does not exist",
    "object does not exist",
    "domain name not found",
    "this domain name has not been registered",
];

/// WHOIS client backed by the system's whois command.
#[derive(Clone)]
pub struct WhoisClient {
    /// Timeout for WHOIS requests
    timeout: Duration,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    /// Create a new WHOIS client with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `whois` for `domain` and parse the answer.
    pub async fn fetch(&self, domain: &str) -> Result<Registration, RegistrationError> {
        let ascii = to_ascii_domain(domain).ok_or_else(|| {
            RegistrationError::Unavailable(format!("'{}' is not IDNA-encodable", domain))
        })?;

        let output = tokio::time::timeout(
            self.timeout,
            Command::new("whois").arg(&ascii).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| RegistrationError::Timeout)?
        .map_err(|e| {
            RegistrationError::Unavailable(format!(
                "failed to execute whois command: {}. Make sure 'whois' is installed.",
                e
            ))
        })?;

        let text = String::from_utf8_lossy(&output.stdout);
        parse_whois_registration(&text)
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrationLookup for WhoisClient {
    async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError> {
        self.fetch(domain).await
    }
}

/// Parse a WHOIS answer into registration data.
///
/// A creation date makes the answer a registration, whatever else the text
/// says. Without one, the text is checked for rate-limit banners, missing
/// WHOIS servers and "no match" answers, in that order.
pub fn parse_whois_registration(text: &str) -> Result<Registration, RegistrationError> {
    let created_at = first_capture(&CREATED_RE, text).and_then(|v| parse_whois_date(&v));

    if let Some(created_at) = created_at {
        return Ok(Registration {
            registrar: first_capture(&REGISTRAR_RE, text),
            created_at: Some(created_at),
            expires_at: first_capture(&EXPIRES_RE, text).and_then(|v| parse_whois_date(&v)),
            method: LookupMethod::Whois,
        });
    }

    let lower = text.to_lowercase();
    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(RegistrationError::RateLimited);
    }
    if NO_SERVER_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(RegistrationError::Unavailable(
            "no WHOIS server for this TLD".to_string(),
        ));
    }
    if NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(RegistrationError::NotFound);
    }

    Err(RegistrationError::ParseError(
        "no creation date in WHOIS response".to_string(),
    ))
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse the date formats seen in WHOIS answers into UTC.
pub fn parse_whois_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }

    // drop trailing zone names such as "UTC" or "(GMT)"
    let cleaned = value
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '(' || c == ')' || c == ' ')
        .trim();

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, format) {
            return Some(dt.and_utc());
        }
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d-%b-%Y", "%d.%m.%Y", "%d/%m/%Y", "%Y%m%d",
    ];
    let first_token = cleaned.split_whitespace().next().unwrap_or(cleaned);
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(first_token, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Check if the system has a working whois command.
pub async fn is_whois_available() -> bool {
    match Command::new("whois").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const VERISIGN_SAMPLE: &str = "   Domain Name: EXAMPLE.COM\n\
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\n\
   Registrar WHOIS Server: whois.iana.org\n\
   Updated Date: 2024-08-14T07:01:34Z\n\
   Creation Date: 1995-08-14T04:00:00Z\n\
   Registry Expiry Date: 2025-08-13T04:00:00Z\n\
   Registrar: RESERVED-Internet Assigned Numbers Authority\n";

    #[test]
    fn test_parse_verisign_answer() {
        let registration = parse_whois_registration(VERISIGN_SAMPLE).unwrap();
        assert_eq!(
            registration.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(
            registration.created_at,
            Some(Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap())
        );
        assert_eq!(
            registration.expires_at,
            Some(Utc.with_ymd_and_hms(2025, 8, 13, 4, 0, 0).unwrap())
        );
        assert_eq!(registration.method, LookupMethod::Whois);
    }

    #[test]
    fn test_registrar_whois_server_line_is_not_the_registrar() {
        let registration = parse_whois_registration(VERISIGN_SAMPLE).unwrap();
        assert_ne!(registration.registrar.as_deref(), Some("whois.iana.org"));
    }

    #[test]
    fn test_parse_ru_style_answer() {
        let text = "domain:        EXAMPLE.RU\nregistrar:     RU-CENTER-RU\ncreated:       2011-04-12T20:00:00Z\npaid-till:     2025-04-13T21:00:00Z\n";
        let registration = parse_whois_registration(text).unwrap();
        assert_eq!(registration.registrar.as_deref(), Some("RU-CENTER-RU"));
        assert_eq!(
            registration.created_at,
            Some(Utc.with_ymd_and_hms(2011, 4, 12, 20, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_not_found_answer() {
        let err = parse_whois_registration("No match for \"EXAMPLE-NOT-REGISTERED.COM\".").unwrap_err();
        assert_eq!(err, RegistrationError::NotFound);
    }

    #[test]
    fn test_rate_limit_answer() {
        let err = parse_whois_registration("Rate limit exceeded. Try again later.").unwrap_err();
        assert_eq!(err, RegistrationError::RateLimited);
    }

    #[test]
    fn test_unknown_tld_answer() {
        let err = parse_whois_registration("No whois server is known for this kind of object.")
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Unavailable(_)));
    }

    #[test]
    fn test_missing_creation_date_is_parse_error() {
        let err = parse_whois_registration("Domain Name: EXAMPLE.COM\nRegistrar: Some Registrar\n")
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ParseError(_)));
    }

    #[test]
    fn test_date_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_whois_date("2020-03-01"), Some(expected));
        assert_eq!(parse_whois_date("2020.03.01"), Some(expected));
        assert_eq!(parse_whois_date("01-Mar-2020"), Some(expected));
        assert_eq!(parse_whois_date("01.03.2020"), Some(expected));
        assert_eq!(parse_whois_date("2020-03-01 00:00:00 UTC"), Some(expected));
        assert_eq!(parse_whois_date("2020-03-01T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_whois_date("before 1996"), None);
    }

    #[test]
    fn test_whois_client_creation() {
        let client = WhoisClient::new();
        assert_eq!(client.timeout, Duration::from_secs(10));

        let custom_client = WhoisClient::with_timeout(Duration::from_secs(3));
        assert_eq!(custom_client.timeout, Duration::from_secs(3));
    }
}
