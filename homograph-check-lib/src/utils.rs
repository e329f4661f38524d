//! Utility functions for domain processing and validation.
//!
//! This module contains helpers for turning user input into a normalized
//! ASCII domain, for validating generated candidates label by label, and
//! for converting between Unicode and punycode (IDNA) forms.

use crate::error::HomographError;
use url::{Host, Url};

/// Maximum length of a full domain name in characters.
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Maximum length of a single label.
pub const MAX_LABEL_LENGTH: usize = 63;

/// Normalize raw user input into a lower-cased ASCII domain.
///
/// Strips a URL scheme, any path/query/fragment, a port, a trailing dot and
/// a leading `www.` label. Non-ASCII input is converted to its punycode form.
///
/// # Errors
///
/// Returns `HomographError::InvalidDomain` when nothing usable remains, when
/// the input is an IP address, or when a label is not a valid LDH label.
pub fn normalize_domain(input: &str) -> Result<String, HomographError> {
    let raw = input.trim().to_lowercase();
    if raw.is_empty() {
        return Err(HomographError::invalid_domain(
            input,
            "Domain name cannot be empty",
        ));
    }

    let host = if raw.contains("://") {
        let url = Url::parse(&raw)
            .map_err(|e| HomographError::invalid_domain(input, format!("invalid URL: {}", e)))?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| HomographError::invalid_domain(input, "URL has no host"))?
    } else {
        let end = raw
            .find(|c| c == '/' || c == '?' || c == '#')
            .unwrap_or(raw.len());
        strip_port(&raw[..end]).to_string()
    };

    let mut host = host.trim_end_matches('.').to_string();
    if let Some(rest) = host.strip_prefix("www.") {
        if rest.contains('.') {
            host = rest.to_string();
        }
    }

    if host.is_empty() {
        return Err(HomographError::invalid_domain(input, "no host name found"));
    }

    let ascii = to_ascii_domain(&host).ok_or_else(|| {
        HomographError::invalid_domain(input, "cannot be converted to an IDNA domain")
    })?;

    validate_ascii_domain(input, &ascii)?;
    Ok(ascii)
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

fn validate_ascii_domain(input: &str, domain: &str) -> Result<(), HomographError> {
    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(HomographError::invalid_domain(input, "Domain name too long"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(HomographError::invalid_domain(
            input,
            "Domain name needs at least a name and a TLD",
        ));
    }

    if labels.iter().all(|l| l.chars().all(|c| c.is_ascii_digit())) {
        return Err(HomographError::invalid_domain(
            input,
            "IP addresses are not domain names",
        ));
    }

    for label in &labels {
        if !is_valid_label(label) || !label.is_ascii() {
            return Err(HomographError::invalid_domain(
                input,
                format!("invalid label '{}'", label),
            ));
        }
    }

    Ok(())
}

/// Check a single DNS label.
///
/// Accepts ASCII letters, digits and hyphens plus non-ASCII alphanumeric
/// characters (IDN labels before punycode encoding). A label cannot be empty,
/// exceed 63 characters, or start/end with a hyphen.
pub fn is_valid_label(label: &str) -> bool {
    let len = label.chars().count();
    if len == 0 || len > MAX_LABEL_LENGTH {
        return false;
    }

    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || (!c.is_ascii() && c.is_alphanumeric()))
}

/// Check that a candidate is a syntactically valid label sequence with at
/// least two labels.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.chars().count() > MAX_DOMAIN_LENGTH {
        return false;
    }

    let mut labels = 0;
    for label in domain.split('.') {
        if !is_valid_label(label) {
            return false;
        }
        labels += 1;
    }

    labels >= 2
}

/// Convert a domain to its ASCII (punycode) form.
///
/// ASCII input is only lower-cased. Returns `None` when IDNA processing
/// rejects the name or when the input is an IP address.
pub fn to_ascii_domain(domain: &str) -> Option<String> {
    if domain.is_ascii() {
        return Some(domain.to_ascii_lowercase());
    }

    match Host::parse(domain) {
        Ok(Host::Domain(ascii)) => Some(ascii),
        _ => None,
    }
}

/// Convert a punycode domain back to its Unicode display form.
pub fn to_unicode_domain(domain: &str) -> String {
    if !domain.split('.').any(|l| l.starts_with("xn--")) {
        return domain.to_string();
    }

    let unicode = url::quirks::domain_to_unicode(domain);
    if unicode.is_empty() {
        domain.to_string()
    } else {
        unicode
    }
}

/// Split a normalized domain into its registrable name and TLD, using the
/// longest suffix from `known_suffixes` that leaves a non-empty name.
///
/// Falls back to the last label when no known suffix matches.
pub fn split_domain(domain: &str, known_suffixes: &[String]) -> (String, String) {
    let mut best: Option<&str> = None;

    for suffix in known_suffixes {
        let dotted = format!(".{}", suffix);
        if domain.ends_with(&dotted) && domain.len() > dotted.len() {
            match best {
                Some(current) if current.len() >= suffix.len() => {}
                _ => best = Some(suffix.as_str()),
            }
        }
    }

    match best {
        Some(suffix) => {
            let name = &domain[..domain.len() - suffix.len() - 1];
            (name.to_string(), suffix.to_string())
        }
        None => match domain.rsplit_once('.') {
            Some((name, tld)) => (name.to_string(), tld.to_string()),
            None => (domain.to_string(), String::new()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_domain() {
        assert_eq!(normalize_domain("Example.COM").unwrap(), "example.com");
        assert_eq!(normalize_domain("  example.com.  ").unwrap(), "example.com");
    }

    #[test]
    fn test_normalize_strips_url_parts() {
        assert_eq!(
            normalize_domain("https://www.example.com/login?next=1").unwrap(),
            "example.com"
        );
        assert_eq!(normalize_domain("example.com:8443/path").unwrap(), "example.com");
        assert_eq!(normalize_domain("www.example.org").unwrap(), "example.org");
    }

    #[test]
    fn test_normalize_keeps_www_when_it_is_the_name() {
        assert_eq!(normalize_domain("www.com").unwrap(), "www.com");
    }

    #[test]
    fn test_normalize_converts_idn_to_punycode() {
        let ascii = normalize_domain("bücher.de").unwrap();
        assert_eq!(ascii, "xn--bcher-kva.de");
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        assert!(normalize_domain("").is_err());
        assert!(normalize_domain("localhost").is_err());
        assert!(normalize_domain("-bad-.com").is_err());
        assert!(normalize_domain("exa mple.com").is_err());
        assert!(normalize_domain("192.168.1.1").is_err());
        assert!(normalize_domain("under_score.com").is_err());
    }

    #[test]
    fn test_is_valid_label() {
        assert!(is_valid_label("example"));
        assert!(is_valid_label("ex-ample"));
        assert!(is_valid_label("еxample")); // Cyrillic е
        assert!(!is_valid_label(""));
        assert!(!is_valid_label("-example"));
        assert!(!is_valid_label("example-"));
        assert!(!is_valid_label("exa$mple"));
        assert!(!is_valid_label(&"a".repeat(64)));
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("exa.mple.com"));
        assert!(!is_valid_domain("example"));
        assert!(!is_valid_domain("example..com"));
        assert!(!is_valid_domain(".example.com"));
    }

    #[test]
    fn test_ascii_unicode_round_trip() {
        let ascii = to_ascii_domain("еxample.com").unwrap();
        assert!(ascii.starts_with("xn--"));
        assert_eq!(to_unicode_domain(&ascii), "еxample.com");
        assert_eq!(to_unicode_domain("example.com"), "example.com");
    }

    #[test]
    fn test_split_domain_prefers_longest_suffix() {
        let suffixes = vec!["uk".to_string(), "co.uk".to_string(), "com".to_string()];
        assert_eq!(
            split_domain("example.co.uk", &suffixes),
            ("example".to_string(), "co.uk".to_string())
        );
        assert_eq!(
            split_domain("example.com", &suffixes),
            ("example".to_string(), "com".to_string())
        );
        assert_eq!(
            split_domain("example.xyz", &[]),
            ("example".to_string(), "xyz".to_string())
        );
    }
}
