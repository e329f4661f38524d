//! Error handling for homograph analysis.
//!
//! Two layers of failure exist. `HomographError` is a run-level error: it
//! aborts an operation before any lookup is started (bad target domain,
//! bad configuration, unreadable data file). Lookup failures for a single
//! variant are never run-level; they are captured as `VariantError`s inside
//! that variant's `AnalysisResult`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for run-level failures.
#[derive(Debug, Clone)]
pub enum HomographError {
    /// The target domain cannot be normalized into a valid domain name
    InvalidDomain { domain: String, reason: String },

    /// Network-related errors outside of per-variant lookups
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Malformed JSON / TOML / data-file content
    ParseError { message: String },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading config, data files or domain lists
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl HomographError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for HomographError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::ParseError { message } => write!(f, "Parse error: {}", message),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for HomographError {}

impl From<reqwest::Error> for HomographError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for HomographError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for HomographError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", err))
    }
}

/// Failure of the DNS resolution collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    Timeout,
    /// NXDOMAIN or no address records
    NotFound,
    NetworkError(String),
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "DNS resolution timed out"),
            Self::NotFound => write!(f, "domain does not resolve"),
            Self::NetworkError(msg) => write!(f, "DNS network error: {}", msg),
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Failure of the registration lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    Timeout,
    /// The registry has no record of the domain
    NotFound,
    RateLimited,
    /// A response arrived but the registration data could not be read from it
    ParseError(String),
    /// No usable lookup service for the domain (transport failure, unknown
    /// TLD, missing `whois` binary)
    Unavailable(String),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "registration lookup timed out"),
            Self::NotFound => write!(f, "no registration record"),
            Self::RateLimited => write!(f, "registration service rate limited the query"),
            Self::ParseError(msg) => write!(f, "unreadable registration data: {}", msg),
            Self::Unavailable(msg) => write!(f, "registration lookup unavailable: {}", msg),
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Pipeline stage a per-variant error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Dns,
    Registration,
}

/// Kind of a per-variant lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    NotFound,
    NetworkError,
    RateLimited,
    ParseError,
    Unavailable,
}

/// A lookup failure recorded inside one variant's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantError {
    pub stage: Stage,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VariantError {
    pub fn new(stage: Stage, kind: ErrorKind) -> Self {
        Self {
            stage,
            kind,
            message: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

impl From<ResolutionError> for VariantError {
    fn from(err: ResolutionError) -> Self {
        let (kind, message) = match err {
            ResolutionError::Timeout => (ErrorKind::Timeout, None),
            ResolutionError::NotFound => (ErrorKind::NotFound, None),
            ResolutionError::NetworkError(msg) => (ErrorKind::NetworkError, Some(msg)),
        };
        Self {
            stage: Stage::Dns,
            kind,
            message,
        }
    }
}

impl From<RegistrationError> for VariantError {
    fn from(err: RegistrationError) -> Self {
        let (kind, message) = match err {
            RegistrationError::Timeout => (ErrorKind::Timeout, None),
            RegistrationError::NotFound => (ErrorKind::NotFound, None),
            RegistrationError::RateLimited => (ErrorKind::RateLimited, None),
            RegistrationError::ParseError(msg) => (ErrorKind::ParseError, Some(msg)),
            RegistrationError::Unavailable(msg) => (ErrorKind::Unavailable, Some(msg)),
        };
        Self {
            stage: Stage::Registration,
            kind,
            message,
        }
    }
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Dns => "dns",
            Stage::Registration => "registration",
        };
        match &self.message {
            Some(msg) => write!(f, "{}: {:?} ({})", stage, self.kind, msg),
            None => write!(f, "{}: {:?}", stage, self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_domain_display() {
        let err = HomographError::invalid_domain("exa mple", "contains whitespace");
        assert_eq!(
            err.to_string(),
            "Invalid domain 'exa mple': contains whitespace"
        );
    }

    #[test]
    fn test_resolution_error_maps_to_dns_stage() {
        let err: VariantError = ResolutionError::Timeout.into();
        assert_eq!(err.stage, Stage::Dns);
        assert!(err.is_timeout());

        let err: VariantError = ResolutionError::NetworkError("refused".into()).into();
        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(err.message.as_deref(), Some("refused"));
    }

    #[test]
    fn test_registration_error_maps_to_registration_stage() {
        let err: VariantError = RegistrationError::RateLimited.into();
        assert_eq!(err.stage, Stage::Registration);
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.to_string(), "registration: RateLimited");
    }

    #[test]
    fn test_variant_error_serializes_snake_case() {
        let err: VariantError = RegistrationError::ParseError("no date".into()).into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["stage"], "registration");
        assert_eq!(json["kind"], "parse_error");
        assert_eq!(json["message"], "no date");
    }
}
