//! Core data types for homograph analysis.
//!
//! This module defines the target domain, generated variants, per-variant
//! analysis results, the final report, and the options that drive a run.

use crate::error::{HomographError, VariantError};
use crate::utils::{normalize_domain, split_domain, to_unicode_domain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Normalized form of the domain being protected.
///
/// The identity is lower-case ASCII (punycode for internationalized input).
/// The Unicode form of the name is kept alongside it, since look-alikes are
/// built from what a reader sees. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDomain {
    name: String,
    unicode_name: String,
    tld: String,
}

impl TargetDomain {
    /// Normalize `input`, splitting off the last label as the TLD.
    pub fn parse(input: &str) -> Result<Self, HomographError> {
        Self::parse_with_suffixes(input, &[])
    }

    /// Normalize `input`, splitting off the longest matching multi-label
    /// suffix (e.g. `co.uk`) from `suffixes` as the TLD.
    pub fn parse_with_suffixes(input: &str, suffixes: &[String]) -> Result<Self, HomographError> {
        let ascii = normalize_domain(input)?;
        let (name, tld) = split_domain(&ascii, suffixes);
        if name.is_empty() || tld.is_empty() {
            return Err(HomographError::invalid_domain(
                input,
                "Domain name needs at least a name and a TLD",
            ));
        }
        let unicode_name = to_unicode_domain(&name);
        Ok(Self {
            name,
            unicode_name,
            tld,
        })
    }

    /// The registrable name without the TLD, in ASCII (e.g. `example`,
    /// `xn--bcher-kva`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registrable name as displayed (e.g. `bücher`). Equal to `name()`
    /// for ASCII targets.
    pub fn unicode_name(&self) -> &str {
        &self.unicode_name
    }

    /// The TLD / public suffix (e.g. `com`, `co.uk`).
    pub fn tld(&self) -> &str {
        &self.tld
    }

    /// The full ASCII domain (e.g. `example.com`).
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.name, self.tld)
    }

    /// The Unicode display form of the domain.
    pub fn unicode(&self) -> String {
        to_unicode_domain(&self.fqdn())
    }
}

impl fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.tld)
    }
}

/// Transformation technique that produced a variant.
///
/// Serialized as its snake_case identifier; custom techniques serialize as
/// their registered name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Technique {
    Homoglyph,
    AsciiVisual,
    VowelSwap,
    AdjacentKey,
    Transposition,
    Omission,
    Duplication,
    Insertion,
    TldVariation,
    Hyphenation,
    DotInsertion,
    Affix,
    Punycode,
    BitFlip,
    WordCombination,
    Phonetic,
    /// Result of checking a single domain directly, without generation
    Direct,
    Custom(String),
}

impl Technique {
    /// All built-in generation techniques in priority order.
    pub const BUILTIN: [Technique; 16] = [
        Technique::Homoglyph,
        Technique::AsciiVisual,
        Technique::VowelSwap,
        Technique::AdjacentKey,
        Technique::Transposition,
        Technique::Omission,
        Technique::Duplication,
        Technique::Insertion,
        Technique::TldVariation,
        Technique::Hyphenation,
        Technique::DotInsertion,
        Technique::Affix,
        Technique::Punycode,
        Technique::BitFlip,
        Technique::WordCombination,
        Technique::Phonetic,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Technique::Homoglyph => "homoglyph",
            Technique::AsciiVisual => "ascii_visual",
            Technique::VowelSwap => "vowel_swap",
            Technique::AdjacentKey => "adjacent_key",
            Technique::Transposition => "transposition",
            Technique::Omission => "omission",
            Technique::Duplication => "duplication",
            Technique::Insertion => "insertion",
            Technique::TldVariation => "tld_variation",
            Technique::Hyphenation => "hyphenation",
            Technique::DotInsertion => "dot_insertion",
            Technique::Affix => "affix",
            Technique::Punycode => "punycode",
            Technique::BitFlip => "bit_flip",
            Technique::WordCombination => "word_combination",
            Technique::Phonetic => "phonetic",
            Technique::Direct => "direct",
            Technique::Custom(name) => name,
        }
    }

    /// Look up a technique by identifier. Unknown names become `Custom`.
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        Self::BUILTIN
            .iter()
            .chain(std::iter::once(&Technique::Direct))
            .find(|t| t.as_str() == normalized)
            .cloned()
            .unwrap_or_else(|| Technique::Custom(name.trim().to_string()))
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Technique::Custom(_) | Technique::Direct)
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Technique {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Technique {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Technique::from_name(&name))
    }
}

/// A candidate look-alike domain.
///
/// Never equal to the normalized target and always a valid label sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// The candidate domain (Unicode for homoglyph variants)
    pub domain: String,

    /// Technique that first produced this domain
    pub technique: Technique,

    /// Human-readable description of the transformation
    pub detail: String,

    /// Position in generation order; reports are sorted by it
    pub sequence: usize,
}

/// Registration metadata returned by a registration lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Registration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Which service answered
    pub method: LookupMethod,
}

/// Source of registration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LookupMethod {
    #[serde(rename = "rdap")]
    Rdap,

    #[serde(rename = "whois")]
    Whois,

    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMethod::Rdap => write!(f, "RDAP"),
            LookupMethod::Whois => write!(f, "WHOIS"),
            LookupMethod::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Age-based risk of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Outcome of analyzing one variant.
///
/// Built by exactly one worker task and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub variant: Variant,

    /// Whether the variant resolved in DNS
    pub resolved: bool,

    /// Resolved addresses; empty when unresolved
    pub ip_addresses: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,

    /// Years since registration creation, at analysis time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_years: Option<f64>,

    pub risk_level: RiskLevel,

    /// Lookup failures in the order they happened
    pub errors: Vec<VariantError>,
}

impl AnalysisResult {
    /// A result with no lookups performed.
    pub fn unchecked(variant: Variant) -> Self {
        Self {
            variant,
            resolved: false,
            ip_addresses: BTreeSet::new(),
            registration: None,
            age_years: None,
            risk_level: RiskLevel::Unknown,
            errors: Vec::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.variant.domain
    }

    /// Resolved and classified HIGH or MEDIUM.
    pub fn is_suspicious(&self) -> bool {
        self.resolved
            && matches!(self.risk_level, RiskLevel::High | RiskLevel::Medium)
    }
}

/// Summary counts of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnalysisSummary {
    /// Variants that resolved in DNS
    pub registered: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl AnalysisSummary {
    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
            RiskLevel::Unknown => self.unknown,
        }
    }
}

/// Final report of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub target_domain: String,
    pub timestamp: DateTime<Utc>,
    pub threshold_years: f64,
    pub total_generated: usize,
    pub total_analyzed: usize,
    pub summary: AnalysisSummary,

    /// Results in generation order
    pub results: Vec<AnalysisResult>,
}

impl AnalysisReport {
    /// Resolved results classified HIGH or MEDIUM, in generation order.
    pub fn suspicious(&self) -> Vec<&AnalysisResult> {
        self.results.iter().filter(|r| r.is_suspicious()).collect()
    }
}

/// Timeouts travel as fractional seconds.
mod duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| D::Error::custom(format!("invalid duration in seconds: {}", secs)))
    }
}

/// Options for `analyze_domain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Resolve each variant in DNS
    /// Default: true
    pub check_dns: bool,

    /// Look up registration data for resolved variants
    /// Default: true
    pub check_whois: bool,

    /// Cap on analyzed variants; `None` analyzes everything
    /// Default: 1000
    pub max_variants: Option<usize>,

    /// Maximum number of in-flight variant tasks
    /// Default: 10, Range: 1-100
    pub workers: usize,

    /// Timeout for each DNS resolution
    /// Default: 5 seconds
    #[serde(with = "duration_secs")]
    pub dns_timeout: Duration,

    /// Timeout for each registration lookup
    /// Default: 10 seconds
    #[serde(with = "duration_secs")]
    pub whois_timeout: Duration,

    /// Trust threshold in years
    /// Default: 2.0
    pub threshold_years: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            check_dns: true,
            check_whois: true,
            max_variants: Some(1000),
            workers: 10,
            dns_timeout: Duration::from_secs(5),
            whois_timeout: Duration::from_secs(10),
            threshold_years: 2.0,
        }
    }
}

impl AnalysisOptions {
    /// Set the worker count, clamped to 1-100.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, 100);
        self
    }

    pub fn with_dns(mut self, enabled: bool) -> Self {
        self.check_dns = enabled;
        self
    }

    pub fn with_whois(mut self, enabled: bool) -> Self {
        self.check_whois = enabled;
        self
    }

    pub fn with_max_variants(mut self, max_variants: Option<usize>) -> Self {
        self.max_variants = max_variants;
        self
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    pub fn with_whois_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = timeout;
        self
    }

    pub fn with_threshold_years(mut self, threshold_years: f64) -> Self {
        self.threshold_years = threshold_years;
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), HomographError> {
        if !self.threshold_years.is_finite() || self.threshold_years < 0.0 {
            return Err(HomographError::config(format!(
                "Threshold must be a non-negative number of years, got {}",
                self.threshold_years
            )));
        }
        if self.workers == 0 || self.workers > 100 {
            return Err(HomographError::config(
                "Workers must be between 1 and 100",
            ));
        }
        if self.dns_timeout.is_zero() || self.whois_timeout.is_zero() {
            return Err(HomographError::config("Timeouts must be greater than zero"));
        }
        Ok(())
    }
}
