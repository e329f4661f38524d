//! # Homograph Check Library
//!
//! Generates look-alike ("homograph") and typosquat variants of a domain and
//! assesses each variant's impersonation risk from whether it resolves and
//! how recently it was registered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use homograph_check_lib::{AnalysisOptions, HomographAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = HomographAnalyzer::new()?;
//!     let report = analyzer
//!         .analyze_domain("example.com", &AnalysisOptions::default())
//!         .await?;
//!
//!     println!(
//!         "{}: {} variants, {} registered, {} high risk",
//!         report.target_domain,
//!         report.total_generated,
//!         report.summary.registered,
//!         report.summary.high
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Variant generation**: homoglyph, typo, TLD, affix and encoding techniques
//! - **Concurrent analysis**: bounded worker pool with per-call timeouts
//! - **RDAP with WHOIS fallback**: registrar and creation date lookups
//! - **Bootstrap Registry**: RDAP endpoint discovery for any TLD
//! - **Injectable collaborators**: bring your own resolver, lookup and data tables

pub use analyzer::HomographAnalyzer;
pub use concurrent::{AbortHandle, AnalysisOrchestrator};
pub use config::{
    load_confusable_map, load_env_config, load_tld_list, parse_timeout_string, ConfigManager,
    DataConfig, DefaultsConfig, EnvConfig, FileConfig,
};
pub use error::{
    ErrorKind, HomographError, RegistrationError, ResolutionError, Stage, VariantError,
};
pub use protocols::{
    DomainResolver, FallbackLookup, RdapClient, RegistrationLookup, SystemResolver, WhoisClient,
};
pub use types::{
    AnalysisOptions, AnalysisReport, AnalysisResult, AnalysisSummary, LookupMethod, Registration,
    RiskLevel, TargetDomain, Technique, Variant,
};
pub use utils::{normalize_domain, to_ascii_domain, to_unicode_domain};

// Public modules
pub mod aggregate;
pub mod generate;
pub mod protocols;
pub mod risk;

pub use aggregate::ResultAggregator;
pub use generate::{
    Candidate, ConfusableMap, GenerationContext, TechniqueRegistry, TldList, VariantGenerator,
    VariantSet, VariantTechnique,
};
pub use risk::classify;

// Internal modules
mod analyzer;
mod concurrent;
mod config;
mod error;
mod types;
mod utils;

pub type Result<T> = std::result::Result<T, HomographError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "rdap")]
    features.push("rdap");

    #[cfg(feature = "whois")]
    features.push("whois");

    #[cfg(feature = "bootstrap")]
    features.push("bootstrap");

    features
}
