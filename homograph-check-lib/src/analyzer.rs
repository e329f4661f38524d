//! The library's main entry point.
//!
//! `HomographAnalyzer` ties the variant generator to the analysis
//! orchestrator and owns the lookup collaborators for its lifetime.

use crate::concurrent::{AbortHandle, AnalysisOrchestrator};
use crate::error::HomographError;
use crate::generate::{ConfusableMap, TechniqueRegistry, TldList, VariantGenerator, VariantSet};
use crate::protocols::{DomainResolver, FallbackLookup, RegistrationLookup, SystemResolver};
use crate::types::{AnalysisOptions, AnalysisReport, AnalysisResult, Technique, Variant};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Generates look-alike variants of a domain and assesses how risky each
/// registered one is.
///
/// # Example
///
/// ```rust,no_run
/// use homograph_check_lib::{AnalysisOptions, HomographAnalyzer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let analyzer = HomographAnalyzer::new()?;
///     let options = AnalysisOptions::default().with_max_variants(Some(200));
///     let report = analyzer.analyze_domain("example.com", &options).await?;
///
///     for result in report.suspicious() {
///         println!("{} {}", result.risk_level, result.domain());
///     }
///     Ok(())
/// }
/// ```
pub struct HomographAnalyzer {
    generator: VariantGenerator,
    resolver: Arc<dyn DomainResolver>,
    registration: Arc<dyn RegistrationLookup>,
}

impl HomographAnalyzer {
    /// Analyzer with the built-in techniques and tables, the system DNS
    /// resolver and the RDAP/WHOIS lookup chain.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the RDAP HTTP client cannot be built.
    pub fn new() -> Result<Self, HomographError> {
        let registration = FallbackLookup::new(Duration::from_secs(10))?;
        Ok(Self::with_collaborators(
            Arc::new(SystemResolver::new()),
            Arc::new(registration),
        ))
    }

    /// Analyzer using the given lookup collaborators.
    pub fn with_collaborators(
        resolver: Arc<dyn DomainResolver>,
        registration: Arc<dyn RegistrationLookup>,
    ) -> Self {
        Self {
            generator: VariantGenerator::builtin(),
            resolver,
            registration,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DomainResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_registration_lookup(mut self, registration: Arc<dyn RegistrationLookup>) -> Self {
        self.registration = registration;
        self
    }

    /// Replace the confusable-character table.
    pub fn with_confusables(mut self, confusables: ConfusableMap) -> Self {
        self.generator = self.generator.with_confusables(confusables);
        self
    }

    /// Replace the TLD list used for TLD variation and suffix detection.
    pub fn with_tlds(mut self, tlds: TldList) -> Self {
        self.generator = self.generator.with_tlds(tlds);
        self
    }

    /// Replace the set of techniques.
    pub fn with_registry(mut self, registry: TechniqueRegistry) -> Self {
        self.generator = self.generator.with_registry(registry);
        self
    }

    pub fn generator(&self) -> &VariantGenerator {
        &self.generator
    }

    /// Techniques this analyzer runs, in priority order.
    pub fn available_techniques(&self) -> Vec<Technique> {
        self.generator.registry().techniques()
    }

    /// Every variant of `domain`, uncapped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDomain` if `domain` cannot be normalized.
    pub fn generate_all_variants(&self, domain: &str) -> Result<VariantSet, HomographError> {
        let target = self.generator.target(domain)?;
        Ok(self.generator.generate(&target))
    }

    /// Generate the variants of `domain` and analyze them.
    ///
    /// The variant set is capped at `options.max_variants` in generation
    /// order; the report's `total_generated` still counts the full set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDomain` for a malformed target and `ConfigError` for
    /// unusable options. Both are raised before any lookup starts. Lookup
    /// failures never fail the run; they are recorded on each result.
    pub async fn analyze_domain(
        &self,
        domain: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport, HomographError> {
        self.run(domain, options, None).await
    }

    /// Like `analyze_domain`, but stops dispatching new variants once
    /// `abort` is triggered. Variants already in flight are still reported.
    pub async fn analyze_domain_with_abort(
        &self,
        domain: &str,
        options: &AnalysisOptions,
        abort: &AbortHandle,
    ) -> Result<AnalysisReport, HomographError> {
        self.run(domain, options, Some(abort)).await
    }

    /// Analyze `domain` itself, without generating variants.
    pub async fn quick_check(
        &self,
        domain: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, HomographError> {
        options.validate()?;
        let target = self.generator.target(domain)?;

        let variant = Variant {
            domain: target.fqdn(),
            technique: Technique::Direct,
            detail: "target domain".to_string(),
            sequence: 0,
        };
        Ok(self
            .orchestrator()
            .analyze_variant(variant, options, Utc::now())
            .await)
    }

    /// Analyze `domain` and keep only the suspicious results.
    pub async fn suspicious_domains(
        &self,
        domain: &str,
        options: &AnalysisOptions,
    ) -> Result<Vec<AnalysisResult>, HomographError> {
        let report = self.analyze_domain(domain, options).await?;
        Ok(report.results.into_iter().filter(|r| r.is_suspicious()).collect())
    }

    async fn run(
        &self,
        domain: &str,
        options: &AnalysisOptions,
        abort: Option<&AbortHandle>,
    ) -> Result<AnalysisReport, HomographError> {
        options.validate()?;
        let target = self.generator.target(domain)?;

        let mut variants = self.generator.generate(&target);
        let total_generated = variants.len();
        if let Some(max) = options.max_variants {
            variants.truncate(max);
        }

        Ok(self
            .orchestrator()
            .analyze(
                &target.fqdn(),
                variants.into_vec(),
                total_generated,
                options,
                Utc::now(),
                abort,
            )
            .await)
    }

    fn orchestrator(&self) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(self.resolver.clone(), self.registration.clone())
    }
}
