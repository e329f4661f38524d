// homograph-check-lib/tests/integration.rs

//! End-to-end tests of the public API with in-memory lookup collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use homograph_check_lib::{
    AnalysisOptions, ConfusableMap, DomainResolver, HomographAnalyzer, HomographError,
    Registration, RegistrationError, RegistrationLookup, ResolutionError, RiskLevel,
    TechniqueRegistry, Technique, TldList,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Resolves a fixed set of domains; domains in `slow` hang for a minute.
#[derive(Default)]
struct FixtureResolver {
    answers: HashMap<String, IpAddr>,
    slow: HashSet<String>,
}

impl FixtureResolver {
    fn resolving(domains: &[&str]) -> Self {
        let answers = domains
            .iter()
            .map(|d| (d.to_string(), "192.0.2.1".parse().unwrap()))
            .collect();
        Self {
            answers,
            slow: HashSet::new(),
        }
    }
}

#[async_trait]
impl DomainResolver for FixtureResolver {
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>, ResolutionError> {
        if self.slow.contains(domain) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        match self.answers.get(domain) {
            Some(ip) => Ok([*ip].into_iter().collect()),
            None => Err(ResolutionError::NotFound),
        }
    }
}

/// Registration data keyed by domain, counting calls.
#[derive(Default)]
struct FixtureLookup {
    created: HashMap<String, DateTime<Utc>>,
    calls: AtomicUsize,
}

#[async_trait]
impl RegistrationLookup for FixtureLookup {
    async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.created
            .get(domain)
            .map(|created| Registration {
                registrar: Some("Fixture Registrar".to_string()),
                created_at: Some(*created),
                ..Registration::default()
            })
            .ok_or(RegistrationError::NotFound)
    }
}

/// Resolves every even-length domain; its age depends only on its name.
struct DeterministicFixture {
    base: DateTime<Utc>,
}

impl DeterministicFixture {
    fn age_days(domain: &str) -> i64 {
        domain.bytes().map(i64::from).sum::<i64>() % 1400
    }
}

#[async_trait]
impl DomainResolver for DeterministicFixture {
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>, ResolutionError> {
        if domain.len() % 2 == 0 {
            Ok(["198.51.100.7".parse().unwrap()].into_iter().collect())
        } else {
            Err(ResolutionError::NotFound)
        }
    }
}

#[async_trait]
impl RegistrationLookup for DeterministicFixture {
    async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError> {
        tokio::task::yield_now().await;
        Ok(Registration {
            created_at: Some(self.base - ChronoDuration::days(Self::age_days(domain))),
            ..Registration::default()
        })
    }
}

fn offline_analyzer() -> HomographAnalyzer {
    HomographAnalyzer::with_collaborators(
        Arc::new(FixtureResolver::default()),
        Arc::new(FixtureLookup::default()),
    )
}

#[test]
fn test_homoglyph_variant_of_example_com() {
    let variants = offline_analyzer().generate_all_variants("example.com").unwrap();

    let cyrillic = "\u{0435}xample.com";
    let variant = variants.get(cyrillic).expect("cyrillic e variant");
    assert_eq!(variant.technique, Technique::Homoglyph);
    assert_ne!(variant.domain, "example.com");
}

#[test]
fn test_transposition_and_tld_variation() {
    let variants = offline_analyzer().generate_all_variants("example.com").unwrap();

    assert_eq!(
        variants.get("examlpe.com").map(|v| &v.technique),
        Some(&Technique::Transposition)
    );
    assert_eq!(
        variants.get("example.net").map(|v| &v.technique),
        Some(&Technique::TldVariation)
    );
}

#[test]
fn test_target_never_in_its_variants() {
    let analyzer = offline_analyzer();
    for domain in ["example.com", "paypal.com", "a.io", "bücher.de", "bbc.co.uk"] {
        let target = analyzer.generator().target(domain).unwrap();
        let variants = analyzer.generate_all_variants(domain).unwrap();
        assert!(!variants.contains(&target.fqdn()), "{} generated itself", domain);
        assert!(!variants.contains(&target.unicode()), "{} generated itself", domain);
    }
}

#[test]
fn test_variants_are_unique_case_insensitively() {
    let variants = offline_analyzer().generate_all_variants("Example.COM").unwrap();
    let mut seen = HashSet::new();
    for variant in &variants {
        assert!(seen.insert(variant.domain.to_lowercase()), "duplicate {}", variant.domain);
    }
}

#[test]
fn test_generation_is_deterministic() {
    let first = offline_analyzer().generate_all_variants("example.com").unwrap();
    let second = offline_analyzer().generate_all_variants("example.com").unwrap();
    assert_eq!(first.as_slice(), second.as_slice());
}

#[test]
fn test_invalid_target_is_fatal() {
    let err = offline_analyzer().generate_all_variants("").unwrap_err();
    assert!(matches!(err, HomographError::InvalidDomain { .. }));

    let err = offline_analyzer().generate_all_variants("localhost").unwrap_err();
    assert!(matches!(err, HomographError::InvalidDomain { .. }));
}

#[test]
fn test_injected_data_sources() {
    let analyzer = offline_analyzer()
        .with_confusables(ConfusableMap::from_entries([('x', vec!['х'])]))
        .with_tlds(TldList::new(["net", "org"]))
        .with_registry(TechniqueRegistry::only(&[
            Technique::Homoglyph,
            Technique::TldVariation,
        ]));

    let variants = analyzer.generate_all_variants("example.com").unwrap();
    let domains: Vec<&str> = variants.iter().map(|v| v.domain.as_str()).collect();
    assert_eq!(domains, vec!["eхample.com", "example.net", "example.org"]);
}

#[tokio::test]
async fn test_one_year_old_registration_is_high_risk() {
    let mut lookup = FixtureLookup::default();
    lookup
        .created
        .insert("examlpe.com".to_string(), Utc::now() - ChronoDuration::days(365));
    let analyzer = HomographAnalyzer::with_collaborators(
        Arc::new(FixtureResolver::resolving(&["examlpe.com"])),
        Arc::new(lookup),
    );

    let options = AnalysisOptions::default()
        .with_threshold_years(2.0)
        .with_max_variants(None);
    let report = analyzer.analyze_domain("example.com", &options).await.unwrap();

    let result = report
        .results
        .iter()
        .find(|r| r.domain() == "examlpe.com")
        .unwrap();
    assert!(result.resolved);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(
        result.registration.as_ref().and_then(|r| r.registrar.as_deref()),
        Some("Fixture Registrar")
    );

    assert_eq!(report.summary.registered, 1);
    assert_eq!(report.summary.high, 1);
    assert_eq!(report.total_analyzed, report.total_generated);
    assert_eq!(report.suspicious().len(), 1);
}

#[tokio::test]
async fn test_results_do_not_depend_on_worker_count() {
    let base = Utc::now();
    let run = |workers: usize| async move {
        let fixture = Arc::new(DeterministicFixture { base });
        let analyzer = HomographAnalyzer::with_collaborators(fixture.clone(), fixture);
        let options = AnalysisOptions::default()
            .with_workers(workers)
            .with_max_variants(Some(150));
        analyzer.analyze_domain("example.com", &options).await.unwrap()
    };

    let serial = run(1).await;
    let parallel = run(16).await;

    let key = |report: &homograph_check_lib::AnalysisReport| {
        report
            .results
            .iter()
            .map(|r| (r.domain().to_string(), r.resolved, r.risk_level))
            .collect::<Vec<_>>()
    };
    assert_eq!(serial.total_analyzed, 150);
    assert_eq!(key(&serial), key(&parallel));
    assert_eq!(serial.summary, parallel.summary);
}

#[tokio::test]
async fn test_max_variants_bounds_analysis() {
    let analyzer = offline_analyzer();
    for max in [0, 1, 7, 40] {
        let options = AnalysisOptions::default().with_max_variants(Some(max));
        let report = analyzer.analyze_domain("example.com", &options).await.unwrap();
        assert!(report.total_analyzed <= max);
        assert!(report.total_generated >= report.total_analyzed);
    }
}

#[tokio::test]
async fn test_truncation_is_a_stable_prefix() {
    let analyzer = offline_analyzer();
    let all = analyzer.generate_all_variants("example.com").unwrap();

    let options = AnalysisOptions::default().with_max_variants(Some(25));
    let report = analyzer.analyze_domain("example.com", &options).await.unwrap();

    let analyzed: Vec<&str> = report.results.iter().map(|r| r.domain()).collect();
    let prefix: Vec<&str> = all.iter().take(25).map(|v| v.domain.as_str()).collect();
    assert_eq!(analyzed, prefix);
}

#[tokio::test(start_paused = true)]
async fn test_dns_timeout_skips_registration_lookup() {
    let mut resolver = FixtureResolver::resolving(&["examlpe.com", "example.net"]);
    resolver.slow.insert("examlpe.com".to_string());
    let lookup = Arc::new(FixtureLookup::default());
    let analyzer = HomographAnalyzer::with_collaborators(Arc::new(resolver), lookup.clone())
        .with_registry(TechniqueRegistry::only(&[
            Technique::Transposition,
            Technique::TldVariation,
        ]));

    let options = AnalysisOptions::default().with_dns_timeout(Duration::from_secs(1));
    let started = tokio::time::Instant::now();
    let report = analyzer.analyze_domain("example.com", &options).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let slow = report
        .results
        .iter()
        .find(|r| r.domain() == "examlpe.com")
        .unwrap();
    assert!(!slow.resolved);
    assert!(slow.errors[0].is_timeout());
    assert_eq!(slow.risk_level, RiskLevel::Unknown);

    let fast = report
        .results
        .iter()
        .find(|r| r.domain() == "example.net")
        .unwrap();
    assert!(fast.resolved);

    // only example.net reached the lookup stage
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_report_serializes_risk_levels_and_techniques() {
    let analyzer = offline_analyzer().with_registry(TechniqueRegistry::only(&[Technique::Omission]));
    let options = AnalysisOptions::default().with_max_variants(Some(1));
    let report = analyzer.analyze_domain("example.com", &options).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["target_domain"], "example.com");
    assert_eq!(json["results"][0]["risk_level"], "UNKNOWN");
    assert_eq!(json["results"][0]["variant"]["technique"], "omission");
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_quick_check_live_lookup() {
    let analyzer = HomographAnalyzer::new().unwrap();
    let result = analyzer
        .quick_check("google.com", &AnalysisOptions::default())
        .await
        .unwrap();

    assert!(result.resolved);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!(result.age_years.unwrap() > 20.0);
}
