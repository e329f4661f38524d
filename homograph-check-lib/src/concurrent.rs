//! Bounded-concurrency analysis of a variant set.
//!
//! Each variant is one task: resolve, look up registration data for
//! resolved variants, classify. At most `workers` tasks are in flight; the rest wait in the
//! stream. Both external calls are wrapped in their own timeout, and a
//! timeout only ends that call. Tasks share nothing but the stream that
//! collects their results, so one variant's failure never touches another.

use crate::aggregate::ResultAggregator;
use crate::error::{RegistrationError, ResolutionError, VariantError};
use crate::protocols::{DomainResolver, RegistrationLookup};
use crate::risk::{age_in_years, classify};
use crate::types::{AnalysisOptions, AnalysisReport, AnalysisResult, Variant};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-side abort switch.
///
/// Once triggered, no further variants are dispatched. Tasks already in
/// flight run to completion (or to their own timeouts) and are reported.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Drives the per-variant lookups.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    resolver: Arc<dyn DomainResolver>,
    registration: Arc<dyn RegistrationLookup>,
}

impl AnalysisOrchestrator {
    pub fn new(resolver: Arc<dyn DomainResolver>, registration: Arc<dyn RegistrationLookup>) -> Self {
        Self {
            resolver,
            registration,
        }
    }

    /// Analyze `variants` and assemble the report.
    ///
    /// `now` is the reference time for registration age. `total_generated`
    /// is the size of the variant set before any truncation.
    pub async fn analyze(
        &self,
        target: &str,
        variants: Vec<Variant>,
        total_generated: usize,
        options: &AnalysisOptions,
        now: DateTime<Utc>,
        abort: Option<&AbortHandle>,
    ) -> AnalysisReport {
        tracing::info!(
            domain = target,
            variants = variants.len(),
            workers = options.workers,
            "starting analysis"
        );

        let workers = options.workers.max(1);
        let results: Vec<AnalysisResult> = stream::iter(variants)
            .take_while(|_| {
                let keep_going = abort.map_or(true, |a| !a.is_aborted());
                async move { keep_going }
            })
            .map(|variant| self.analyze_variant(variant, options, now))
            .buffer_unordered(workers)
            .collect()
            .await;

        let report = ResultAggregator::new(target, now, options.threshold_years, total_generated)
            .aggregate(results);

        tracing::info!(
            domain = target,
            analyzed = report.total_analyzed,
            registered = report.summary.registered,
            high = report.summary.high,
            medium = report.summary.medium,
            "analysis finished"
        );
        report
    }

    /// Run one variant end to end.
    pub async fn analyze_variant(
        &self,
        variant: Variant,
        options: &AnalysisOptions,
        now: DateTime<Utc>,
    ) -> AnalysisResult {
        let mut result = AnalysisResult::unchecked(variant);

        if options.check_dns {
            let resolved = tokio::time::timeout(
                options.dns_timeout,
                self.resolver.resolve(&result.variant.domain),
            )
            .await
            .unwrap_or(Err(ResolutionError::Timeout));

            match resolved {
                Ok(addresses) => {
                    result.resolved = true;
                    result.ip_addresses = addresses.iter().map(|ip| ip.to_string()).collect();
                }
                Err(e) => {
                    tracing::debug!(domain = %result.variant.domain, error = %e, "not resolved");
                    result.errors.push(VariantError::from(e));
                    return result;
                }
            }
        }

        if result.resolved && options.check_whois {
            let looked_up = tokio::time::timeout(
                options.whois_timeout,
                self.registration.lookup(&result.variant.domain),
            )
            .await
            .unwrap_or(Err(RegistrationError::Timeout));

            match looked_up {
                Ok(registration) => {
                    result.age_years = registration.created_at.map(|c| age_in_years(c, now));
                    result.registration = Some(registration);
                }
                Err(e) => {
                    tracing::debug!(domain = %result.variant.domain, error = %e, "no registration data");
                    result.errors.push(VariantError::from(e));
                }
            }
        }

        result.risk_level = classify(result.age_years, options.threshold_years);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Stage};
    use crate::types::{Registration, RiskLevel, Technique};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::{BTreeSet, HashMap};
    use std::net::IpAddr;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct FixtureResolver {
        answers: HashMap<String, Vec<IpAddr>>,
        slow: Vec<String>,
    }

    #[async_trait]
    impl DomainResolver for FixtureResolver {
        async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>, ResolutionError> {
            if self.slow.iter().any(|d| d == domain) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.answers
                .get(domain)
                .map(|ips| ips.iter().copied().collect())
                .ok_or(ResolutionError::NotFound)
        }
    }

    #[derive(Default)]
    struct FixtureLookup {
        created: HashMap<String, DateTime<Utc>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistrationLookup for FixtureLookup {
        async fn lookup(&self, domain: &str) -> Result<Registration, RegistrationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.created.get(domain) {
                Some(created) => Ok(Registration {
                    registrar: Some("Fixture Registrar".to_string()),
                    created_at: Some(*created),
                    ..Registration::default()
                }),
                None => Err(RegistrationError::NotFound),
            }
        }
    }

    fn variant(domain: &str, sequence: usize) -> Variant {
        Variant {
            domain: domain.to_string(),
            technique: Technique::Omission,
            detail: String::new(),
            sequence,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_resolved_young_domain_is_high() {
        let now = Utc::now();
        let mut resolver = FixtureResolver::default();
        resolver.answers.insert("exmple.com".into(), vec![ip("192.0.2.1")]);
        let mut lookup = FixtureLookup::default();
        lookup
            .created
            .insert("exmple.com".into(), now - ChronoDuration::days(365));

        let orchestrator = AnalysisOrchestrator::new(Arc::new(resolver), Arc::new(lookup));
        let result = orchestrator
            .analyze_variant(variant("exmple.com", 0), &AnalysisOptions::default(), now)
            .await;

        assert!(result.resolved);
        assert_eq!(result.ip_addresses.len(), 1);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_skips_registration() {
        let lookup = Arc::new(FixtureLookup::default());
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(FixtureResolver::default()), lookup.clone());
        let result = orchestrator
            .analyze_variant(variant("nothing.com", 0), &AnalysisOptions::default(), Utc::now())
            .await;

        assert!(!result.resolved);
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage, Stage::Dns);
        assert_eq!(result.errors[0].kind, ErrorKind::NotFound);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dns_timeout_marks_unresolved() {
        let mut resolver = FixtureResolver::default();
        resolver.answers.insert("slow.com".into(), vec![ip("192.0.2.7")]);
        resolver.slow.push("slow.com".into());
        let lookup = Arc::new(FixtureLookup::default());
        let orchestrator = AnalysisOrchestrator::new(Arc::new(resolver), lookup.clone());

        let options = AnalysisOptions::default().with_dns_timeout(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        let result = orchestrator
            .analyze_variant(variant("slow.com", 0), &options, Utc::now())
            .await;

        assert!(!result.resolved);
        assert!(result.errors[0].is_timeout());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_registration_failure_is_unknown() {
        let mut resolver = FixtureResolver::default();
        resolver.answers.insert("exmple.com".into(), vec![ip("192.0.2.1")]);
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(resolver), Arc::new(FixtureLookup::default()));

        let result = orchestrator
            .analyze_variant(variant("exmple.com", 0), &AnalysisOptions::default(), Utc::now())
            .await;

        assert!(result.resolved);
        assert!(result.registration.is_none());
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.errors[0].stage, Stage::Registration);
    }

    #[tokio::test]
    async fn test_dns_disabled_skips_registration() {
        let now = Utc::now();
        let mut lookup = FixtureLookup::default();
        lookup
            .created
            .insert("exmple.com".into(), now - ChronoDuration::days(365 * 10));
        let lookup = Arc::new(lookup);
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(FixtureResolver::default()), lookup.clone());

        let options = AnalysisOptions::default().with_dns(false);
        let variants = vec![variant("exmple.com", 0), variant("examlpe.com", 1)];
        let report = orchestrator
            .analyze("example.com", variants, 2, &options, now, None)
            .await;

        assert_eq!(report.total_analyzed, 2);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        for result in &report.results {
            assert!(!result.resolved);
            assert!(result.registration.is_none());
            assert!(result.errors.is_empty());
            assert_eq!(result.risk_level, RiskLevel::Unknown);
        }
    }

    #[tokio::test]
    async fn test_abort_stops_dispatch() {
        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(FixtureResolver::default()),
            Arc::new(FixtureLookup::default()),
        );
        let abort = AbortHandle::new();
        abort.abort();

        let variants = vec![variant("a.com", 0), variant("b.com", 1)];
        let report = orchestrator
            .analyze(
                "example.com",
                variants,
                2,
                &AnalysisOptions::default(),
                Utc::now(),
                Some(&abort),
            )
            .await;

        assert_eq!(report.total_generated, 2);
        assert_eq!(report.total_analyzed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mid_run_reports_in_flight_work() {
        let domains = ["a.com", "b.com", "c.com", "d.com", "e.com"];
        let mut resolver = FixtureResolver::default();
        for d in domains {
            resolver.answers.insert(d.into(), vec![ip("192.0.2.1")]);
            resolver.slow.push(d.into());
        }
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(resolver), Arc::new(FixtureLookup::default()));
        let variants: Vec<Variant> = domains
            .iter()
            .enumerate()
            .map(|(i, d)| variant(d, i))
            .collect();
        let options = AnalysisOptions::default()
            .with_workers(2)
            .with_whois(false)
            .with_dns_timeout(Duration::from_secs(120));
        let abort = AbortHandle::new();

        let (report, _) = tokio::join!(
            orchestrator.analyze("example.com", variants, 5, &options, Utc::now(), Some(&abort)),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                abort.abort();
            }
        );

        assert_eq!(report.total_generated, 5);
        assert_eq!(report.total_analyzed, 2);
        let analyzed: Vec<&str> = report.results.iter().map(|r| r.domain()).collect();
        assert_eq!(analyzed, vec!["a.com", "b.com"]);
        assert!(report.results.iter().all(|r| r.resolved));
    }

    #[tokio::test]
    async fn test_report_keeps_generation_order() {
        let mut resolver = FixtureResolver::default();
        for d in ["a.com", "b.com", "c.com"] {
            resolver.answers.insert(d.into(), vec![ip("192.0.2.1")]);
        }
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(resolver), Arc::new(FixtureLookup::default()));
        let variants = vec![variant("a.com", 0), variant("b.com", 1), variant("c.com", 2)];

        let report = orchestrator
            .analyze(
                "example.com",
                variants,
                3,
                &AnalysisOptions::default().with_workers(3),
                Utc::now(),
                None,
            )
            .await;

        let domains: Vec<&str> = report.results.iter().map(|r| r.domain()).collect();
        assert_eq!(domains, vec!["a.com", "b.com", "c.com"]);
        assert_eq!(report.summary.registered, 3);
    }
}
