//! Report assembly.
//!
//! Workers finish in any order. The aggregator restores generation order
//! (by `Variant::sequence`) and computes the summary counts, so two runs
//! over the same variants produce the same report regardless of the worker
//! count.
//!
//! Summary counts are per DNS name. A homoglyph variant and its punycode
//! re-encoding are two results but one registration, so they count once.

use crate::types::{AnalysisReport, AnalysisResult, AnalysisSummary, RiskLevel};
use crate::utils::to_ascii_domain;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Builds an `AnalysisReport` from per-variant results.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    target_domain: String,
    timestamp: DateTime<Utc>,
    threshold_years: f64,
    total_generated: usize,
}

impl ResultAggregator {
    pub fn new<S: Into<String>>(
        target_domain: S,
        timestamp: DateTime<Utc>,
        threshold_years: f64,
        total_generated: usize,
    ) -> Self {
        Self {
            target_domain: target_domain.into(),
            timestamp,
            threshold_years,
            total_generated,
        }
    }

    /// Order results by generation sequence and count them.
    pub fn aggregate(&self, mut results: Vec<AnalysisResult>) -> AnalysisReport {
        results.sort_by_key(|r| r.variant.sequence);

        AnalysisReport {
            target_domain: self.target_domain.clone(),
            timestamp: self.timestamp,
            threshold_years: self.threshold_years,
            total_generated: self.total_generated,
            total_analyzed: results.len(),
            summary: summarize(&results),
            results,
        }
    }
}

/// Count resolved results and results per risk level, once per distinct
/// ASCII domain. The first result in `results` for a name is the one counted.
pub fn summarize(results: &[AnalysisResult]) -> AnalysisSummary {
    let mut summary = AnalysisSummary::default();
    let mut counted = HashSet::new();
    for result in results {
        let ascii = to_ascii_domain(result.domain()).unwrap_or_else(|| result.domain().to_string());
        if !counted.insert(ascii) {
            continue;
        }
        if result.resolved {
            summary.registered += 1;
        }
        match result.risk_level {
            RiskLevel::High => summary.high += 1,
            RiskLevel::Medium => summary.medium += 1,
            RiskLevel::Low => summary.low += 1,
            RiskLevel::Unknown => summary.unknown += 1,
        }
    }
    summary
}
