//! Console display logic for homograph-check.
//!
//! Colored report sections grouped by risk level, the spinner shown while a
//! target is analyzed, headers, and summaries. Uses only the `console`
//! crate.

use console::{pad_str, style, Alignment, Term};
use homograph_check_lib::{
    to_ascii_domain, AnalysisReport, AnalysisResult, ErrorKind, RiskLevel, Stage, VariantSet,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOMAIN_WIDTH: usize = 32;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message. Returns `None` when stderr is
    /// not a terminal.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header for one analyzed target.
pub fn print_header(report: &AnalysisReport, workers: usize) {
    println!(
        "{} {} {}",
        style("homograph-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("· {}", report.target_domain)).bold(),
    );

    let mut meta_parts = vec![format!(
        "{} of {} variants analyzed",
        report.total_analyzed, report.total_generated
    )];
    meta_parts.push(format!("Threshold: {} years", report.threshold_years));
    meta_parts.push(format!("Workers: {}", workers));

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Grouped report output ────────────────────────────────────────────────────

/// Print resolved results grouped by risk level, highest first.
///
/// Unresolved variants are only listed when `show_all` is set; otherwise
/// they appear in the summary counts alone. Empty sections are omitted.
pub fn print_grouped_results(report: &AnalysisReport, show_all: bool) {
    let sections = [
        (RiskLevel::High, "High risk"),
        (RiskLevel::Medium, "Medium risk"),
        (RiskLevel::Low, "Low risk"),
        (RiskLevel::Unknown, "Unknown"),
    ];

    for (level, title) in sections {
        let results: Vec<&AnalysisResult> = report
            .results
            .iter()
            .filter(|r| r.risk_level == level && (show_all || r.resolved))
            .collect();
        if results.is_empty() {
            continue;
        }

        let heading = format!("── {} ({}) ", title, results.len());
        let rule = "─".repeat(52usize.saturating_sub(heading.chars().count()));
        println!(
            "  {} {}",
            risk_style(level, heading).bold(),
            risk_style(level, rule).dim(),
        );
        for result in results {
            print_result_line(result);
        }
        println!();
    }
}

/// Print a single line inside a risk section.
fn print_result_line(result: &AnalysisResult) {
    let shown = display_domain(result.domain());
    let padded = pad_str(&shown, DOMAIN_WIDTH, Alignment::Left, Some(".."));

    let technique = style(format!("[{}]", result.variant.technique)).cyan();
    let details = if result.resolved {
        format_registration(result)
    } else {
        brief_error(result).to_string()
    };

    println!("    {}  {}  {}", style(&padded).white(), technique, style(details).dim());
}

/// Print the variants of one target without analyzing them.
pub fn print_variants(variants: &VariantSet, total_generated: usize) {
    println!(
        "{} {}",
        style(variants.target()).bold(),
        style(if variants.len() < total_generated {
            format!("({} of {} variants)", variants.len(), total_generated)
        } else {
            format!("({} variants)", variants.len())
        })
        .dim(),
    );

    for variant in variants {
        let shown = display_domain(&variant.domain);
        let padded = pad_str(&shown, DOMAIN_WIDTH, Alignment::Left, Some(".."));
        println!(
            "  {}  {}  {}",
            style(&padded).white(),
            style(format!("[{}]", variant.technique)).cyan(),
            style(&variant.detail).dim(),
        );
    }
    println!();
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(report: &AnalysisReport, duration: Duration) {
    let summary = &report.summary;
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} variant{} in {:.1}s  {}  {}  {}  {}  {}  {}  {}  {}",
        style(report.total_analyzed).bold(),
        if report.total_analyzed == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} registered", summary.registered)).bold(),
        style("|").dim(),
        style(format!("{} high", summary.high)).red(),
        style("|").dim(),
        style(format!("{} medium", summary.medium)).yellow(),
        style("|").dim(),
        style(format!("{} low", summary.low)).green(),
    );
}

/// Print how many lookups failed, by stage and kind. Not-found answers are
/// the normal outcome for unregistered variants and are not listed.
pub fn print_error_summary(report: &AnalysisReport) {
    let mut counts: Vec<(Stage, ErrorKind, usize)> = Vec::new();
    for error in report.results.iter().flat_map(|r| &r.errors) {
        if error.kind == ErrorKind::NotFound {
            continue;
        }
        match counts
            .iter_mut()
            .find(|(stage, kind, _)| *stage == error.stage && *kind == error.kind)
        {
            Some((_, _, count)) => *count += 1,
            None => counts.push((error.stage, error.kind, 1)),
        }
    }

    if counts.is_empty() {
        return;
    }

    println!("  {}", style("Some lookups did not complete:").yellow());
    for (stage, kind, count) in counts {
        println!(
            "  {} {} {} {}",
            style("•").dim(),
            count,
            stage_label(stage),
            kind_label(kind, count),
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn risk_style(level: RiskLevel, text: String) -> console::StyledObject<String> {
    match level {
        RiskLevel::High => style(text).red(),
        RiskLevel::Medium => style(text).yellow(),
        RiskLevel::Low => style(text).green(),
        RiskLevel::Unknown => style(text).white(),
    }
}

/// Unicode variants are shown with their punycode form.
pub fn display_domain(domain: &str) -> String {
    if domain.is_ascii() {
        return domain.to_string();
    }
    match to_ascii_domain(domain) {
        Some(ascii) => format!("{} ({})", domain, ascii),
        None => domain.to_string(),
    }
}

/// Registrar, creation date and age in one short string.
pub fn format_registration(result: &AnalysisResult) -> String {
    let mut parts = Vec::new();
    if let Some(registration) = &result.registration {
        if let Some(registrar) = &registration.registrar {
            parts.push(format!("Registrar: {}", registrar));
        }
        if let Some(created) = registration.created_at {
            parts.push(format!("Created: {}", created.format("%Y-%m-%d")));
        }
    }
    if let Some(age) = result.age_years {
        parts.push(format!("Age: {:.1}y", age));
    }
    if parts.is_empty() {
        match result.errors.first() {
            Some(error) => format!("no registration data ({})", kind_label(error.kind, 1)),
            None => "no registration data".to_string(),
        }
    } else {
        parts.join(", ")
    }
}

/// A brief reason for a variant that was not found registered.
fn brief_error(result: &AnalysisResult) -> &'static str {
    match result.errors.first() {
        Some(error) => match error.kind {
            ErrorKind::Timeout => "(timeout)",
            ErrorKind::NotFound => "(not registered)",
            ErrorKind::NetworkError => "(network error)",
            ErrorKind::RateLimited => "(rate limited)",
            ErrorKind::ParseError => "(parsing error)",
            ErrorKind::Unavailable => "(lookup unavailable)",
        },
        None => "(not checked)",
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Dns => "DNS",
        Stage::Registration => "registration",
    }
}

fn kind_label(kind: ErrorKind, count: usize) -> String {
    let label = match kind {
        ErrorKind::Timeout => "timeout",
        ErrorKind::NotFound => "not found",
        ErrorKind::NetworkError => "network error",
        ErrorKind::RateLimited => "rate limited",
        ErrorKind::ParseError => "parsing error",
        ErrorKind::Unavailable => "unavailable",
    };
    if count == 1 || kind == ErrorKind::NotFound || kind == ErrorKind::RateLimited {
        label.to_string()
    } else {
        format!("{}s", label)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
