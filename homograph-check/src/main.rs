//! Homograph Check CLI Application
//!
//! A command-line interface for finding registered look-alike domains of a
//! target and ranking them by registration age. This CLI application is a
//! thin layer over the homograph-check-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use homograph_check_lib::{
    load_confusable_map, load_env_config, load_tld_list, parse_timeout_string, AnalysisOptions,
    AnalysisReport, ConfigManager, FallbackLookup, FileConfig, HomographAnalyzer, SystemResolver,
    Technique, TechniqueRegistry,
};
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for homograph-check
#[derive(Parser, Debug)]
#[command(name = "homograph-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find registered look-alike domains and rank them by registration age")]
#[command(
    long_about = "Generate homograph and typosquat variants of a domain, check which ones resolve and when they were registered, and flag recently registered look-alikes.\n\nIntended for defending your own domains and brands."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Target domains to analyze (e.g. example.com)
    #[arg(value_name = "DOMAINS", help_heading = "Targets")]
    pub domains: Vec<String>,

    /// Input file with target domains (one per line, # comments allowed)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Targets"
    )]
    pub file: Option<String>,

    /// Only run these techniques (comma-separated or repeated)
    #[arg(
        short = 't',
        long = "technique",
        value_name = "NAME",
        value_delimiter = ',',
        action = clap::ArgAction::Append,
        help_heading = "Generation"
    )]
    pub techniques: Option<Vec<String>>,

    /// List the available techniques and exit
    #[arg(long = "list-techniques", help_heading = "Generation")]
    pub list_techniques: bool,

    /// Cap on variants analyzed per target (default: 1000)
    #[arg(long = "max-variants", value_name = "N", help_heading = "Generation")]
    pub max_variants: Option<usize>,

    /// Print the generated variants without any lookups
    #[arg(long = "generate-only", help_heading = "Generation")]
    pub generate_only: bool,

    /// JSON confusable-character map replacing the built-in one
    #[arg(long = "confusables", value_name = "FILE", help_heading = "Generation")]
    pub confusables: Option<String>,

    /// TLD list (one per line) replacing the built-in one
    #[arg(long = "tld-file", value_name = "FILE", help_heading = "Generation")]
    pub tld_file: Option<String>,

    /// Skip DNS resolution
    #[arg(long = "no-dns", help_heading = "Analysis")]
    pub no_dns: bool,

    /// Skip RDAP/WHOIS registration lookups
    #[arg(long = "no-whois", help_heading = "Analysis")]
    pub no_whois: bool,

    /// Max concurrent variant lookups (default: 10, max: 100)
    #[arg(short = 'w', long = "workers", value_name = "N", help_heading = "Analysis")]
    pub workers: Option<usize>,

    /// DNS timeout per variant, e.g. "5s" or "500ms"
    #[arg(long = "dns-timeout", value_name = "DURATION", help_heading = "Analysis")]
    pub dns_timeout: Option<String>,

    /// Registration lookup timeout per variant, e.g. "10s"
    #[arg(long = "whois-timeout", value_name = "DURATION", help_heading = "Analysis")]
    pub whois_timeout: Option<String>,

    /// Registrations younger than this many years are high risk (default: 2)
    #[arg(long = "threshold", value_name = "YEARS", help_heading = "Analysis")]
    pub threshold: Option<f64>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Output results in CSV format
    #[arg(long = "csv", help_heading = "Output Format")]
    pub csv: bool,

    /// Only output registered HIGH and MEDIUM risk variants
    #[arg(short = 's', long = "suspicious-only", help_heading = "Output Format")]
    pub suspicious_only: bool,

    /// Also list variants that are not registered
    #[arg(short = 'a', long = "all", help_heading = "Output Format")]
    pub all: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging (library debug events on stderr)
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Settings resolved from built-in defaults, config files, environment and
/// CLI flags.
#[derive(Debug)]
struct Settings {
    options: AnalysisOptions,
    confusables: Option<String>,
    tlds: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_tracing(args.verbose);

    if args.list_techniques {
        print_techniques();
        return;
    }

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,homograph_check_lib=debug,homograph_check=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.list_techniques {
        return Ok(());
    }

    if args.domains.is_empty() && args.file.is_none() {
        return Err("You must specify target domains or a file with --file".to_string());
    }

    if args.json && args.csv {
        return Err("Cannot specify multiple output formats (--json, --csv)".to_string());
    }

    if args.generate_only && args.suspicious_only {
        return Err("--suspicious-only needs lookups and cannot be used with --generate-only".to_string());
    }

    if let Some(workers) = args.workers {
        if workers == 0 || workers > 100 {
            return Err("Workers must be between 1 and 100".to_string());
        }
    }

    if let Some(threshold) = args.threshold {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err("Threshold must be a non-negative number of years".to_string());
        }
    }

    for (flag, value) in [
        ("--dns-timeout", &args.dns_timeout),
        ("--whois-timeout", &args.whois_timeout),
    ] {
        if let Some(value) = value {
            if parse_timeout_string(value).is_none() {
                return Err(format!(
                    "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                    flag, value
                ));
            }
        }
    }

    if let Some(names) = &args.techniques {
        parse_techniques(names)?;
    }

    Ok(())
}

/// Parse technique names, rejecting anything that is not a built-in.
fn parse_techniques(names: &[String]) -> Result<Vec<Technique>, String> {
    names
        .iter()
        .map(|name| {
            let technique = Technique::from_name(name.trim());
            if technique.is_builtin() {
                Ok(technique)
            } else {
                Err(format!(
                    "Unknown technique '{}'. Use --list-techniques to see all",
                    name
                ))
            }
        })
        .collect()
}

/// Print all built-in techniques, then exit.
fn print_techniques() {
    use console::Style;

    let heading = Style::new().yellow().bold();
    let name_style = Style::new().green().bold();

    println!();
    println!("{}", heading.apply_to("Available techniques (priority order):"));
    println!();
    for technique in Technique::BUILTIN.iter() {
        println!("  {}", name_style.apply_to(technique.as_str()));
    }
    println!();
    println!("Use: homograph-check <domain> --technique homoglyph,transposition");
}

/// Main analysis logic
async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let targets = collect_targets(&args)?;
    let analyzer = build_analyzer(&args, &settings)?;

    if args.generate_only {
        return run_generate_only(&analyzer, &targets, &settings.options, &args);
    }

    let mut reports = Vec::new();
    let mut failed = 0usize;

    for target in &targets {
        let spinner = if !args.json && !args.csv {
            ui::Spinner::start(format!("Analyzing {}...", target))
        } else {
            None
        };

        let start_time = std::time::Instant::now();
        let outcome = analyzer.analyze_domain(target, &settings.options).await;
        let duration = start_time.elapsed();

        if let Some(s) = spinner {
            s.stop().await;
        }

        match outcome {
            Ok(mut report) => {
                if args.suspicious_only {
                    report.results.retain(|r| r.is_suspicious());
                }
                if !args.json && !args.csv {
                    display_text_report(&report, &settings.options, &args, duration);
                }
                reports.push(report);
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error: {}: {}", target, e);
            }
        }
    }

    if args.json {
        display_json_reports(&reports)?;
    } else if args.csv {
        display_csv_reports(&reports);
    }

    if reports.is_empty() && failed > 0 {
        return Err("No target could be analyzed".into());
    }
    Ok(())
}

/// Build analysis settings from config files, environment and CLI args.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (HC_*)
/// 3. Config files (explicit --config / HC_CONFIG, else discovered)
/// 4. Built-in defaults
fn build_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new(args.verbose);

    let file_config = match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => {
            tracing::debug!(path = %path, "using explicit config file");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load()?,
    };

    let layered = config_manager.merge_configs(
        file_config,
        FileConfig {
            defaults: Some(env_config.as_defaults()),
            data: Some(env_config.as_data()),
        },
    );

    let mut options = AnalysisOptions::default();
    if let Some(defaults) = &layered.defaults {
        options = defaults.apply_to(options);
    }
    options = apply_cli_args(options, args);
    options.validate()?;

    let data = layered.data.unwrap_or_default();
    Ok(Settings {
        options,
        confusables: args.confusables.clone().or(data.confusables),
        tlds: args.tld_file.clone().or(data.tlds),
    })
}

/// Apply CLI arguments to options (highest precedence). Only flags the user
/// passed override earlier layers.
fn apply_cli_args(mut options: AnalysisOptions, args: &Args) -> AnalysisOptions {
    if let Some(workers) = args.workers {
        options = options.with_workers(workers);
    }
    if let Some(max) = args.max_variants {
        options = options.with_max_variants(Some(max));
    }
    if args.no_dns {
        options = options.with_dns(false);
    }
    if args.no_whois {
        options = options.with_whois(false);
    }
    if let Some(timeout) = args.dns_timeout.as_deref().and_then(parse_timeout_string) {
        options = options.with_dns_timeout(timeout);
    }
    if let Some(timeout) = args.whois_timeout.as_deref().and_then(parse_timeout_string) {
        options = options.with_whois_timeout(timeout);
    }
    if let Some(threshold) = args.threshold {
        options = options.with_threshold_years(threshold);
    }
    options
}

fn build_analyzer(
    args: &Args,
    settings: &Settings,
) -> Result<HomographAnalyzer, Box<dyn std::error::Error>> {
    let options = &settings.options;
    let mut analyzer = HomographAnalyzer::new()?
        .with_resolver(Arc::new(SystemResolver::with_timeout(options.dns_timeout)))
        .with_registration_lookup(Arc::new(FallbackLookup::new(options.whois_timeout)?));

    if let Some(path) = &settings.confusables {
        analyzer = analyzer.with_confusables(load_confusable_map(path)?);
    }
    if let Some(path) = &settings.tlds {
        analyzer = analyzer.with_tlds(load_tld_list(path)?);
    }
    if let Some(names) = &args.techniques {
        analyzer = analyzer.with_registry(TechniqueRegistry::only(&parse_techniques(names)?));
    }

    Ok(analyzer)
}

/// Targets from positional args followed by the batch file, de-duplicated.
fn collect_targets(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut targets: Vec<String> = args.domains.clone();
    if let Some(path) = &args.file {
        targets.extend(read_targets_from_file(path)?);
    }

    let mut seen = std::collections::HashSet::new();
    targets.retain(|t| seen.insert(t.to_lowercase()));

    if targets.is_empty() {
        return Err("No target domains to analyze".into());
    }
    Ok(targets)
}

/// Read target domains from a file
fn read_targets_from_file(file_path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {}", file_path).into());
    }

    let content = std::fs::read_to_string(path)?;
    let targets: Vec<String> = content
        .lines()
        .filter_map(|line| {
            // Handle full-line and inline comments
            let domain_part = line.split('#').next().unwrap_or("").trim();
            (!domain_part.is_empty()).then(|| domain_part.to_string())
        })
        .collect();

    if targets.is_empty() {
        return Err("No valid domains found in the file.".into());
    }
    Ok(targets)
}

/// Generate variants for every target and print them.
fn run_generate_only(
    analyzer: &HomographAnalyzer,
    targets: &[String],
    options: &AnalysisOptions,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut listings = Vec::new();
    let mut failed = 0usize;

    for target in targets {
        match analyzer.generate_all_variants(target) {
            Ok(mut variants) => {
                let total_generated = variants.len();
                if let Some(max) = options.max_variants {
                    variants.truncate(max);
                }
                listings.push((variants, total_generated));
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error: {}: {}", target, e);
            }
        }
    }

    if args.json {
        let json: Vec<serde_json::Value> = listings
            .iter()
            .map(|(variants, total_generated)| {
                serde_json::json!({
                    "target_domain": variants.target(),
                    "total_generated": total_generated,
                    "variants": variants.as_slice(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if args.csv {
        println!("target,domain,technique,detail");
        for (variants, _) in &listings {
            for variant in variants {
                println!(
                    "{},{},{},{}",
                    csv_field(variants.target()),
                    csv_field(&variant.domain),
                    variant.technique,
                    csv_field(&variant.detail)
                );
            }
        }
    } else {
        for (variants, total_generated) in &listings {
            ui::print_variants(variants, *total_generated);
        }
    }

    if listings.is_empty() && failed > 0 {
        return Err("No target could be processed".into());
    }
    Ok(())
}

/// Display reports in JSON format
fn display_json_reports(reports: &[AnalysisReport]) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(reports)?;
    println!("{}", json);
    Ok(())
}

/// Display reports in CSV format, one row per result
fn display_csv_reports(reports: &[AnalysisReport]) {
    println!("target,domain,technique,resolved,ip_addresses,registrar,created,expires,age_years,risk_level,errors");

    for report in reports {
        for result in &report.results {
            let registration = result.registration.as_ref();
            let registrar = registration
                .and_then(|r| r.registrar.as_deref())
                .unwrap_or("-");
            let created = registration
                .and_then(|r| r.created_at)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            let expires = registration
                .and_then(|r| r.expires_at)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            let age = result
                .age_years
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "-".to_string());
            let ips: Vec<&str> = result.ip_addresses.iter().map(String::as_str).collect();
            let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();

            println!(
                "{},{},{},{},{},{},{},{},{},{},{}",
                csv_field(&report.target_domain),
                csv_field(result.domain()),
                result.variant.technique,
                result.resolved,
                csv_field(&ips.join(" ")),
                csv_field(registrar),
                created,
                expires,
                age,
                result.risk_level,
                csv_field(&errors.join("; ")),
            );
        }
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Display one report in human-readable text format
fn display_text_report(
    report: &AnalysisReport,
    options: &AnalysisOptions,
    args: &Args,
    duration: std::time::Duration,
) {
    ui::print_header(report, options.workers);
    ui::print_grouped_results(report, args.all);
    ui::print_summary(report, duration);
    ui::print_error_summary(report);
    println!();
}
