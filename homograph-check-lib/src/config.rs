//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `HC_*`
//! environment variables, merging them with proper precedence rules, and
//! loading the confusable-character and TLD data files.

use crate::error::HomographError;
use crate::generate::{ConfusableMap, TldList};
use crate::types::AnalysisOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for analysis options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Data files replacing the built-in tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_variants: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_dns: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_whois: Option<bool>,

    /// DNS timeout (as string, e.g., "5s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_timeout: Option<String>,

    /// Registration lookup timeout (as string, e.g., "10s", "1m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_years: Option<f64>,
}

/// Data file locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    /// JSON confusable-character map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confusables: Option<String>,

    /// TLD list, one per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<String>,
}

impl DefaultsConfig {
    /// Apply the values that are set on top of `options`.
    ///
    /// Timeout strings are expected to have been validated already; an
    /// unparsable one leaves the current value.
    pub fn apply_to(&self, mut options: AnalysisOptions) -> AnalysisOptions {
        if let Some(workers) = self.workers {
            options = options.with_workers(workers);
        }
        if let Some(max) = self.max_variants {
            options = options.with_max_variants(Some(max));
        }
        if let Some(check_dns) = self.check_dns {
            options = options.with_dns(check_dns);
        }
        if let Some(check_whois) = self.check_whois {
            options = options.with_whois(check_whois);
        }
        if let Some(timeout) = self.dns_timeout.as_deref().and_then(parse_timeout_string) {
            options = options.with_dns_timeout(timeout);
        }
        if let Some(timeout) = self.whois_timeout.as_deref().and_then(parse_timeout_string) {
            options = options.with_whois_timeout(timeout);
        }
        if let Some(threshold) = self.threshold_years {
            options = options.with_threshold_years(threshold);
        }
        options
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which config files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `FileError` when the file is missing or unreadable, `ConfigError`
    /// when it is not valid TOML or holds out-of-range values.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, HomographError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HomographError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HomographError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            HomographError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then `~/.homograph-check.toml`, then
    /// `./homograph-check.toml`; later files override earlier ones field by
    /// field. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, HomographError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        if self.verbose {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "loaded config file");
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./homograph-check.toml", "./.homograph-check.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".homograph-check.toml", "homograph-check.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// `$XDG_CONFIG_HOME/homograph-check/config.toml`, falling back to
    /// `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("homograph-check").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations. Values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    workers: higher_defaults.workers.or(lower_defaults.workers),
                    max_variants: higher_defaults.max_variants.or(lower_defaults.max_variants),
                    check_dns: higher_defaults.check_dns.or(lower_defaults.check_dns),
                    check_whois: higher_defaults.check_whois.or(lower_defaults.check_whois),
                    dns_timeout: higher_defaults.dns_timeout.or(lower_defaults.dns_timeout),
                    whois_timeout: higher_defaults.whois_timeout.or(lower_defaults.whois_timeout),
                    threshold_years: higher_defaults
                        .threshold_years
                        .or(lower_defaults.threshold_years),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            data: match (lower.data, higher.data) {
                (Some(lower_data), Some(higher_data)) => Some(DataConfig {
                    confusables: higher_data.confusables.or(lower_data.confusables),
                    tlds: higher_data.tlds.or(lower_data.tlds),
                }),
                (lower_data, higher_data) => higher_data.or(lower_data),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), HomographError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(workers) = defaults.workers {
            if workers == 0 || workers > 100 {
                return Err(HomographError::config("Workers must be between 1 and 100"));
            }
        }

        for (key, value) in [
            ("dns_timeout", &defaults.dns_timeout),
            ("whois_timeout", &defaults.whois_timeout),
        ] {
            if let Some(timeout_str) = value {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(HomographError::config(format!(
                        "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                        key, timeout_str
                    )));
                }
            }
        }

        if let Some(threshold) = defaults.threshold_years {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(HomographError::config(format!(
                    "threshold_years must be a non-negative number, got {}",
                    threshold
                )));
            }
        }

        Ok(())
    }
}

/// Configuration read from `HC_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub workers: Option<usize>,
    pub max_variants: Option<usize>,
    pub check_dns: Option<bool>,
    pub check_whois: Option<bool>,
    pub dns_timeout: Option<String>,
    pub whois_timeout: Option<String>,
    pub threshold_years: Option<f64>,
    pub confusables: Option<String>,
    pub tlds: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// The env values as a `[defaults]` section, for layering over files.
    pub fn as_defaults(&self) -> DefaultsConfig {
        DefaultsConfig {
            workers: self.workers,
            max_variants: self.max_variants,
            check_dns: self.check_dns,
            check_whois: self.check_whois,
            dns_timeout: self.dns_timeout.clone(),
            whois_timeout: self.whois_timeout.clone(),
            threshold_years: self.threshold_years,
        }
    }

    /// The env values as a `[data]` section.
    pub fn as_data(&self) -> DataConfig {
        DataConfig {
            confusables: self.confusables.clone(),
            tlds: self.tlds.clone(),
        }
    }
}

/// Load configuration from `HC_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as `load_env_config`, reading variables through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = lookup("HC_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if (1..=100).contains(&workers) => env_config.workers = Some(workers),
            _ => tracing::warn!(value = %val, "invalid HC_WORKERS, must be 1-100"),
        }
    }

    if let Some(val) = lookup("HC_MAX_VARIANTS") {
        match val.trim().parse::<usize>() {
            Ok(max) => env_config.max_variants = Some(max),
            Err(_) => tracing::warn!(value = %val, "invalid HC_MAX_VARIANTS"),
        }
    }

    if let Some(val) = lookup("HC_CHECK_DNS") {
        env_config.check_dns = parse_bool_var("HC_CHECK_DNS", &val);
    }

    if let Some(val) = lookup("HC_CHECK_WHOIS") {
        env_config.check_whois = parse_bool_var("HC_CHECK_WHOIS", &val);
    }

    for (key, slot) in [
        ("HC_DNS_TIMEOUT", &mut env_config.dns_timeout),
        ("HC_WHOIS_TIMEOUT", &mut env_config.whois_timeout),
    ] {
        if let Some(val) = lookup(key) {
            if parse_timeout_string(&val).is_some() {
                *slot = Some(val);
            } else {
                tracing::warn!(var = key, value = %val, "invalid timeout, use format like '5s'");
            }
        }
    }

    if let Some(val) = lookup("HC_THRESHOLD_YEARS") {
        match val.trim().parse::<f64>() {
            Ok(years) if years.is_finite() && years >= 0.0 => {
                env_config.threshold_years = Some(years)
            }
            _ => tracing::warn!(value = %val, "invalid HC_THRESHOLD_YEARS"),
        }
    }

    for (key, slot) in [
        ("HC_CONFUSABLES", &mut env_config.confusables),
        ("HC_TLDS", &mut env_config.tlds),
        ("HC_CONFIG", &mut env_config.config),
    ] {
        if let Some(val) = lookup(key) {
            if !val.trim().is_empty() {
                *slot = Some(val);
            }
        }
    }

    env_config
}

fn parse_bool_var(key: &str, val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(var = key, value = %val, "invalid boolean, use true/false");
            None
        }
    }
}

/// Parse a timeout string like "500ms", "5s", "2m" or "1.5s".
///
/// A bare number is read as seconds. Zero and negative values are rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let (number, scale) = if let Some(ms) = timeout_str.strip_suffix("ms") {
        (ms, 0.001)
    } else if let Some(s) = timeout_str.strip_suffix('s') {
        (s, 1.0)
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        (m, 60.0)
    } else {
        (timeout_str.as_str(), 1.0)
    };

    let value = number.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(value * scale))
}

/// Load a confusable-character map from a JSON file.
///
/// The file is an object mapping one character to a list of look-alikes:
/// `{"a": ["а", "ɑ"], "o": ["о", "0"]}`. Keys and values that are not a
/// single character are skipped.
pub fn load_confusable_map<P: AsRef<Path>>(path: P) -> Result<ConfusableMap, HomographError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        HomographError::file_error(
            path.to_string_lossy(),
            format!("Failed to read confusables file: {}", e),
        )
    })?;

    let raw: HashMap<String, Vec<String>> = serde_json::from_str(&content).map_err(|e| {
        HomographError::parse(format!(
            "Invalid confusables file {}: {}",
            path.display(),
            e
        ))
    })?;

    // sorted so the map does not depend on JSON key order
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();

    let entries = keys.into_iter().filter_map(|key| {
        let ch = single_char(key)?;
        let lookalikes: Vec<char> = raw[key].iter().filter_map(|v| single_char(v)).collect();
        Some((ch, lookalikes))
    });

    let map = ConfusableMap::from_entries(entries);
    tracing::debug!(path = %path.display(), characters = map.len(), "loaded confusables");
    Ok(map)
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Load a TLD list: one TLD per line, `#` starts a comment.
pub fn load_tld_list<P: AsRef<Path>>(path: P) -> Result<TldList, HomographError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        HomographError::file_error(
            path.to_string_lossy(),
            format!("Failed to read TLD file: {}", e),
        )
    })?;

    let tlds = TldList::new(
        content
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty()),
    );

    if tlds.is_empty() {
        return Err(HomographError::file_error(
            path.to_string_lossy(),
            "TLD file contains no TLDs",
        ));
    }

    tracing::debug!(path = %path.display(), tlds = tlds.len(), "loaded TLD list");
    Ok(tlds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file_with(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_timeout_string("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_timeout_string("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_timeout_string("0s"), None);
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = temp_file_with(
            r#"
[defaults]
workers = 25
check_whois = false
dns_timeout = "2s"
threshold_years = 1.5

[data]
tlds = "/etc/homograph/tlds.txt"
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.workers, Some(25));
        assert_eq!(defaults.check_whois, Some(false));
        assert_eq!(defaults.dns_timeout.as_deref(), Some("2s"));
        assert_eq!(defaults.threshold_years, Some(1.5));
        assert_eq!(
            config.data.unwrap().tlds.as_deref(),
            Some("/etc/homograph/tlds.txt")
        );
    }

    #[test]
    fn test_invalid_workers() {
        let temp_file = temp_file_with("[defaults]\nworkers = 0\n");
        let manager = ConfigManager::new(false);
        assert!(manager.load_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let temp_file = temp_file_with("[defaults]\nwhois_timeout = \"soon\"\n");
        let manager = ConfigManager::new(false);
        let err = manager.load_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, HomographError::ConfigError { .. }));
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new(false);
        let err = manager.load_file("/nonexistent/homograph-check.toml").unwrap_err();
        assert!(matches!(err, HomographError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(10),
                max_variants: Some(300),
                check_dns: Some(false),
                ..Default::default()
            }),
            data: Some(DataConfig {
                confusables: Some("lower.json".to_string()),
                tlds: Some("lower.txt".to_string()),
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                workers: Some(25),
                check_dns: Some(true),
                ..Default::default()
            }),
            data: Some(DataConfig {
                confusables: None,
                tlds: Some("higher.txt".to_string()),
            }),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();
        assert_eq!(defaults.workers, Some(25));
        assert_eq!(defaults.max_variants, Some(300));
        assert_eq!(defaults.check_dns, Some(true));

        let data = merged.data.unwrap();
        assert_eq!(data.confusables.as_deref(), Some("lower.json"));
        assert_eq!(data.tlds.as_deref(), Some("higher.txt"));
    }

    #[test]
    fn test_defaults_apply_to_options() {
        let defaults = DefaultsConfig {
            workers: Some(500),
            max_variants: Some(50),
            check_whois: Some(false),
            whois_timeout: Some("3s".to_string()),
            threshold_years: Some(1.0),
            ..Default::default()
        };
        let options = defaults.apply_to(AnalysisOptions::default());

        assert_eq!(options.workers, 100);
        assert_eq!(options.max_variants, Some(50));
        assert!(options.check_dns);
        assert!(!options.check_whois);
        assert_eq!(options.whois_timeout, Duration::from_secs(3));
        assert_eq!(options.dns_timeout, Duration::from_secs(5));
        assert_eq!(options.threshold_years, 1.0);
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("HC_WORKERS", "20"),
            ("HC_MAX_VARIANTS", "many"),
            ("HC_CHECK_DNS", "off"),
            ("HC_CHECK_WHOIS", "maybe"),
            ("HC_DNS_TIMEOUT", "750ms"),
            ("HC_WHOIS_TIMEOUT", "never"),
            ("HC_THRESHOLD_YEARS", "3"),
            ("HC_TLDS", "tlds.txt"),
            ("HC_CONFIG", "  "),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(env_config.workers, Some(20));
        assert_eq!(env_config.max_variants, None);
        assert_eq!(env_config.check_dns, Some(false));
        assert_eq!(env_config.check_whois, None);
        assert_eq!(env_config.dns_timeout.as_deref(), Some("750ms"));
        assert_eq!(env_config.whois_timeout, None);
        assert_eq!(env_config.threshold_years, Some(3.0));
        assert_eq!(env_config.tlds.as_deref(), Some("tlds.txt"));
        assert_eq!(env_config.config, None);
    }

    #[test]
    fn test_out_of_range_env_workers_ignored() {
        let env_config =
            load_env_config_from(|key| (key == "HC_WORKERS").then(|| "0".to_string()));
        assert_eq!(env_config.workers, None);
    }

    #[test]
    fn test_load_confusable_map() {
        let temp_file = temp_file_with(r#"{"a": ["а", "ɑ"], "o": ["о", "00"], "bad": ["x"]}"#);
        let map = load_confusable_map(temp_file.path()).unwrap();

        assert_eq!(map.get('a'), &['а', 'ɑ']);
        assert_eq!(map.get('o'), &['о']);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_load_confusable_map_rejects_bad_json() {
        let temp_file = temp_file_with("not json");
        let err = load_confusable_map(temp_file.path()).unwrap_err();
        assert!(matches!(err, HomographError::ParseError { .. }));
    }

    #[test]
    fn test_load_tld_list() {
        let temp_file = temp_file_with("# common\ncom\n.NET\n\nco.uk  # second level\ncom\n");
        let tlds = load_tld_list(temp_file.path()).unwrap();

        assert_eq!(tlds.as_slice(), &["com", "net", "co.uk"]);
    }

    #[test]
    fn test_empty_tld_list_is_error() {
        let temp_file = temp_file_with("# nothing here\n");
        assert!(load_tld_list(temp_file.path()).is_err());
    }
}
