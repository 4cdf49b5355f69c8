//! Configuration file and environment variable handling.
//!
//! Settings are layered: built-in defaults, then TOML files (XDG, home,
//! working directory), then `DOMAIN_CHECKER_*` environment variables. Command
//! line flags are applied last by the CLI.

use crate::error::LookupError;
use crate::types::{CheckConfig, DnsRecordType, LookupMethod, PublicResolver};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of one configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FileConfig {
    /// Default lookup settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Custom propagation roster, replacing the built-in one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolvers: Option<Vec<PublicResolver>>,
}

/// The `[defaults]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DefaultsConfig {
    /// Whole-lookup budget, e.g. "30s" or "2m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Requests per second for WHOIS and RDAP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// auto, rdap, whois or dig
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Record type for dig lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_timeout: Option<String>,
}

impl FileConfig {
    /// Layer these settings over `config`.
    pub fn apply_to(&self, mut config: CheckConfig) -> Result<CheckConfig, LookupError> {
        if let Some(defaults) = &self.defaults {
            if let Some(timeout) = &defaults.timeout {
                config.timeout = parse_timeout_field("timeout", timeout)?;
            }
            if let Some(concurrency) = defaults.concurrency {
                config.concurrency = concurrency;
            }
            if let Some(rate_limit) = defaults.rate_limit {
                config.rate_limit = rate_limit;
            }
            if let Some(method) = &defaults.method {
                config.method = method.parse()?;
            }
            if let Some(record_type) = &defaults.record_type {
                config.record_type = record_type.parse()?;
            }
            if let Some(bootstrap) = defaults.bootstrap {
                config.enable_bootstrap = bootstrap;
            }
            if let Some(timeout) = &defaults.propagation_timeout {
                config.propagation_timeout = parse_timeout_field("propagation_timeout", timeout)?;
            }
        }

        if let Some(resolvers) = &self.resolvers {
            config.resolvers = Some(resolvers.clone());
        }

        Ok(config)
    }
}

fn parse_timeout_field(field: &str, value: &str) -> Result<Duration, LookupError> {
    parse_timeout_string(value).ok_or_else(|| {
        LookupError::config(format!(
            "Invalid {} '{}'. Use a format like '5s', '30s', '2m'",
            field, value
        ))
    })
}

/// Configuration discovery and loading.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    home: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    working_dir: PathBuf,
}

impl ConfigManager {
    /// Search the standard locations of the current user and directory.
    pub fn new() -> Self {
        Self {
            home: env::var_os("HOME").map(PathBuf::from),
            xdg_config_home: env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            working_dir: PathBuf::from("."),
        }
    }

    /// Search explicit directories instead of the process environment.
    pub fn with_dirs(
        home: Option<PathBuf>,
        xdg_config_home: Option<PathBuf>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            home,
            xdg_config_home,
            working_dir,
        }
    }

    /// Load and validate one configuration file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, LookupError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            LookupError::config(format!(
                "Failed to parse TOML configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        validate_config(&config)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Load every configuration file found, later files overriding earlier ones.
    ///
    /// Order: XDG config, then the home directory, then the working directory.
    /// A file that exists but cannot be parsed is an error.
    pub fn discover_and_load(&self) -> Result<FileConfig, LookupError> {
        let mut merged = FileConfig::default();
        let mut loaded = Vec::new();

        for path in [
            self.xdg_config_path(),
            self.global_config_path(),
            self.local_config_path(),
        ]
        .into_iter()
        .flatten()
        {
            let config = self.load_file(&path)?;
            merged = merge_configs(merged, config);
            loaded.push(path);
        }

        if loaded.len() > 1 {
            tracing::debug!(
                files = ?loaded,
                "multiple configuration files found; later files take precedence"
            );
        }

        Ok(merged)
    }

    fn local_config_path(&self) -> Option<PathBuf> {
        ["domain-checker.toml", ".domain-checker.toml"]
            .iter()
            .map(|name| self.working_dir.join(name))
            .find(|path| path.is_file())
    }

    fn global_config_path(&self) -> Option<PathBuf> {
        let home = self.home.as_ref()?;
        [".domain-checker.toml", "domain-checker.toml"]
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.is_file())
    }

    fn xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = self
            .xdg_config_home
            .clone()
            .or_else(|| self.home.as_ref().map(|home| home.join(".config")))?;

        let path = config_dir.join("domain-checker").join("config.toml");
        path.is_file().then_some(path)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge two configurations; fields set in `higher` win.
pub fn merge_configs(lower: FileConfig, higher: FileConfig) -> FileConfig {
    let defaults = match (lower.defaults, higher.defaults) {
        (Some(lower), Some(higher)) => Some(DefaultsConfig {
            timeout: higher.timeout.or(lower.timeout),
            concurrency: higher.concurrency.or(lower.concurrency),
            rate_limit: higher.rate_limit.or(lower.rate_limit),
            method: higher.method.or(lower.method),
            record_type: higher.record_type.or(lower.record_type),
            bootstrap: higher.bootstrap.or(lower.bootstrap),
            propagation_timeout: higher.propagation_timeout.or(lower.propagation_timeout),
        }),
        (lower, higher) => higher.or(lower),
    };

    FileConfig {
        defaults,
        resolvers: higher.resolvers.or(lower.resolvers),
    }
}

fn validate_config(config: &FileConfig) -> Result<(), LookupError> {
    if let Some(defaults) = &config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            if concurrency == 0 || concurrency > 100 {
                return Err(LookupError::config("Concurrency must be between 1 and 100"));
            }
        }
        if let Some(rate_limit) = defaults.rate_limit {
            crate::types::validate_rate_limit(rate_limit)?;
        }
        if let Some(timeout) = &defaults.timeout {
            parse_timeout_field("timeout", timeout)?;
        }
        if let Some(timeout) = &defaults.propagation_timeout {
            parse_timeout_field("propagation_timeout", timeout)?;
        }
        if let Some(method) = &defaults.method {
            method.parse::<LookupMethod>()?;
        }
        if let Some(record_type) = &defaults.record_type {
            record_type.parse::<DnsRecordType>()?;
        }
    }

    if let Some(resolvers) = &config.resolvers {
        if resolvers.is_empty() {
            return Err(LookupError::config("[[resolvers]] cannot be empty"));
        }
        if let Some(unnamed) = resolvers.iter().find(|r| r.name.trim().is_empty()) {
            return Err(LookupError::config(format!(
                "Resolver {} needs a name",
                unnamed.ip
            )));
        }
    }

    Ok(())
}

/// Settings taken from `DOMAIN_CHECKER_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub concurrency: Option<usize>,
    pub rate_limit: Option<f64>,
    pub method: Option<LookupMethod>,
    pub bootstrap: Option<bool>,
    /// Explicit configuration file
    pub config: Option<PathBuf>,
}

impl EnvConfig {
    /// Parse from `(name, value)` pairs. Invalid values are logged and skipped.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env_config = EnvConfig::default();

        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            match name {
                "DOMAIN_CHECKER_TIMEOUT" => match parse_timeout_string(value) {
                    Some(timeout) if !timeout.is_zero() => env_config.timeout = Some(timeout),
                    _ => invalid(name, value, "use a format like '5s', '30s', '2m'"),
                },
                "DOMAIN_CHECKER_MAX_CONCURRENT" => match value.parse::<usize>() {
                    Ok(n) if (1..=100).contains(&n) => env_config.concurrency = Some(n),
                    _ => invalid(name, value, "must be 1-100"),
                },
                "DOMAIN_CHECKER_RATE_LIMIT" => match value.parse::<f64>() {
                    Ok(rate) if rate.is_finite() && rate > 0.0 => {
                        env_config.rate_limit = Some(rate)
                    }
                    _ => invalid(name, value, "must be a positive number"),
                },
                "DOMAIN_CHECKER_DEFAULT_METHOD" => match value.parse::<LookupMethod>() {
                    Ok(method) => env_config.method = Some(method),
                    Err(_) => invalid(name, value, "must be auto, rdap, whois or dig"),
                },
                "DOMAIN_CHECKER_BOOTSTRAP" => match parse_bool(value) {
                    Some(enabled) => env_config.bootstrap = Some(enabled),
                    None => invalid(name, value, "must be true or false"),
                },
                "DOMAIN_CHECKER_CONFIG" if !value.is_empty() => {
                    env_config.config = Some(PathBuf::from(value));
                }
                _ => continue,
            }
        }

        env_config
    }

    /// Layer these settings over `config`.
    pub fn apply_to(&self, mut config: CheckConfig) -> CheckConfig {
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(bootstrap) = self.bootstrap {
            config.enable_bootstrap = bootstrap;
        }
        config
    }
}

/// Read `DOMAIN_CHECKER_*` variables from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_vars(env::vars())
}

fn invalid(name: &str, value: &str, hint: &str) {
    tracing::warn!(variable = name, value, "ignoring invalid environment value: {}", hint);
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "5s", "30s", "2m" or "5" (seconds).
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let seconds = if let Some(s) = timeout_str.strip_suffix('s') {
        s.trim().parse::<u64>().ok()?
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.trim().parse::<u64>().ok()?.checked_mul(60)?
    } else {
        timeout_str.parse::<u64>().ok()?
    };

    Some(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use tokio_test::{assert_err, assert_ok};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("30S"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_timeout_string(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("invalid"), None);
        assert_eq!(parse_timeout_string("-3s"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
timeout = "10s"
concurrency = 25
rate_limit = 2.5
method = "whois"
record_type = "MX"
bootstrap = false

[[resolvers]]
name = "Google"
ip = "8.8.8.8"
location = "Global"

[[resolvers]]
name = "Quad9"
ip = "9.9.9.9"
location = "Global"
"#,
        );

        let config = assert_ok!(ConfigManager::new().load_file(temp_file.path()));
        let defaults = config.defaults.clone().unwrap();
        assert_eq!(defaults.concurrency, Some(25));
        assert_eq!(defaults.method.as_deref(), Some("whois"));
        assert_eq!(config.resolvers.as_ref().unwrap().len(), 2);

        let check = config.apply_to(CheckConfig::default()).unwrap();
        assert_eq!(check.timeout, Duration::from_secs(10));
        assert_eq!(check.concurrency, 25);
        assert_eq!(check.rate_limit, 2.5);
        assert_eq!(check.method, LookupMethod::Whois);
        assert_eq!(check.record_type, DnsRecordType::Mx);
        assert!(!check.enable_bootstrap);
        assert_eq!(
            check.resolvers.unwrap()[1].ip,
            "9.9.9.9".parse::<std::net::IpAddr>().unwrap()
        );
        // Untouched fields keep their defaults.
        assert_eq!(check.propagation_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for content in [
            "[defaults]\nconcurrency = 0\n",
            "[defaults]\nconcurrency = 500\n",
            "[defaults]\nrate_limit = 0.0\n",
            "[defaults]\ntimeout = \"soon\"\n",
            "[defaults]\nmethod = \"finger\"\n",
            "[defaults]\nrecord_type = \"HINFO\"\n",
            "resolvers = []\n",
            "[defaults\n",
        ] {
            let temp_file = write_config(content);
            let result = ConfigManager::new().load_file(temp_file.path());
            assert!(
                matches!(result, Err(LookupError::Config { .. })),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let err = assert_err!(ConfigManager::new().load_file("/definitely/not/here.toml"));
        assert!(matches!(err, LookupError::Config { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(10),
                method: Some("rdap".to_string()),
                bootstrap: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(25),
                bootstrap: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let defaults = merge_configs(lower, higher).defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(25));
        assert_eq!(defaults.method.as_deref(), Some("rdap"));
        assert_eq!(defaults.bootstrap, Some(true));
    }

    #[test]
    fn test_discover_precedence() {
        let home = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let xdg = home.path().join(".config");
        fs::create_dir_all(xdg.join("domain-checker")).unwrap();

        fs::write(
            xdg.join("domain-checker").join("config.toml"),
            "[defaults]\nconcurrency = 5\nmethod = \"rdap\"\nrate_limit = 3.0\n",
        )
        .unwrap();
        fs::write(
            home.path().join(".domain-checker.toml"),
            "[defaults]\nconcurrency = 15\nmethod = \"whois\"\n",
        )
        .unwrap();
        fs::write(
            work.path().join("domain-checker.toml"),
            "[defaults]\nconcurrency = 30\n",
        )
        .unwrap();

        let manager = ConfigManager::with_dirs(
            Some(home.path().to_path_buf()),
            None,
            work.path().to_path_buf(),
        );
        let defaults = manager.discover_and_load().unwrap().defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(30));
        assert_eq!(defaults.method.as_deref(), Some("whois"));
        assert_eq!(defaults.rate_limit, Some(3.0));
    }

    #[test]
    fn test_discover_nothing() {
        let empty = TempDir::new().unwrap();
        let manager = ConfigManager::with_dirs(
            Some(empty.path().to_path_buf()),
            Some(empty.path().join("xdg")),
            empty.path().to_path_buf(),
        );
        assert_eq!(manager.discover_and_load().unwrap(), FileConfig::default());
    }

    #[test]
    fn test_env_config() {
        let env = EnvConfig::from_vars([
            ("DOMAIN_CHECKER_TIMEOUT", "2m"),
            ("DOMAIN_CHECKER_MAX_CONCURRENT", "40"),
            ("DOMAIN_CHECKER_RATE_LIMIT", "0.5"),
            ("DOMAIN_CHECKER_DEFAULT_METHOD", "DIG"),
            ("DOMAIN_CHECKER_BOOTSTRAP", "off"),
            ("DOMAIN_CHECKER_CONFIG", "/etc/dc.toml"),
            ("PATH", "/usr/bin"),
        ]);

        assert_eq!(env.timeout, Some(Duration::from_secs(120)));
        assert_eq!(env.concurrency, Some(40));
        assert_eq!(env.rate_limit, Some(0.5));
        assert_eq!(env.method, Some(LookupMethod::Dig));
        assert_eq!(env.bootstrap, Some(false));
        assert_eq!(env.config, Some(PathBuf::from("/etc/dc.toml")));

        let config = env.apply_to(CheckConfig::default());
        assert_eq!(config.concurrency, 40);
        assert_eq!(config.method, LookupMethod::Dig);
        assert!(!config.enable_bootstrap);
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let env = EnvConfig::from_vars([
            ("DOMAIN_CHECKER_TIMEOUT", "0"),
            ("DOMAIN_CHECKER_MAX_CONCURRENT", "0"),
            ("DOMAIN_CHECKER_RATE_LIMIT", "fast"),
            ("DOMAIN_CHECKER_DEFAULT_METHOD", "finger"),
            ("DOMAIN_CHECKER_BOOTSTRAP", "maybe"),
        ]);
        assert_eq!(env, EnvConfig::default());
    }
}
