use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::arn::Arn;
use crate::error::{LogshipError, Result};

/// Retention periods CloudWatch Logs accepts for `PutRetentionPolicy`.
pub const VALID_RETENTION_DAYS: &[i32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub region: Option<String>,
    pub destination_arn: Option<String>,
    pub filter_pattern: String,
    pub processor_function_name: Option<String>,
    pub log_group_prefix: Option<String>,
    pub retention_days: Option<i32>,
    pub invoke_timeout: Duration,
    pub prune_prefix: String,
    pub prune_page_size: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            destination_arn: None,
            filter_pattern: String::new(),
            processor_function_name: None,
            log_group_prefix: None,
            retention_days: None,
            invoke_timeout: Duration::from_secs(3),
            prune_prefix: "/aws/lambda".to_string(),
            prune_page_size: 50,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn require_destination_arn(&self) -> Result<Arn> {
        let raw = self
            .destination_arn
            .as_deref()
            .ok_or_else(|| LogshipError::Config("DESTINATION_ARN is not set".to_string()))?;
        Arn::parse(raw).map_err(|e| LogshipError::Config(format!("bad DESTINATION_ARN: {e}")))
    }

    pub fn require_processor_function_name(&self) -> Result<&str> {
        self.processor_function_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LogshipError::Config("PROCESSOR_FUNCTION_NAME is not set".to_string()))
    }

    pub fn require_retention_days(&self) -> Result<i32> {
        self.retention_days
            .ok_or_else(|| LogshipError::Config("RETENTION_DAYS is not set".to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    region: Option<String>,
    destination_arn: Option<String>,
    filter_pattern: Option<String>,
    processor_function_name: Option<String>,
    log_group_prefix: Option<String>,
    retention_days: Option<i32>,
    invoke_timeout: Option<String>,
    prune_prefix: Option<String>,
    prune_page_size: Option<i32>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("LOGSHIP_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("logship/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| LogshipError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| LogshipError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    overrides_from_lookup(|key| env::var(key).ok())
}

fn overrides_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<ConfigOverrides> {
    let number = |key: &str, field: &str| -> Result<Option<i32>> {
        lookup(key)
            .map(|raw| {
                raw.trim().parse::<i32>().map_err(|e| {
                    LogshipError::Config(format!("bad {field} in environment: {e} (value={raw})"))
                })
            })
            .transpose()
    };

    Ok(ConfigOverrides {
        region: lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")),
        destination_arn: lookup("DESTINATION_ARN"),
        filter_pattern: lookup("FILTER_PATTERN"),
        processor_function_name: lookup("PROCESSOR_FUNCTION_NAME"),
        log_group_prefix: lookup("PREFIX"),
        retention_days: number("RETENTION_DAYS", "retention_days")?,
        invoke_timeout: lookup("LOGSHIP_INVOKE_TIMEOUT"),
        prune_prefix: lookup("LOGSHIP_PRUNE_PREFIX"),
        prune_page_size: number("LOGSHIP_PRUNE_PAGE_SIZE", "prune_page_size")?,
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.region {
        cfg.region = Some(v);
    }
    if let Some(v) = overrides.destination_arn {
        cfg.destination_arn = Some(v);
    }
    if let Some(v) = overrides.filter_pattern {
        cfg.filter_pattern = v;
    }
    if let Some(v) = overrides.processor_function_name {
        cfg.processor_function_name = Some(v);
    }
    if let Some(v) = overrides.log_group_prefix {
        cfg.log_group_prefix = Some(v).filter(|p| !p.is_empty());
    }
    if let Some(v) = overrides.retention_days {
        cfg.retention_days = Some(validate_retention_days(v).map_err(|e| {
            LogshipError::Config(format!("bad retention_days in {source}: {e} (value={v})"))
        })?);
    }
    if let Some(v) = overrides.invoke_timeout {
        cfg.invoke_timeout = humantime::parse_duration(&v).map_err(|e| {
            LogshipError::Config(format!("bad invoke_timeout in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.prune_prefix {
        cfg.prune_prefix = v;
    }
    if let Some(v) = overrides.prune_page_size {
        if !(1..=50).contains(&v) {
            return Err(LogshipError::Config(format!(
                "bad prune_page_size in {source}: expected 1..=50 (value={v})"
            )));
        }
        cfg.prune_page_size = v;
    }
    Ok(())
}

pub fn validate_retention_days(days: i32) -> Result<i32> {
    if !VALID_RETENTION_DAYS.contains(&days) {
        return Err(LogshipError::InvalidArgument(format!(
            "{days} is not a retention period CloudWatch Logs accepts"
        )));
    }
    Ok(days)
}
