use crate::errors::ConfigError;
use crate::model::ComparisonMode;
use crate::sanitize::ReservedWord;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const ENV_WORKERS: &str = "REFUTE_WORKERS";
pub const ENV_TIMEOUT_SECONDS: &str = "REFUTE_TIMEOUT_SECONDS";
pub const ENV_ORDER_SENSITIVE: &str = "REFUTE_ORDER_SENSITIVE";

/// Harness settings. Every field has a default so an empty file (or no
/// file) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub workers: usize,
    pub timeout_seconds: u64,
    pub order_sensitive: bool,
    /// Results with more rows than this are reported as a row count only.
    pub inline_max_rows: usize,
    pub sample_rows: usize,
    /// Also run the identifier passes over the two queries.
    pub sanitize_queries: bool,
    pub reserved_words: Vec<ReservedWord>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            timeout_seconds: 30,
            order_sensitive: false,
            inline_max_rows: 100,
            sample_rows: 10,
            sanitize_queries: false,
            reserved_words: ReservedWord::defaults(),
        }
    }
}

impl HarnessConfig {
    pub fn comparison_mode(&self) -> ComparisonMode {
        ComparisonMode::from_flag(self.order_sensitive)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Applies `REFUTE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|k| env::var(k).ok());
    }

    /// Same as [`HarnessConfig::apply_env`] with an explicit lookup.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_WORKERS) {
            match v.trim().parse() {
                Ok(n) => self.workers = n,
                Err(_) => tracing::warn!(var = ENV_WORKERS, value = %v, "ignoring invalid value"),
            }
        }
        if let Some(v) = lookup(ENV_TIMEOUT_SECONDS) {
            match v.trim().parse() {
                Ok(n) => self.timeout_seconds = n,
                Err(_) => {
                    tracing::warn!(var = ENV_TIMEOUT_SECONDS, value = %v, "ignoring invalid value")
                }
            }
        }
        if let Some(v) = lookup(ENV_ORDER_SENSITIVE) {
            match parse_bool(&v) {
                Some(b) => self.order_sensitive = b,
                None => {
                    tracing::warn!(var = ENV_ORDER_SENSITIVE, value = %v, "ignoring invalid value")
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError("workers must be at least 1".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError("timeout_seconds must be at least 1".into()));
        }
        if self.reserved_words.iter().any(|r| r.word.trim().is_empty()) {
            return Err(ConfigError("reserved_words entries need a non-empty word".into()));
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw).map_err(|e| ConfigError(format!("{} (file: {})", e, path.display())))
}

pub fn parse_config(raw: &str) -> Result<HarnessConfig, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(HarnessConfig::default());
    }

    let mut ignored = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: HarnessConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored.push(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored.is_empty() {
        tracing::warn!(keys = ?ignored, "ignoring unknown config fields");
    }

    cfg.validate()?;
    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"# refute harness settings
workers: 4
timeout_seconds: 30
order_sensitive: false
inline_max_rows: 100
sample_rows: 10
sanitize_queries: false
reserved_words:
  - word: ORDER
    unless_followed_by: BY
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write {}: {}", path.display(), e)))
}
