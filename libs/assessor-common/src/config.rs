// Engine configuration, read from the environment with defaults
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EXECUTION_API_URL: &str = "https://emkc.org/api/v2/piston";
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_LANGUAGES_CONFIG: &str = "config/languages.json";
pub const DEFAULT_TREND_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub execution_api_url: String,
    pub execution_timeout_ms: u64,
    pub languages_config: PathBuf,
    pub trend_window_days: u32,
    pub bind_addr: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_api_url: DEFAULT_EXECUTION_API_URL.to_string(),
            execution_timeout_ms: DEFAULT_EXECUTION_TIMEOUT_MS,
            languages_config: PathBuf::from(DEFAULT_LANGUAGES_CONFIG),
            trend_window_days: DEFAULT_TREND_WINDOW_DAYS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl EngineConfig {
    /// Build from EXECUTION_API_URL, EXECUTION_TIMEOUT_MS, LANGUAGES_CONFIG,
    /// TREND_WINDOW_DAYS and BIND_ADDR. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("EXECUTION_API_URL") {
            config.execution_api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("EXECUTION_TIMEOUT_MS") {
            config.execution_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("EXECUTION_TIMEOUT_MS is not a number: {}", raw))?;
        }
        if let Some(path) = lookup("LANGUAGES_CONFIG") {
            config.languages_config = PathBuf::from(path);
        }
        if let Some(raw) = lookup("TREND_WINDOW_DAYS") {
            config.trend_window_days = raw
                .trim()
                .parse()
                .with_context(|| format!("TREND_WINDOW_DAYS is not a number: {}", raw))?;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }

        Ok(config)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}
