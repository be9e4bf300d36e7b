//! Runtime configuration for the sync engine.
//!
//! Values come from the environment (optionally seeded from a `.env` file) and
//! fall back to defaults suited to a locally running API server.

use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_BASE_URL: &str = "BUDGET_API_URL";
pub const ENV_DEBOUNCE_MS: &str = "BUDGET_DEBOUNCE_MS";
pub const ENV_TIMEOUT_SECS: &str = "BUDGET_TIMEOUT_SECS";
pub const ENV_DEFAULT_CATEGORIES: &str = "BUDGET_DEFAULT_CATEGORIES";

/// Configuration shared by the remote adapter and the plan coalescer
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Base URL of the REST API, without trailing slash
    pub base_url: String,
    /// Quiet period after the last edit of a plan row before it is written
    pub debounce: Duration,
    /// Transport timeout; a timed-out call is a terminal failure
    pub request_timeout: Duration,
    /// Categories seeded as local rows when the server has no plan yet
    pub default_categories: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_categories: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            config = config.with_base_url(url);
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of milliseconds, got {:?}", ENV_DEBOUNCE_MS, raw))?;
            config.debounce = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of seconds, got {:?}", ENV_TIMEOUT_SECS, raw))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_DEFAULT_CATEGORIES) {
            config.default_categories = raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(1000));
    }

    #[test]
    fn test_environment_overrides() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            (ENV_BASE_URL, "http://budget.local:9000/api/"),
            (ENV_DEBOUNCE_MS, "250"),
            (ENV_TIMEOUT_SECS, "3"),
            (ENV_DEFAULT_CATEGORIES, "Loyer, Courses,,Transports"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://budget.local:9000/api");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.default_categories, vec!["Loyer", "Courses", "Transports"]);
    }

    #[test]
    fn test_invalid_debounce_is_an_error() {
        let result = SyncConfig::from_lookup(lookup_from(&[(ENV_DEBOUNCE_MS, "soon")]));
        assert!(result.is_err());
    }
}
