//! Application configuration management.
//!
//! Holds the backend base URL, the default simulation date, request timeout
//! and query cache timings, plus the last selected location.
//!
//! Configuration is stored at `~/.config/aadhaar-pulse/config.json` and can
//! be overridden from the environment (`PULSE_API_URL`,
//! `PULSE_SIMULATION_DATE`, `PULSE_STALE_SECS`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{LocationFilter, SimulationDate};

/// Application name used for config directory paths
const APP_NAME: &str = "aadhaar-pulse";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub const ENV_API_URL: &str = "PULSE_API_URL";
pub const ENV_SIMULATION_DATE: &str = "PULSE_SIMULATION_DATE";
pub const ENV_STALE_SECS: &str = "PULSE_STALE_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub simulation_date: SimulationDate,
    pub request_timeout_secs: u64,
    /// How long a successful query result is served without refetching.
    pub stale_time_secs: u64,
    /// How long an unobserved query entry is kept before removal.
    pub gc_time_secs: u64,
    pub last_state: Option<String>,
    pub last_district: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            simulation_date: SimulationDate::default(),
            request_timeout_secs: 30,
            stale_time_secs: 300,
            gc_time_secs: 300,
            last_state: None,
            last_district: None,
        }
    }
}

impl Config {
    /// Load from the user config directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let mut config: Self = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            config.api_base_url = normalize_base_url(&config.api_base_url);
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `PULSE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any name -> value lookup. Invalid values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = normalize_base_url(&url);
        }
        if let Some(raw) = lookup(ENV_SIMULATION_DATE) {
            match raw.parse() {
                Ok(date) => self.simulation_date = date,
                Err(e) => warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {}",
                    ENV_SIMULATION_DATE
                ),
            }
        }
        if let Some(raw) = lookup(ENV_STALE_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.stale_time_secs = secs,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid {}", ENV_STALE_SECS),
            }
        }
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_time_secs)
    }

    /// The remembered location, district dropped if no state is stored.
    pub fn last_location(&self) -> LocationFilter {
        LocationFilter::default()
            .with_state(self.last_state.clone())
            .with_district(self.last_state.as_ref().and(self.last_district.clone()))
    }

    pub fn remember_location(&mut self, filter: &LocationFilter) {
        self.last_state = filter.state().map(str::to_string);
        self.last_district = filter.district().map(str::to_string);
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.simulation_date.as_param(), "2025-12-15");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.api_base_url = "https://pulse.example.org".to_string();
        config.remember_location(&LocationFilter::for_state("Goa").with_district(Some("North Goa".into())));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.last_location().label(), "North Goa, Goa");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url": "http://10.0.0.5:8000/"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.5:8000");
        assert_eq!(config.stale_time_secs, 300);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://api.example.org/"),
            (ENV_SIMULATION_DATE, "2025-06-01"),
            (ENV_STALE_SECS, "not-a-number"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "https://api.example.org");
        assert_eq!(config.simulation_date.as_param(), "2025-06-01");
        assert_eq!(config.stale_time_secs, 300);
    }

    #[test]
    fn test_last_location_ignores_orphan_district() {
        let config = Config {
            last_district: Some("Puri".into()),
            ..Config::default()
        };
        assert!(config.last_location().is_all_india());
    }
}
