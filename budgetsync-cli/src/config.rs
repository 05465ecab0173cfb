use anyhow::{Context, Result};
use budgetsync_finance::ai_classifier::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use budgetsync_finance::assembler::DEFAULT_WINDOW_DAYS;
use budgetsync_finance::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use budgetsync_finance::SyncOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::ensure_budgetsync_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aggregator: AggregatorSection,
    pub classifier: ClassifierSection,
    pub sync: SyncSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    /// sandbox | development | production
    pub environment: String,
    /// Overrides the environment's base URL (local mocks, proxies)
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub enabled: bool,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub window_days: i64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            base_url: None,
        }
    }
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
        }
    }
}

impl SyncSection {
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            window_days: self.window_days.max(0),
            ..SyncOptions::default()
        }
        .with_timing(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_budgetsync_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse_config(
            r#"
[aggregator]
environment = "development"

[sync]
max_attempts = 2
"#,
        )
        .unwrap();
        assert_eq!(cfg.aggregator.environment, "development");
        assert!(cfg.aggregator.base_url.is_none());
        assert_eq!(cfg.sync.max_attempts, 2);
        assert_eq!(cfg.sync.window_days, 90);
        assert_eq!(cfg.sync.base_delay_ms, 500);
        assert!(cfg.classifier.enabled);
        assert_eq!(cfg.classifier.model, "gpt-4o-mini");
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn test_written_defaults_parse_back() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(s.contains("[classifier]"));
        assert_eq!(parse_config(&s).unwrap(), Config::default());
    }

    #[test]
    fn test_sync_section_to_options() {
        let section = SyncSection {
            window_days: 30,
            max_attempts: 0,
            base_delay_ms: 10,
        };
        let opts = section.options();
        assert_eq!(opts.window_days, 30);
        assert_eq!(opts.transactions.max_attempts, 1);
        assert_eq!(opts.liabilities.base_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(parse_config("[sync\nwindow_days = ").is_err());
    }
}
