use super::capture::{CaptureConfig, DEFAULT_MAX_DIMENSION};
use super::convert::DisplayUnit;
use super::extract::{OCR_WHITELIST, ScoringWeights};
use super::rates::DEFAULT_CURRENCY;
use super::scheduler::DEFAULT_REFRESH_INTERVAL;
use crate::providers::{coinbase, tesseract};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoinbaseProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub coinbase: Option<CoinbaseProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coinbase: Some(CoinbaseProviderConfig {
                base_url: coinbase::DEFAULT_BASE_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScannerConfig {
    pub max_dimension: u32,
    pub ocr_command: String,
    pub language: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            max_dimension: DEFAULT_MAX_DIMENSION,
            ocr_command: tesseract::DEFAULT_COMMAND.to_string(),
            language: tesseract::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub unit: DisplayUnit,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            unit: DisplayUnit::default(),
            auto_refresh: true,
            refresh_interval_secs: default_refresh_interval_secs(),
            test_mode: false,
            dark_mode: false,
            providers: ProvidersConfig::default(),
            scanner: ScannerConfig::default(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or defaults if the file
    /// does not exist yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "satsconv", "satsconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn coinbase_base_url(&self) -> &str {
        self.providers
            .coinbase
            .as_ref()
            .map_or(coinbase::DEFAULT_BASE_URL, |p| &p.base_url)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            max_dimension: self.scanner.max_dimension,
            whitelist: OCR_WHITELIST.to_string(),
            weights: self.scoring,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "EUR"
unit: sats
auto_refresh: false
refresh_interval_secs: 60
test_mode: true
providers:
  coinbase:
    base_url: "http://example.com/coinbase"
scanner:
  max_dimension: 1024
scoring:
  symbol_adjacent: 3.0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.unit, DisplayUnit::Sats);
        assert!(!config.auto_refresh);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert!(config.test_mode);
        assert_eq!(config.coinbase_base_url(), "http://example.com/coinbase");
        assert_eq!(config.scanner.max_dimension, 1024);
        assert_eq!(config.scanner.ocr_command, "tesseract");
        assert_eq!(config.scoring.symbol_adjacent, 3.0);
        assert_eq!(config.scoring.cents, 1.0);

        let capture = config.capture_config();
        assert_eq!(capture.max_dimension, 1024);
        assert_eq!(capture.weights.symbol_adjacent, 3.0);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.currency, "USD");
        assert_eq!(config.unit, DisplayUnit::Btc);
        assert!(config.auto_refresh);
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.coinbase_base_url(), "https://api.coinbase.com");
    }
}
