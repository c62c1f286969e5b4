//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.reviewstats.toml` files.

use crate::models::Sentiment;
use crate::service::ServiceOptions;
use crate::stats::StatOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".reviewstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Review and parameter store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Keyword ranking settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Sentiment trend settings.
    #[serde(default)]
    pub trend: TrendConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Run calculators concurrently on the blocking pool.
    #[serde(default)]
    pub parallel: bool,
}

/// Where reviews and parameters live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Review file (JSON array or JSON lines).
    #[serde(default = "default_reviews")]
    pub reviews: String,

    /// Parameter file (JSON object).
    #[serde(default = "default_parameters")]
    pub parameters: String,

    /// Deployment stage appended to parameter names.
    #[serde(default = "default_stage")]
    pub stage: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reviews: default_reviews(),
            parameters: default_parameters(),
            stage: default_stage(),
        }
    }
}

fn default_reviews() -> String {
    "reviews.json".to_string()
}

fn default_parameters() -> String {
    "parameters.json".to_string()
}

fn default_stage() -> String {
    "dev".to_string()
}

/// Keyword ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Keywords returned per polarity.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Unstaged parameter name of the ignore list.
    #[serde(default = "default_ignore_list_key")]
    pub ignore_list_key: String,

    /// Ignore-list lookup timeout in milliseconds.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_ms: u64,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            ignore_list_key: default_ignore_list_key(),
            lookup_timeout_ms: default_lookup_timeout(),
        }
    }
}

fn default_top_n() -> usize {
    crate::stats::DEFAULT_TOP_KEYWORDS
}

fn default_ignore_list_key() -> String {
    "ignoreList".to_string()
}

fn default_lookup_timeout() -> u64 {
    2000
}

/// Sentiment trend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Tracked polarity: NEGATIVE or POSITIVE.
    #[serde(default = "default_polarity")]
    pub polarity: String,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            polarity: default_polarity(),
        }
    }
}

fn default_polarity() -> String {
    "NEGATIVE".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref reviews) = args.reviews {
            self.store.reviews = reviews.display().to_string();
        }
        if let Some(ref parameters) = args.parameters {
            self.store.parameters = parameters.display().to_string();
        }
        if let Some(ref stage) = args.stage {
            self.store.stage = stage.clone();
        }

        // Flags always override
        if args.parallel {
            self.general.parallel = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.trend_polarity()?;
        if self.keywords.top_n == 0 {
            bail!("[keywords] top_n must be at least 1");
        }
        if self.keywords.lookup_timeout_ms == 0 {
            bail!("[keywords] lookup_timeout_ms must be at least 1");
        }
        Ok(())
    }

    /// The configured trend polarity.
    pub fn trend_polarity(&self) -> Result<Sentiment> {
        match Sentiment::parse(&self.trend.polarity) {
            Some(polarity @ (Sentiment::Positive | Sentiment::Negative)) => Ok(polarity),
            _ => bail!(
                "[trend] polarity must be POSITIVE or NEGATIVE, got '{}'",
                self.trend.polarity
            ),
        }
    }

    /// Calculator tunables.
    pub fn stat_options(&self) -> Result<StatOptions> {
        Ok(StatOptions {
            top_keywords: self.keywords.top_n,
            trend_polarity: self.trend_polarity()?,
        })
    }

    /// Stats service options.
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            stage: self.store.stage.clone(),
            ignore_list_key: self.keywords.ignore_list_key.clone(),
            lookup_timeout: Duration::from_millis(self.keywords.lookup_timeout_ms),
            parallel: self.general.parallel,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
