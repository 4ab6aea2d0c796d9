//! Harvest configuration.
//!
//! Resolution order, highest first: CLI flags, environment variables
//! (`TARIFF_HARVEST_OUTPUT`, `TARIFF_HARVEST_DB`, `TARIFF_HARVEST_BASE_URL`),
//! an optional JSON config file, then the built-in defaults.

use crate::harvester::HarvestInput;
use crate::sink::SqliteSink;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root of the CBSA customs tariff pages.
pub const DEFAULT_BASE_URL: &str = "https://www.cbsa-asfc.gc.ca/trade-commerce/tariff-tarif";

/// Commonly requested goods categories searched by default.
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "electronics",
    "clothing",
    "textiles",
    "machinery",
    "automotive",
    "food",
    "chemicals",
    "plastics",
    "wood",
    "metals",
];

pub const DEFAULT_OUTPUT: &str = "hs_codes.json";

pub const ENV_OUTPUT: &str = "TARIFF_HARVEST_OUTPUT";
pub const ENV_DATABASE: &str = "TARIFF_HARVEST_DB";
pub const ENV_BASE_URL: &str = "TARIFF_HARVEST_BASE_URL";

/// Lowest and highest HS chapter numbers.
pub const CHAPTER_RANGE: (u8, u8) = (1, 99);

/// Which inputs a run walks through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HarvestMode {
    /// Keyword searches over `categories`.
    #[default]
    Categories,
    /// Chapter tables `first_chapter..=last_chapter`.
    Chapters,
    /// Categories first, then chapters.
    All,
}

/// Where the final collection goes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Json,
    Sqlite,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    /// Minimum gap between consecutive requests.
    pub delay_ms: u64,
    /// Extra attempts for retryable fetch failures. 0 disables retry.
    pub max_retries: u32,
    pub categories: Vec<String>,
    pub first_chapter: u8,
    pub last_chapter: u8,
    pub mode: HarvestMode,
    pub output: PathBuf,
    pub sink: SinkKind,
    /// SQLite cache path; `None` means `~/.tariff-harvest/hs_codes.db`.
    pub database: Option<PathBuf>,
    /// Optional JSONL fetch ledger.
    pub audit_log: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: default_user_agent(),
            timeout_ms: 10_000,
            delay_ms: 1_000,
            max_retries: 0,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            first_chapter: CHAPTER_RANGE.0,
            last_chapter: CHAPTER_RANGE.1,
            mode: HarvestMode::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            sink: SinkKind::default(),
            database: None,
            audit_log: None,
        }
    }
}

/// Descriptive client identity sent with every request.
pub fn default_user_agent() -> String {
    format!(
        "tariff-harvest/{} (+https://github.com/agentralabs/tariff-harvest)",
        env!("CARGO_PKG_VERSION")
    )
}

impl HarvestConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(output) = lookup(ENV_OUTPUT) {
            self.output = PathBuf::from(output);
        }
        if let Some(db) = lookup(ENV_DATABASE) {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(base) = lookup(ENV_BASE_URL) {
            self.base_url = base;
        }
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base URL must be http or https, got {}", url.scheme());
        }

        if self.user_agent.trim().is_empty() {
            bail!("user agent must not be empty");
        }
        if self.timeout_ms == 0 {
            bail!("timeout must be greater than zero");
        }

        let (lo, hi) = CHAPTER_RANGE;
        if self.first_chapter < lo || self.last_chapter > hi {
            bail!(
                "chapters must lie within {lo}..={hi}, got {}..={}",
                self.first_chapter,
                self.last_chapter
            );
        }
        if self.first_chapter > self.last_chapter {
            bail!(
                "first chapter {} is after last chapter {}",
                self.first_chapter,
                self.last_chapter
            );
        }

        if self.mode != HarvestMode::Chapters {
            if self.categories.is_empty() {
                bail!("no categories configured for mode {:?}", self.mode);
            }
            if self.categories.iter().any(|c| c.trim().is_empty()) {
                bail!("categories must not be blank");
            }
        }

        Ok(())
    }

    /// The ordered list of inputs this configuration asks for.
    pub fn plan(&self) -> Vec<HarvestInput> {
        let categories = self
            .categories
            .iter()
            .map(|c| HarvestInput::Category(c.trim().to_string()));
        let chapters = (self.first_chapter..=self.last_chapter).map(HarvestInput::Chapter);

        match self.mode {
            HarvestMode::Categories => categories.collect(),
            HarvestMode::Chapters => chapters.collect(),
            HarvestMode::All => categories.chain(chapters).collect(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(SqliteSink::default_path)
    }
}
