use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::PortfolioTier;

/// Points awarded once a value reaches `min`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBand {
    pub min: f64,
    pub points: u32,
}

const fn band(min: f64, points: u32) -> ScoreBand {
    ScoreBand { min, points }
}

/// Lead score thresholds. Bands are checked highest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeadScoreBands {
    pub growing: u32,
    pub large: u32,
    pub major: u32,
    pub enterprise: u32,
    pub team_size: Vec<ScoreBand>,
    pub savings: Vec<ScoreBand>,
    pub any_savings: u32,
    pub points_per_task: u32,
    pub max_task_points: u32,
}

impl LeadScoreBands {
    pub fn portfolio_points(&self, tier: PortfolioTier) -> u32 {
        match tier {
            PortfolioTier::Growing => self.growing,
            PortfolioTier::Large => self.large,
            PortfolioTier::Major => self.major,
            PortfolioTier::Enterprise => self.enterprise,
        }
    }
}

impl Default for LeadScoreBands {
    fn default() -> Self {
        Self {
            growing: 10,
            large: 20,
            major: 25,
            enterprise: 30,
            team_size: vec![
                band(10.0, 25),
                band(5.0, 20),
                band(3.0, 15),
                band(2.0, 10),
                band(1.0, 5),
            ],
            savings: vec![
                band(300_000.0, 25),
                band(200_000.0, 20),
                band(100_000.0, 15),
                band(50_000.0, 10),
            ],
            any_savings: 5,
            points_per_task: 2,
            max_task_points: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub direct_rate_ttl_secs: u64,
    pub rate_cache_ttl_secs: i64,
    pub salary_cache_ttl_secs: i64,
    pub cache_dir: PathBuf,
    pub use_fallback_rates: bool,
    pub http_timeout_secs: u64,
    pub salary_url: Option<String>,
    pub lead_score: LeadScoreBands,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            direct_rate_ttl_secs: 5 * 60,
            rate_cache_ttl_secs: 24 * 60 * 60,
            salary_cache_ttl_secs: 24 * 60 * 60,
            cache_dir: PathBuf::from(".savings-cache"),
            use_fallback_rates: false,
            http_timeout_secs: 10,
            salary_url: None,
            lead_score: LeadScoreBands::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with the JSON file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config: {:?}", path))?;
        Ok(config)
    }

    pub fn direct_rate_ttl(&self) -> Duration {
        Duration::from_secs(self.direct_rate_ttl_secs)
    }

    pub fn rate_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.rate_cache_ttl_secs)
    }

    pub fn salary_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.salary_cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
