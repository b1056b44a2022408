use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use crate::backoff::BackoffPolicy;
use crate::error::EtlError;
use crate::seasons::SeasonSpan;

pub const FOOTBALL_DATA_KEY_ENV: &str = "FOOTBALL_DATA_API_KEY";
pub const API_FOOTBALL_KEY_ENV: &str = "API_FOOTBALL_KEY";

pub const FOOTBALL_DATA_API_BASE: &str = "https://api.football-data.org/v4";
pub const API_FOOTBALL_HOST: &str = "v3.football.api-sports.io";

const DEFAULT_PACING_SECS: u64 = 6;

/// What a season-level failure does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

impl ErrorPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "abort" | "fail" => Some(Self::Abort),
            "skip" | "continue" => Some(Self::Skip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeasonSelection {
    pub last_n_back: u32,
    pub include_current: bool,
    pub span: SeasonSpan,
    /// `None` means today's UTC date.
    pub today: Option<NaiveDate>,
}

impl Default for SeasonSelection {
    fn default() -> Self {
        Self {
            last_n_back: 5,
            include_current: true,
            span: SeasonSpan::Legacy,
            today: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FootballDataConfig {
    pub api_key: String,
    pub base_url: String,
    pub competition: String,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub seasons: SeasonSelection,
    pub pacing: Duration,
    pub backoff: BackoffPolicy,
    pub on_error: ErrorPolicy,
}

impl FootballDataConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: FOOTBALL_DATA_API_BASE.to_string(),
            competition: "PL".to_string(),
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            seasons: SeasonSelection::default(),
            pacing: Duration::from_secs(DEFAULT_PACING_SECS),
            backoff: BackoffPolicy::default(),
            on_error: ErrorPolicy::Abort,
        }
    }

    /// Requires the API key; `FOOTBALL_DATA_API_BASE` optionally overrides the endpoint.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::new(football_data_key(env::var(FOOTBALL_DATA_KEY_ENV).ok())?);
        if let Some(base) = base_url_override("FOOTBALL_DATA_API_BASE") {
            cfg.base_url = base;
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct ApiFootballConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub host: String,
    pub league_id: u32,
    pub code: String,
    pub start_season: i32,
    pub end_season: i32,
    pub raw_dir: PathBuf,
    pub pacing: Duration,
    pub backoff: BackoffPolicy,
    pub on_error: ErrorPolicy,
}

impl ApiFootballConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: format!("https://{API_FOOTBALL_HOST}"),
            host: API_FOOTBALL_HOST.to_string(),
            league_id: 39,
            code: "PL".to_string(),
            start_season: 2015,
            end_season: 2025,
            raw_dir: PathBuf::from("data/raw"),
            pacing: Duration::from_secs(DEFAULT_PACING_SECS),
            backoff: BackoffPolicy::default(),
            on_error: ErrorPolicy::Abort,
        }
    }

    /// `API_FOOTBALL_KEY` is optional; `API_FOOTBALL_API_BASE` optionally overrides the endpoint.
    pub fn from_env() -> Self {
        let mut cfg = Self::new(api_football_key_from_env());
        if let Some(base) = base_url_override("API_FOOTBALL_API_BASE") {
            cfg.base_url = base;
        }
        cfg
    }
}

/// Unset or blank keys are fatal before any request goes out.
pub fn football_data_key(raw: Option<String>) -> Result<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EtlError::MissingApiKey(FOOTBALL_DATA_KEY_ENV).into())
}

/// api-football requests still go out without a key; the server answers with its own error.
pub fn api_football_key_from_env() -> Option<String> {
    let key = opt_env(API_FOOTBALL_KEY_ENV);
    if key.is_none() {
        warn!("{API_FOOTBALL_KEY_ENV} not set, sending requests with an empty key");
    }
    key
}

/// Accepts the loose truthy spellings `1/true/yes/y`; anything else is false.
pub fn parse_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn base_url_override(key: &str) -> Option<String> {
    opt_env(key).map(|s| s.trim_end_matches('/').to_string())
}
