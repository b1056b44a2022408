use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::backoff::{ApiRequest, HttpGet, Sleeper, request_with_backoff};
use crate::config::{ErrorPolicy, FootballDataConfig};
use crate::flatten::{self, MatchRow};
use crate::seasons::{self, today_utc};
use crate::storage;

#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    pub seasons_total: usize,
    pub seasons_succeeded: usize,
    pub rows_total: usize,
    pub files_written: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl ExtractSummary {
    pub(crate) fn record_failure(
        &mut self,
        policy: ErrorPolicy,
        season: i32,
        err: anyhow::Error,
    ) -> Result<()> {
        match policy {
            ErrorPolicy::Abort => Err(err.context(format!("season {season}"))),
            ErrorPolicy::Skip => {
                warn!(season, "season failed, continuing: {err:#}");
                self.errors.push(format!("season {season}: {err:#}"));
                Ok(())
            }
        }
    }
}

pub fn season_years_for(cfg: &FootballDataConfig) -> Vec<i32> {
    let sel = &cfg.seasons;
    seasons::season_years(
        sel.last_n_back,
        sel.include_current,
        sel.today.unwrap_or_else(today_utc),
        sel.span,
    )
}

pub fn matches_request(cfg: &FootballDataConfig, year: i32) -> ApiRequest {
    ApiRequest::new(format!(
        "{}/competitions/{}/matches",
        cfg.base_url, cfg.competition
    ))
    .header("X-Auth-Token", &cfg.api_key)
    .query("season", year)
}

/// Paces, fetches and validates one season. The payload is returned untouched.
pub fn fetch_matches_for_season<C, S>(
    cfg: &FootballDataConfig,
    client: &C,
    sleeper: &S,
    year: i32,
) -> Result<Value>
where
    C: HttpGet + ?Sized,
    S: Sleeper + ?Sized,
{
    sleeper.sleep(cfg.pacing);
    let req = matches_request(cfg, year);
    let resp = request_with_backoff(client, sleeper, &req, &cfg.backoff)?;
    let data = resp
        .json()
        .with_context(|| format!("decode {} {}", cfg.competition, year))?;
    flatten::match_list(&data, &format!("{} {}", cfg.competition, year))?;
    Ok(data)
}

pub fn run_football_data<C, S>(
    cfg: &FootballDataConfig,
    client: &C,
    sleeper: &S,
    years: &[i32],
) -> Result<ExtractSummary>
where
    C: HttpGet + ?Sized,
    S: Sleeper + ?Sized,
{
    info!(competition = %cfg.competition, ?years, "seasons to fetch");
    let mut summary = ExtractSummary {
        seasons_total: years.len(),
        ..ExtractSummary::default()
    };

    for &year in years {
        info!(competition = %cfg.competition, season = year, "fetching");
        let outcome = fetch_matches_for_season(cfg, client, sleeper, year)
            .and_then(|data| persist_season(cfg, year, &data));
        match outcome {
            Ok((rows, written)) => {
                summary.rows_total += rows;
                summary.seasons_succeeded += 1;
                summary.files_written.extend(written);
            }
            Err(err) => summary.record_failure(cfg.on_error, year, err)?,
        }
    }

    info!(
        rows = summary.rows_total,
        seasons = summary.seasons_succeeded,
        "football-data extract done"
    );
    Ok(summary)
}

fn persist_season(
    cfg: &FootballDataConfig,
    year: i32,
    data: &Value,
) -> Result<(usize, Vec<PathBuf>)> {
    let raw_path = storage::raw_matches_path(&cfg.raw_dir, &cfg.competition, year);
    storage::save_json(data, &raw_path)?;
    info!(path = %raw_path.display(), "saved raw json");

    let rows = flatten::flatten_matches(data)?;
    let csv_path = storage::processed_matches_path(&cfg.processed_dir, &cfg.competition, year);
    flatten::write_matches_csv(&csv_path, &rows)?;
    info!(path = %csv_path.display(), rows = rows.len(), "saved csv");

    Ok((rows.len(), vec![raw_path, csv_path]))
}

/// Rebuilds every `matches_{year}.csv` from the raw JSON already on disk.
pub fn reflatten_from_raw(
    raw_dir: &Path,
    processed_dir: &Path,
    competition: &str,
) -> Result<ExtractSummary> {
    let mut summary = ExtractSummary::default();
    for year in raw_season_years(raw_dir, competition)? {
        summary.seasons_total += 1;
        let raw_path = storage::raw_matches_path(raw_dir, competition, year);
        let data = storage::load_json(&raw_path)?;
        let rows: Vec<MatchRow> = flatten::flatten_matches(&data)
            .with_context(|| format!("flatten {}", raw_path.display()))?;
        let csv_path = storage::processed_matches_path(processed_dir, competition, year);
        flatten::write_matches_csv(&csv_path, &rows)?;
        info!(path = %csv_path.display(), rows = rows.len(), "rebuilt csv");

        summary.rows_total += rows.len();
        summary.seasons_succeeded += 1;
        summary.files_written.push(csv_path);
    }
    Ok(summary)
}

/// Season directories under `{raw}/football-data/{competition}` that hold a raw payload.
fn raw_season_years(raw_dir: &Path, competition: &str) -> Result<Vec<i32>> {
    let dir = storage::competition_dir(raw_dir, competition);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut years = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("list {}", dir.display()))? {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        let Some(year) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<i32>().ok())
        else {
            continue;
        };
        if entry.path().join(storage::RAW_MATCHES_FILE).is_file() {
            years.push(year);
        }
    }
    years.sort_unstable();
    Ok(years)
}
