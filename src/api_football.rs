use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::backoff::{ApiRequest, HttpGet, Sleeper, request_with_backoff};
use crate::config::ApiFootballConfig;
use crate::error::EtlError;
use crate::extract::ExtractSummary;
use crate::normalize::{Table, normalize_records};
use crate::storage;

pub fn fixtures_request(cfg: &ApiFootballConfig, season: i32) -> ApiRequest {
    ApiRequest::new(format!("{}/fixtures", cfg.base_url))
        .header("X-RapidAPI-Host", &cfg.host)
        .header("X-RapidAPI-Key", cfg.api_key.as_deref().unwrap_or_default())
        .query("league", cfg.league_id)
        .query("season", season)
}

/// Fixtures of one season as a normalized table. An empty table means the API had nothing.
pub fn fetch_season_fixtures<C, S>(
    cfg: &ApiFootballConfig,
    client: &C,
    sleeper: &S,
    season: i32,
) -> Result<Table>
where
    C: HttpGet + ?Sized,
    S: Sleeper + ?Sized,
{
    sleeper.sleep(cfg.pacing);
    let req = fixtures_request(cfg, season);
    let resp = request_with_backoff(client, sleeper, &req, &cfg.backoff)?;
    let data = resp
        .json()
        .with_context(|| format!("decode fixtures league {} season {season}", cfg.league_id))?;
    fixtures_table(&data, &format!("league {} season {season}", cfg.league_id))
}

/// api-football reports bad keys and plan limits inside a 200 body under `errors`.
pub fn fixtures_table(data: &Value, context: &str) -> Result<Table> {
    if has_reported_errors(data) {
        let errors = data.get("errors").cloned().unwrap_or(Value::Null);
        return Err(EtlError::unexpected_shape(context, &errors).into());
    }
    let records = data
        .get("response")
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or_default();
    Ok(normalize_records(records))
}

fn has_reported_errors(data: &Value) -> bool {
    match data.get("errors") {
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        _ => false,
    }
}

pub fn run_api_football<C, S>(
    cfg: &ApiFootballConfig,
    client: &C,
    sleeper: &S,
) -> Result<ExtractSummary>
where
    C: HttpGet + ?Sized,
    S: Sleeper + ?Sized,
{
    let seasons: Vec<i32> = (cfg.start_season..=cfg.end_season).collect();
    let mut summary = ExtractSummary {
        seasons_total: seasons.len(),
        ..ExtractSummary::default()
    };

    for season in seasons {
        info!(league = cfg.league_id, season, "fetching fixtures");
        let outcome = fetch_season_fixtures(cfg, client, sleeper, season).and_then(|table| {
            if table.is_empty() {
                info!(season, "no matches found");
                return Ok(None);
            }
            let path = storage::api_football_csv_path(&cfg.raw_dir, &cfg.code, season);
            table.write_csv(&path)?;
            info!(path = %path.display(), rows = table.len(), "saved fixtures");
            Ok(Some((table.len(), path)))
        });
        match outcome {
            Ok(Some((rows, path))) => {
                summary.rows_total += rows;
                summary.seasons_succeeded += 1;
                summary.files_written.push(path);
            }
            Ok(None) => summary.seasons_succeeded += 1,
            Err(err) => summary.record_failure(cfg.on_error, season, err)?,
        }
    }
    Ok(summary)
}
