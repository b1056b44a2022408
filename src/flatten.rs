use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EtlError;
use crate::storage;

/// CSV column order for flattened football-data.org matches.
pub const MATCH_COLUMNS: [&str; 24] = [
    "match_id",
    "utc_date",
    "status",
    "matchday",
    "stage",
    "group",
    "last_updated",
    "competition_id",
    "competition_code",
    "competition_name",
    "season_id",
    "season_start_date",
    "season_end_date",
    "season_current_matchday",
    "home_team_id",
    "home_team_name",
    "away_team_id",
    "away_team_name",
    "full_time_home",
    "full_time_away",
    "half_time_home",
    "half_time_away",
    "winner",
    "duration",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub match_id: Option<u64>,
    pub utc_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub matchday: Option<i64>,
    pub stage: Option<String>,
    pub group: Option<String>,
    pub last_updated: Option<String>,

    pub competition_id: Option<u64>,
    pub competition_code: Option<String>,
    pub competition_name: Option<String>,

    pub season_id: Option<u64>,
    pub season_start_date: Option<String>,
    pub season_end_date: Option<String>,
    pub season_current_matchday: Option<i64>,

    pub home_team_id: Option<u64>,
    pub home_team_name: Option<String>,
    pub away_team_id: Option<u64>,
    pub away_team_name: Option<String>,

    pub full_time_home: Option<i64>,
    pub full_time_away: Option<i64>,
    pub half_time_home: Option<i64>,
    pub half_time_away: Option<i64>,
    pub winner: Option<String>,
    pub duration: Option<String>,
}

/// Checks the payload is a match list without flattening it.
pub fn match_list<'a>(data: &'a Value, context: &str) -> Result<&'a [Value]> {
    data.get("matches")
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .ok_or_else(|| EtlError::unexpected_shape(context, data).into())
}

pub fn flatten_matches(data: &Value) -> Result<Vec<MatchRow>> {
    let matches = match_list(data, "match list")?;

    let comp = object_or_empty(data.get("competition"));
    let competition_id = comp.get("id").and_then(as_u64_any);
    let competition_code = comp.get("code").and_then(as_string);
    let competition_name = comp.get("name").and_then(as_string);

    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        let score = object_or_empty(m.get("score"));
        let full_time = object_or_empty(score.get("fullTime"));
        let half_time = object_or_empty(score.get("halfTime"));
        let home_team = object_or_empty(m.get("homeTeam"));
        let away_team = object_or_empty(m.get("awayTeam"));
        let season = object_or_empty(m.get("season"));

        out.push(MatchRow {
            match_id: m.get("id").and_then(as_u64_any),
            utc_date: m.get("utcDate").and_then(as_string).and_then(|s| parse_utc(&s)),
            status: m.get("status").and_then(as_string),
            matchday: m.get("matchday").and_then(as_i64_any),
            stage: m.get("stage").and_then(as_string),
            group: m.get("group").and_then(as_string),
            last_updated: m.get("lastUpdated").and_then(as_string),

            competition_id,
            competition_code: competition_code.clone(),
            competition_name: competition_name.clone(),

            season_id: season.get("id").and_then(as_u64_any),
            season_start_date: season.get("startDate").and_then(as_string),
            season_end_date: season.get("endDate").and_then(as_string),
            season_current_matchday: season.get("currentMatchday").and_then(as_i64_any),

            home_team_id: home_team.get("id").and_then(as_u64_any),
            home_team_name: home_team.get("name").and_then(as_string),
            away_team_id: away_team.get("id").and_then(as_u64_any),
            away_team_name: away_team.get("name").and_then(as_string),

            full_time_home: full_time.get("home").and_then(as_i64_any),
            full_time_away: full_time.get("away").and_then(as_i64_any),
            half_time_home: half_time.get("home").and_then(as_i64_any),
            half_time_away: half_time.get("away").and_then(as_i64_any),
            winner: score.get("winner").and_then(as_string),
            duration: score.get("duration").and_then(as_string),
        });
    }
    Ok(out)
}

pub fn write_matches_csv(path: &Path, rows: &[MatchRow]) -> Result<()> {
    storage::write_atomic(path, |file| {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(MATCH_COLUMNS)
            .context("write csv header")?;
        for row in rows {
            writer.serialize(row).context("write csv row")?;
        }
        writer.flush().context("flush csv")?;
        Ok(())
    })
}

pub fn read_matches_csv(path: &Path) -> Result<Vec<MatchRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for row in reader.deserialize::<MatchRow>() {
        out.push(row.with_context(|| format!("decode row in {}", path.display()))?);
    }
    Ok(out)
}

static NULL: Value = Value::Null;

/// Absent or null sub-objects read as empty: every `get` on `Null` yields `None`.
fn object_or_empty(v: Option<&Value>) -> &Value {
    match v {
        Some(obj @ Value::Object(_)) => obj,
        _ => &NULL,
    }
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn as_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_utc_tolerates_garbage() {
        assert!(parse_utc("2024-08-16T19:00:00Z").is_some());
        assert!(parse_utc("2024-08-16T19:00:00+01:00").is_some());
        assert!(parse_utc("").is_none());
        assert!(parse_utc("next tuesday").is_none());
    }

    #[test]
    fn numeric_strings_are_coerced() {
        assert_eq!(as_u64_any(&json!("42")), Some(42));
        assert_eq!(as_i64_any(&json!(-3)), Some(-3));
        assert_eq!(as_i64_any(&json!("x")), None);
        assert_eq!(as_string(&json!(null)), None);
        assert_eq!(as_string(&json!(7)), Some("7".to_string()));
    }

    #[test]
    fn null_sub_objects_are_empty() {
        let data = json!({
            "competition": null,
            "matches": [{ "id": 9, "score": null, "homeTeam": null }]
        });
        let rows = flatten_matches(&data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].match_id, Some(9));
        assert_eq!(rows[0].competition_code, None);
        assert_eq!(rows[0].full_time_home, None);
        assert_eq!(rows[0].home_team_name, None);
    }
}
