mod common;

use std::path::Path;

use common::{RecordingSleeper, ScriptedHttp, ok, read_fixture, status};
use football_etl::api_football::{fixtures_table, run_api_football};
use football_etl::config::{ApiFootballConfig, ErrorPolicy};
use football_etl::normalize::Table;
use football_etl::storage::api_football_csv_path;
use serde_json::json;

fn config(root: &Path, key: Option<&str>) -> ApiFootballConfig {
    let mut cfg = ApiFootballConfig::new(key.map(|k| k.to_string()));
    cfg.base_url = "https://af.example.test".to_string();
    cfg.raw_dir = root.join("raw");
    cfg.start_season = 2022;
    cfg.end_season = 2023;
    cfg
}

#[test]
fn fixtures_are_normalized() {
    let data: serde_json::Value = serde_json::from_str(&read_fixture("af_fixtures.json")).unwrap();
    let table = fixtures_table(&data, "league 39 season 2023").expect("table");
    assert_eq!(table.len(), 2);
    assert_eq!(table.columns[0], "fixture.id");
    assert_eq!(table.cell(0, "fixture.venue.name"), Some("Turf Moor"));
    assert_eq!(table.cell(1, "fixture.referee"), Some(""));
    assert_eq!(table.cell(1, "teams.home.name"), Some("Arsenal"));
    assert_eq!(table.cell(0, "score.extratime.home"), Some(""));
    assert_eq!(table.cell(0, "goals.away"), Some("3"));
}

#[test]
fn reported_errors_fail_the_season() {
    let data = json!({ "errors": { "token": "Error/Missing application key." }, "response": [] });
    assert!(fixtures_table(&data, "league 39 season 2023").is_err());
}

#[test]
fn empty_seasons_are_skipped_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), Some("af-key"));
    let http = ScriptedHttp::new(vec![
        ok("{\"errors\": [], \"response\": []}"),
        ok(&read_fixture("af_fixtures.json")),
    ]);
    let sleeper = RecordingSleeper::default();

    let summary = run_api_football(&cfg, &http, &sleeper).expect("run ok");

    assert_eq!(summary.seasons_total, 2);
    assert_eq!(summary.rows_total, 2);
    assert_eq!(summary.files_written.len(), 1);
    assert!(!api_football_csv_path(&cfg.raw_dir, "PL", 2022).exists());
    let table = Table::read_csv(&api_football_csv_path(&cfg.raw_dir, "PL", 2023)).unwrap();
    assert_eq!(table.len(), 2);

    let seen = http.seen.borrow();
    assert_eq!(seen[1].url, "https://af.example.test/fixtures");
    assert_eq!(
        seen[1].query,
        vec![
            ("league".to_string(), "39".to_string()),
            ("season".to_string(), "2023".to_string())
        ]
    );
    assert!(
        seen[1]
            .headers
            .contains(&("X-RapidAPI-Key".to_string(), "af-key".to_string()))
    );
}

#[test]
fn missing_key_sends_empty_header() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), None);
    cfg.end_season = 2022;
    let http = ScriptedHttp::new(vec![ok("{\"response\": []}")]);
    let sleeper = RecordingSleeper::default();

    run_api_football(&cfg, &http, &sleeper).expect("run ok");

    let seen = http.seen.borrow();
    assert!(
        seen[0]
            .headers
            .contains(&("X-RapidAPI-Key".to_string(), String::new()))
    );
}

#[test]
fn shares_the_unified_error_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), Some("af-key"));
    let http = ScriptedHttp::new(vec![
        status(500, None, "oops"),
        ok(&read_fixture("af_fixtures.json")),
    ]);
    assert!(run_api_football(&cfg, &http, &RecordingSleeper::default()).is_err());

    cfg.on_error = ErrorPolicy::Skip;
    let http = ScriptedHttp::new(vec![
        status(500, None, "oops"),
        ok(&read_fixture("af_fixtures.json")),
    ]);
    let summary = run_api_football(&cfg, &http, &RecordingSleeper::default()).expect("skip");
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.seasons_succeeded, 1);
}
