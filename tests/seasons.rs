use chrono::NaiveDate;

use football_etl::seasons::{SeasonSpan, current_season_start_year, season_years};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn current_season_follows_month() {
    for month in 1..=12 {
        let today = date(2025, month, 15);
        let expected = if month >= 7 { 2025 } else { 2024 };
        assert_eq!(current_season_start_year(today), expected, "month {month}");
    }
}

#[test]
fn legacy_span_repeats_previous_season() {
    let years = season_years(3, true, date(2025, 9, 1), SeasonSpan::Legacy);
    assert_eq!(years, vec![2025, 2024, 2024, 2024]);
}

#[test]
fn descending_span_walks_back() {
    let years = season_years(3, true, date(2025, 9, 1), SeasonSpan::Descending);
    assert_eq!(years, vec![2025, 2024, 2023, 2022]);
}

#[test]
fn current_can_be_left_out() {
    let years = season_years(2, false, date(2025, 3, 1), SeasonSpan::Descending);
    assert_eq!(years, vec![2023, 2022]);
    assert!(season_years(0, false, date(2025, 3, 1), SeasonSpan::Legacy).is_empty());
}
