use chrono::{Datelike, NaiveDate, Utc};
use tracing::warn;

/// European seasons start around July/August, so January 2025 still belongs to 2024-25.
pub fn current_season_start_year(today: NaiveDate) -> i32 {
    if today.month() >= 7 {
        today.year()
    } else {
        today.year() - 1
    }
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// How the look-back seasons are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeasonSpan {
    /// `last_n_back` repeats of the previous season. This is what existing extract runs have
    /// always produced; it refetches one season and never reaches older ones.
    #[default]
    Legacy,
    /// `current-1, current-2, ..., current-last_n_back`.
    Descending,
}

impl SeasonSpan {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "legacy" => Some(Self::Legacy),
            "descending" | "range" => Some(Self::Descending),
            _ => None,
        }
    }
}

pub fn season_years(
    last_n_back: u32,
    include_current: bool,
    today: NaiveDate,
    span: SeasonSpan,
) -> Vec<i32> {
    let cur = current_season_start_year(today);
    let mut years = Vec::with_capacity(last_n_back as usize + 1);
    if include_current {
        years.push(cur);
    }
    for back in 1..=last_n_back as i32 {
        match span {
            SeasonSpan::Legacy => years.push(cur - 1),
            SeasonSpan::Descending => years.push(cur - back),
        }
    }
    if span == SeasonSpan::Legacy && last_n_back > 1 {
        warn!(
            season = cur - 1,
            copies = last_n_back,
            "legacy season span repeats the previous season; pass --season-span descending for a range"
        );
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn season_boundary_is_july() {
        assert_eq!(current_season_start_year(date(2025, 6, 30)), 2024);
        assert_eq!(current_season_start_year(date(2025, 7, 1)), 2025);
        assert_eq!(current_season_start_year(date(2025, 1, 1)), 2024);
        assert_eq!(current_season_start_year(date(2024, 12, 31)), 2024);
    }

    #[test]
    fn span_parse() {
        assert_eq!(SeasonSpan::parse("Legacy"), Some(SeasonSpan::Legacy));
        assert_eq!(SeasonSpan::parse("descending"), Some(SeasonSpan::Descending));
        assert_eq!(SeasonSpan::parse("sideways"), None);
    }
}
