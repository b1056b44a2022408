use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

pub const FOOTBALL_DATA_DIR: &str = "football-data";
pub const API_FOOTBALL_DIR: &str = "api-football";
pub const RAW_MATCHES_FILE: &str = "matches.json";

/// `{raw}/football-data/{competition}/{year}/matches.json`
pub fn raw_matches_path(raw_dir: &Path, competition: &str, year: i32) -> PathBuf {
    raw_dir
        .join(FOOTBALL_DATA_DIR)
        .join(competition)
        .join(year.to_string())
        .join(RAW_MATCHES_FILE)
}

/// `{processed}/football-data/{competition}/matches_{year}.csv`
pub fn processed_matches_path(processed_dir: &Path, competition: &str, year: i32) -> PathBuf {
    competition_dir(processed_dir, competition).join(format!("matches_{year}.csv"))
}

/// `{raw}/api-football/{code}/{season}.csv`
pub fn api_football_csv_path(raw_dir: &Path, code: &str, season: i32) -> PathBuf {
    raw_dir
        .join(API_FOOTBALL_DIR)
        .join(code)
        .join(format!("{season}.csv"))
}

/// Per-competition directory under either the raw or processed root.
pub fn competition_dir(root: &Path, competition: &str) -> PathBuf {
    root.join(FOOTBALL_DATA_DIR).join(competition)
}

pub fn ensure_dirs(paths: &[&Path]) -> Result<()> {
    for p in paths {
        fs::create_dir_all(p).with_context(|| format!("create dir {}", p.display()))?;
    }
    Ok(())
}

/// Writes through a `.tmp` sibling and renames into place, creating parent directories.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let tmp = tmp_path(path);
    let file = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    let mut out = BufWriter::new(file);
    let written = write(&mut out).and_then(|()| {
        out.flush()
            .with_context(|| format!("flush {}", tmp.display()))
    });
    drop(out);
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

/// Pretty JSON, two-space indent, non-ASCII kept as-is.
pub fn save_json(value: &Value, path: &Path) -> Result<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, value).context("serialize json")?;
        Ok(())
    })
}

pub fn load_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str::<Value>(raw.trim())
        .with_context(|| format!("invalid json in {}", path.display()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_convention() {
        let raw = Path::new("data/raw");
        let processed = Path::new("data/processed");
        assert_eq!(
            raw_matches_path(raw, "PL", 2024),
            PathBuf::from("data/raw/football-data/PL/2024/matches.json")
        );
        assert_eq!(
            processed_matches_path(processed, "PL", 2024),
            PathBuf::from("data/processed/football-data/PL/matches_2024.csv")
        );
        assert_eq!(
            api_football_csv_path(raw, "PL", 2019),
            PathBuf::from("data/raw/api-football/PL/2019.csv")
        );
    }

    #[test]
    fn failed_write_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches_2024.csv");

        let err = write_atomic(&path, |out| {
            out.write_all(b"match_id\n")?;
            Err(anyhow::anyhow!("boom"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(!path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn tmp_sits_next_to_target() {
        assert_eq!(
            tmp_path(Path::new("a/b/matches.json")),
            PathBuf::from("a/b/matches.json.tmp")
        );
    }
}
