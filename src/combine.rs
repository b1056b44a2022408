use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{Pattern, glob};
use tracing::{info, warn};

use crate::normalize::Table;

pub const API_FOOTBALL_COMBINED: &str = "api_football_matches.csv";
pub const FOOTBALL_DATA_COMBINED: &str = "football_data_org_matches.csv";

#[derive(Debug, Clone)]
pub struct CombineGroup {
    pub name: String,
    pub source_dir: PathBuf,
    /// Glob matched against file names directly inside `source_dir`.
    pub pattern: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CombineSummary {
    pub name: String,
    pub files: usize,
    pub rows: usize,
    pub output: PathBuf,
}

/// The api-football and football-data.org groups, both written under `out_dir`.
pub fn default_groups(api_dir: &Path, fd_dir: &Path, out_dir: &Path) -> Vec<CombineGroup> {
    vec![
        CombineGroup {
            name: "api-football".to_string(),
            source_dir: api_dir.to_path_buf(),
            pattern: "*.csv".to_string(),
            output: out_dir.join(API_FOOTBALL_COMBINED),
        },
        CombineGroup {
            name: "football-data.org".to_string(),
            source_dir: fd_dir.to_path_buf(),
            pattern: "matches_*.csv".to_string(),
            output: out_dir.join(FOOTBALL_DATA_COMBINED),
        },
    ]
}

/// Only `pattern` is a glob; metacharacters in `source_dir` match literally.
pub fn matching_files(group: &CombineGroup) -> Result<Vec<PathBuf>> {
    let dir = group
        .source_dir
        .to_str()
        .with_context(|| format!("non-utf8 source dir {}", group.source_dir.display()))?;
    let pattern = Path::new(&Pattern::escape(dir)).join(&group.pattern);
    let pattern = pattern
        .to_str()
        .with_context(|| format!("non-utf8 glob pattern {}", pattern.display()))?;
    let mut files = Vec::new();
    for entry in glob(pattern).with_context(|| format!("bad glob pattern {pattern}"))? {
        let path = entry.context("read glob entry")?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Concatenates every matching file in path order. No files means no output.
pub fn combine_group(group: &CombineGroup) -> Result<Option<CombineSummary>> {
    let files = matching_files(group)?;
    if files.is_empty() {
        info!(group = %group.name, dir = %group.source_dir.display(), "no files to combine");
        return Ok(None);
    }

    let mut combined: Option<Table> = None;
    for path in &files {
        let table = Table::read_csv(path)?;
        match combined.as_mut() {
            None => combined = Some(table),
            Some(acc) => {
                if acc.columns != table.columns {
                    warn!(
                        file = %path.display(),
                        "header differs from first file, appending rows by position"
                    );
                }
                acc.rows.extend(table.rows);
            }
        }
    }

    let combined = combined.unwrap_or_default();
    combined.write_csv(&group.output)?;
    info!(
        group = %group.name,
        files = files.len(),
        rows = combined.len(),
        path = %group.output.display(),
        "combined csv saved"
    );

    Ok(Some(CombineSummary {
        name: group.name.clone(),
        files: files.len(),
        rows: combined.len(),
        output: group.output.clone(),
    }))
}

pub fn combine_all(groups: &[CombineGroup]) -> Result<Vec<CombineSummary>> {
    let mut out = Vec::new();
    for group in groups {
        if let Some(summary) = combine_group(group)? {
            out.push(summary);
        }
    }
    Ok(out)
}
