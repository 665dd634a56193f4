// Target list loading: `.csv` with a `url` column, otherwise one URL per line.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, instrument};

use crate::error::TargetListError;

/// Loads the ordered, de-duplicated target list from `path`.
#[instrument(fields(path = %path.display()))]
pub fn load_targets(path: &Path) -> Result<Vec<String>, TargetListError> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let raw = if is_csv {
        read_csv(path)?
    } else {
        let text = std::fs::read_to_string(path).map_err(|source| TargetListError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_lines(&text)
    };

    let targets = dedup(raw);
    if targets.is_empty() {
        return Err(TargetListError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(targets = targets.len(), "target list loaded");
    Ok(targets)
}

/// One target per non-blank line; `#` starts a comment line.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

fn read_csv(path: &Path) -> Result<Vec<String>, TargetListError> {
    let csv_err = |source| TargetListError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?;
    let Some(col) = headers.iter().position(|h| h == "url") else {
        return Err(TargetListError::MissingUrlColumn {
            path: path.to_path_buf(),
        });
    };

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if let Some(url) = record.get(col).filter(|u| !u.is_empty()) {
            out.push(url.to_string());
        }
    }
    Ok(out)
}

fn dedup(targets: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
