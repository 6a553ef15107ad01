// Numeric table files
// Whitespace-delimited rows of numbers, the format of every input and output

use std::fs;
use std::path::Path;

use super::{StorageError, StorageResult};
use crate::notes::{Interval, Note};

/// Rows paired with their 1-based source line numbers
fn parse_numbered(text: &str, path: &Path) -> StorageResult<Vec<(usize, Vec<f64>)>> {
    let mut rows = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().map_err(|_| StorageError::Malformed {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message: format!("'{}' is not a number", field),
                })
            })
            .collect::<StorageResult<Vec<f64>>>()?;
        rows.push((index + 1, row));
    }

    Ok(rows)
}

fn read_numbered(path: &Path) -> StorageResult<Vec<(usize, Vec<f64>)>> {
    let text = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_numbered(&text, path)
}

/// Parse a whitespace-delimited numeric table; blank lines and `#` comments are skipped
pub fn parse_table(text: &str, path: &Path) -> StorageResult<Vec<Vec<f64>>> {
    Ok(parse_numbered(text, path)?
        .into_iter()
        .map(|(_, row)| row)
        .collect())
}

pub fn read_table(path: &Path) -> StorageResult<Vec<Vec<f64>>> {
    Ok(read_numbered(path)?.into_iter().map(|(_, row)| row).collect())
}

/// Format rows with single spaces between values and one row per line
pub fn format_table<R: AsRef<[f64]>>(rows: &[R]) -> String {
    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row.as_ref().iter().map(|v| v.to_string()).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

fn expect_columns(rows: &[(usize, Vec<f64>)], min: usize, path: &Path) -> StorageResult<()> {
    match rows.iter().find(|(_, row)| row.len() < min) {
        Some((line, row)) => Err(StorageError::Malformed {
            path: path.to_path_buf(),
            line: *line,
            message: format!("expected at least {} columns, found {}", min, row.len()),
        }),
        None => Ok(()),
    }
}

/// Melody contour: one pitch value per frame
///
/// Values are read in row order, so a single row of values also works.
pub fn read_contour(path: &Path) -> StorageResult<Vec<f64>> {
    Ok(read_table(path)?.into_iter().flatten().collect())
}

/// Note table: `[pitch, onset, duration]` rows
pub fn read_notes(path: &Path) -> StorageResult<Vec<Note>> {
    let rows = read_numbered(path)?;
    expect_columns(&rows, 3, path)?;
    Ok(rows
        .iter()
        .map(|(_, row)| Note::new(row[0], row[1], row[2]))
        .collect())
}

/// Interval table: `[onset, offset]` rows; a single column reads as point intervals
pub fn read_intervals(path: &Path) -> StorageResult<Vec<Interval>> {
    let rows = read_numbered(path)?;
    expect_columns(&rows, 1, path)?;

    rows.iter()
        .map(|(line, row)| {
            let offset = row.get(1).copied().unwrap_or(row[0]);
            Interval::new(row[0], offset).map_err(|e| StorageError::Malformed {
                path: path.to_path_buf(),
                line: *line,
                message: e.to_string(),
            })
        })
        .collect()
}
