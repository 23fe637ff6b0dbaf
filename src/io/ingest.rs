//! CSV ingest.
//!
//! Lab exports come from different spreadsheet locales, so the delimiter is
//! sniffed from the header line (`,`, `;` or tab). Header names are trimmed and
//! a UTF-8 BOM is stripped; columns are then looked up by their exact names.
//!
//! There is no row-level recovery: a row with the wrong field count, an empty
//! cell or a non-numeric value in a requested column fails the whole run with
//! its line number.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, info};

use crate::error::AppError;

const DELIMITER_CANDIDATES: [u8; 3] = [b',', b';', b'\t'];

/// A loaded CSV table. Cells stay textual until a column is requested.
#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub delimiter: u8,
    headers: Vec<String>,
    index: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse a column as finite `f64` values.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, AppError> {
        let idx = *self.index.get(name).ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Missing required column `{name}` in '{}'. Available columns: {}",
                    self.path.display(),
                    self.headers
                        .iter()
                        .map(|h| format!("`{h}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
        })?;

        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let line = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(row + 2);
                let cell = record.get(idx).unwrap_or("");
                parse_cell(cell).map_err(|msg| {
                    AppError::new(
                        2,
                        format!("{}:{line}: column `{name}`: {msg}", self.path.display()),
                    )
                })
            })
            .collect()
    }
}

/// Load a CSV file into a [`Table`].
pub fn load_table(path: &Path) -> Result<Table, AppError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let table = parse_table(path, &content)?;
    info!(
        "Loaded {} rows from {} (delimiter {:?})",
        table.len(),
        path.display(),
        table.delimiter as char
    );
    Ok(table)
}

/// Parse CSV text; `path` is only used for messages.
pub fn parse_table(path: &Path, content: &str) -> Result<Table, AppError> {
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .iter()
        .map(normalize_header_name)
        .collect();
    debug!("{}: columns {:?}", path.display(), headers);

    let index = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), idx))
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            AppError::new(2, format!("{}:{line}: malformed row: {e}", path.display()))
        })?;
        // Trailing blank lines are not rows.
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(AppError::new(
            3,
            format!("'{}' contains no data rows.", path.display()),
        ));
    }

    Ok(Table {
        path: path.to_path_buf(),
        delimiter,
        headers,
        index,
        records,
    })
}

/// Pick the candidate delimiter that occurs most often in the header line.
fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");
    DELIMITER_CANDIDATES
        .iter()
        .map(|&d| (d, header.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_cell(cell: &str) -> Result<f64, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Err("empty value".to_string());
    }
    let v = cell
        .parse::<f64>()
        .map_err(|_| format!("'{cell}' is not a number"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("'{cell}' is not finite"))
    }
}
