use crate::config::ConfigError;
use crate::validator::{parse_coordinate, validate};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Sheet name given to single-sheet inputs such as CSV files
pub const DEFAULT_SHEET: &str = "Sheet1";

/// Input rows as loaded from disk, every cell kept as text
#[derive(Debug, Clone)]
pub struct InputTable {
    sheet_name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Columns chosen for a run, by header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    /// Identifier column copied to the report (coordinates act as the id when unset)
    pub id: Option<String>,
    pub latitude: String,
    pub longitude: String,
}

/// Column positions after checking a selection against a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub id: Option<usize>,
    pub latitude: usize,
    pub longitude: usize,
}

impl InputTable {
    /// Build a table from headers and rows. Short rows are padded with empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        Self {
            sheet_name: DEFAULT_SHEET.to_string(),
            headers,
            rows,
        }
    }

    /// Load a CSV file with a header row
    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        let table = Self::from_csv_reader(file)
            .with_context(|| format!("Error loading file {}", path.display()))?;

        if table.is_empty() {
            anyhow::bail!("Input file {} is empty", path.display());
        }

        log::info!(
            "Loaded {} rows and {} columns from '{}'",
            table.len(),
            table.headers.len(),
            table.sheet_name
        );
        Ok(table)
    }

    /// Parse CSV data from any reader
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header row")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            anyhow::bail!("CSV data contains no header row");
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("Failed to read CSV record")?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text, empty when the row is shorter than the header
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Check a column selection and return the column positions
    pub fn resolve(&self, selection: &ColumnSelection) -> Result<ResolvedColumns, ConfigError> {
        let find = |name: &str| {
            self.column_index(name)
                .ok_or_else(|| ConfigError::MissingColumn {
                    column: name.to_string(),
                })
        };

        Ok(ResolvedColumns {
            id: selection.id.as_deref().map(&find).transpose()?,
            latitude: find(&selection.latitude)?,
            longitude: find(&selection.longitude)?,
        })
    }

    /// Parsed coordinate pair of every row, in input order
    pub fn coordinates(&self, columns: &ResolvedColumns) -> Vec<(Option<f64>, Option<f64>)> {
        (0..self.len())
            .map(|row| {
                (
                    parse_coordinate(self.cell(row, columns.latitude)),
                    parse_coordinate(self.cell(row, columns.longitude)),
                )
            })
            .collect()
    }

    /// Number of rows whose coordinates pass validation
    pub fn count_valid_coordinates(&self, columns: &ResolvedColumns) -> usize {
        self.coordinates(columns)
            .into_iter()
            .filter(|&(lat, lon)| validate(lat, lon).is_valid())
            .count()
    }
}

/// Detect latitude and longitude columns by name
///
/// A column also containing "current" wins (the last such column, when several
/// match); otherwise the first column containing "latitude"/"longitude".
pub fn find_coordinate_columns(headers: &[String]) -> (Option<String>, Option<String>) {
    let mut lat_col = None;
    let mut lon_col = None;

    for header in headers {
        let lower = header.to_lowercase();
        if lower.contains("latitude") && lower.contains("current") {
            lat_col = Some(header.clone());
        }
        if lower.contains("longitude") && lower.contains("current") {
            lon_col = Some(header.clone());
        }
    }

    if lat_col.is_none() {
        lat_col = headers
            .iter()
            .find(|h| h.to_lowercase().contains("latitude"))
            .cloned();
    }
    if lon_col.is_none() {
        lon_col = headers
            .iter()
            .find(|h| h.to_lowercase().contains("longitude"))
            .cloned();
    }

    (lat_col, lon_col)
}

/// Headers that are not in `exclude`, in table order
pub fn remaining_columns(headers: &[String], exclude: &[&str]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !exclude.contains(&h.as_str()))
        .cloned()
        .collect()
}
