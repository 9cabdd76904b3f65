use crate::address::ProcessedRow;
use crate::table::{ColumnSelection, InputTable};
use crate::validator::parse_coordinate;
use anyhow::{Context, Result};
use serde::ser::{Serialize, Serializer};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Columns following the optional identifier column, in order
pub const REPORT_COLUMNS: [&str; 10] = [
    "Latitude",
    "Longitude",
    "Street1",
    "Street2",
    "City",
    "State",
    "Postal Code",
    "Country",
    "Full Address",
    "Geocoding Status",
];

/// A single report value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    /// Non-finite values have no JSON form, so they stay empty in every export
    fn number(value: Option<f64>) -> Self {
        value
            .filter(|v| v.is_finite())
            .map(Cell::Number)
            .unwrap_or(Cell::Empty)
    }

    /// Text form used in the delimited export
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Empty => serializer.serialize_none(),
        }
    }
}

/// Final output table: one row per input row
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Report {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Export representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Join processed rows with the identifier and coordinate columns of the input
pub fn assemble(
    table: &InputTable,
    processed: &[ProcessedRow],
    columns: &ColumnSelection,
) -> Result<Report> {
    anyhow::ensure!(
        processed.len() == table.len(),
        "Processed {} rows but the input has {}",
        processed.len(),
        table.len()
    );

    let resolved = table.resolve(columns)?;

    // An identifier named like a report column would shadow it, so the coordinates act as the id
    let id_column = match columns.id.as_deref() {
        Some(id) if REPORT_COLUMNS.contains(&id) => {
            log::warn!("Identifier column '{}' clashes with a report column, skipping it", id);
            None
        }
        Some(id) => resolved.id.map(|index| (id, index)),
        None => None,
    };

    let mut header = Vec::with_capacity(REPORT_COLUMNS.len() + 1);
    if let Some((id, _)) = id_column {
        header.push(id.to_string());
    }
    header.extend(REPORT_COLUMNS.iter().map(|c| c.to_string()));

    let rows = processed
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = Vec::with_capacity(header.len());
            if let Some((_, index)) = id_column {
                cells.push(Cell::text(table.cell(i, index)));
            }

            let address = &row.address;
            cells.extend([
                Cell::number(parse_coordinate(table.cell(i, resolved.latitude))),
                Cell::number(parse_coordinate(table.cell(i, resolved.longitude))),
                Cell::text(&address.street1),
                Cell::text(&address.street2),
                Cell::text(&address.city),
                Cell::text(&address.state),
                Cell::text(&address.postal),
                Cell::text(&address.country),
                Cell::text(&address.full_address),
                Cell::text(row.status.label()),
            ]);
            cells
        })
        .collect();

    Ok(Report {
        columns: header,
        rows,
    })
}

impl Report {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Text of every cell in a column, in row order
    pub fn column_values(&self, name: &str) -> Vec<String> {
        match self.column_index(name) {
            Some(index) => self.rows.iter().map(|row| row[index].as_text()).collect(),
            None => Vec::new(),
        }
    }

    /// Write the report as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer
            .write_record(&self.columns)
            .context("Failed to write CSV header")?;

        for row in &self.rows {
            csv_writer
                .write_record(row.iter().map(Cell::as_text))
                .context("Failed to write CSV row")?;
        }

        csv_writer.flush().context("Failed to flush CSV output")?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).context("CSV output is not valid UTF-8")
    }

    /// Row/column JSON table: `{"columns": [...], "rows": [[...], ...]}`
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    /// Write the report to `<dir>/<stem>.<ext>` and return the path
    pub fn save(&self, dir: &Path, stem: &str, format: ExportFormat) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let path = dir.join(format!("{}.{}", stem, format.extension()));
        let contents = match format {
            ExportFormat::Csv => self.to_csv_string()?,
            ExportFormat::Json => self.to_json()?,
        };

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::info!("Saved {} rows to {}", self.len(), path.display());
        Ok(path)
    }
}

/// Unique export file stem, e.g. `geocoded_address_20250101_143022_a7f3b9c2`
pub fn unique_filename() -> String {
    let now = chrono::Local::now();

    let mut hasher = DefaultHasher::new();
    now.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    let suffix = format!("{:016x}", hasher.finish());

    format!(
        "geocoded_address_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{AddressRecord, RowStatus};
    use tempfile::TempDir;

    fn sample_table() -> InputTable {
        InputTable::new(
            vec!["Site".to_string(), "Lat".to_string(), "Lon".to_string()],
            vec![
                vec!["S-1".to_string(), "6.5244".to_string(), "3.3792".to_string()],
                vec!["S-2".to_string(), "abc".to_string(), "3.3792".to_string()],
            ],
        )
    }

    fn sample_rows() -> Vec<ProcessedRow> {
        vec![
            ProcessedRow {
                latitude: Some(6.5244),
                longitude: Some(3.3792),
                address: AddressRecord {
                    street1: "1 Broad Street".to_string(),
                    city: "Lagos".to_string(),
                    state: "Lagos State".to_string(),
                    postal: "100001".to_string(),
                    country: "Nigeria".to_string(),
                    full_address: "1 Broad Street, Lagos, Nigeria".to_string(),
                    ..AddressRecord::default()
                },
                status: RowStatus::Success,
            },
            ProcessedRow::placeholder(None, Some(3.3792), RowStatus::IncompleteCoordinates),
        ]
    }

    fn selection(id: Option<&str>) -> ColumnSelection {
        ColumnSelection {
            id: id.map(str::to_string),
            latitude: "Lat".to_string(),
            longitude: "Lon".to_string(),
        }
    }

    #[test]
    fn test_assemble_with_id_column() -> Result<()> {
        let report = assemble(&sample_table(), &sample_rows(), &selection(Some("Site")))?;

        assert_eq!(report.len(), 2);
        assert_eq!(report.columns()[0], "Site");
        assert_eq!(report.columns()[1], "Latitude");
        assert_eq!(report.columns().last().unwrap(), "Geocoding Status");

        let first = &report.rows()[0];
        assert_eq!(first[0], Cell::Text("S-1".to_string()));
        assert_eq!(first[1], Cell::Number(6.5244));
        assert_eq!(first[4], Cell::Empty);
        assert_eq!(first[10], Cell::Text("Success".to_string()));

        let second = &report.rows()[1];
        assert_eq!(second[1], Cell::Empty);
        assert_eq!(second[2], Cell::Number(3.3792));
        assert_eq!(second[5], Cell::Text("Not Available".to_string()));
        assert_eq!(second[10], Cell::Text("Incomplete Coordinates".to_string()));
        Ok(())
    }

    #[test]
    fn test_assemble_without_id_column() -> Result<()> {
        let report = assemble(&sample_table(), &sample_rows(), &selection(None))?;
        assert_eq!(report.columns().len(), REPORT_COLUMNS.len());
        assert_eq!(report.columns()[0], "Latitude");
        Ok(())
    }

    #[test]
    fn test_id_named_like_report_column_is_skipped() -> Result<()> {
        let table = InputTable::new(
            vec!["Latitude".to_string(), "Longitude".to_string()],
            vec![vec!["6.5244".to_string(), "3.3792".to_string()]],
        );
        let columns = ColumnSelection {
            id: Some("Latitude".to_string()),
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
        };
        let report = assemble(&table, &sample_rows()[..1], &columns)?;

        assert_eq!(report.columns().len(), REPORT_COLUMNS.len());
        assert_eq!(report.columns()[0], "Latitude");
        assert_eq!(report.columns()[1], "Longitude");
        assert_eq!(report.column_values("Latitude"), vec!["6.5244"]);
        Ok(())
    }

    #[test]
    fn test_assemble_rejects_length_mismatch() {
        let rows = sample_rows()[..1].to_vec();
        assert!(assemble(&sample_table(), &rows, &selection(None)).is_err());
    }

    #[test]
    fn test_csv_and_json_carry_same_table() -> Result<()> {
        let report = assemble(&sample_table(), &sample_rows(), &selection(Some("Site")))?;

        let csv = report.to_csv_string()?;
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Site,Latitude,Longitude,Street1,Street2,City,State,Postal Code,Country,Full Address,Geocoding Status")
        );
        assert_eq!(
            lines.next(),
            Some("S-1,6.5244,3.3792,1 Broad Street,,Lagos,Lagos State,100001,Nigeria,\"1 Broad Street, Lagos, Nigeria\",Success")
        );

        let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        assert_eq!(json["columns"].as_array().unwrap().len(), 11);
        assert_eq!(json["rows"][0][1], serde_json::json!(6.5244));
        assert_eq!(json["rows"][1][1], serde_json::Value::Null);
        assert_eq!(json["rows"][1][10], "Incomplete Coordinates");
        Ok(())
    }

    #[test]
    fn test_non_finite_coordinate_is_empty_in_both_exports() -> Result<()> {
        let table = InputTable::new(
            vec!["Lat".to_string(), "Lon".to_string()],
            vec![vec!["inf".to_string(), "3.3".to_string()]],
        );
        let rows = vec![ProcessedRow::placeholder(
            Some(f64::INFINITY),
            Some(3.3),
            RowStatus::InvalidRange,
        )];
        let report = assemble(&table, &rows, &selection(None))?;

        assert_eq!(report.rows()[0][0], Cell::Empty);

        let csv = report.to_csv_string()?;
        let data_row = csv.lines().nth(1).unwrap();
        assert!(data_row.starts_with(",3.3,"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        assert_eq!(json["rows"][0][0], serde_json::Value::Null);
        assert_eq!(json["rows"][0][1], serde_json::json!(3.3));
        Ok(())
    }

    #[test]
    fn test_save_writes_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let report = assemble(&sample_table(), &sample_rows(), &selection(None))?;

        let path = report.save(temp_dir.path(), "out", ExportFormat::Csv)?;
        assert_eq!(path.file_name().unwrap(), "out.csv");
        assert_eq!(fs::read_to_string(&path)?.lines().count(), 3);
        Ok(())
    }

    #[test]
    fn test_unique_filename_shape() {
        let name = unique_filename();
        let parts: Vec<&str> = name.rsplitn(2, '_').collect();
        assert!(name.starts_with("geocoded_address_"));
        assert_eq!(parts[0].len(), 8);
        assert!(parts[0].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
