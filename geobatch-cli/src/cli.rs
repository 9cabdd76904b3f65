use anyhow::Result;
use clap::{Parser, ValueEnum};
use geobatch_core::{find_coordinate_columns, ColumnSelection, ConfigError, ExportFormat, Provider};
use std::path::PathBuf;

/// Reverse-geocode a table of coordinates into postal addresses
#[derive(Parser, Debug)]
#[command(name = "geobatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Converts latitude/longitude tables into addresses", long_about = None)]
pub struct Args {
    /// CSV file with a header row
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Geocoding provider: locationiq, google or nominatim
    #[arg(short = 'p', long = "provider", default_value = "nominatim")]
    pub provider: Provider,

    /// API key for LocationIQ or Google Maps (falls back to MAP_API_KEY)
    #[arg(short = 'k', long = "api-key")]
    pub api_key: Option<String>,

    /// Latitude column (detected from the header when omitted)
    #[arg(long = "lat-column")]
    pub lat_column: Option<String>,

    /// Longitude column (detected from the header when omitted)
    #[arg(long = "lon-column")]
    pub lon_column: Option<String>,

    /// Column copied to the report as the row identifier
    #[arg(long = "id-column")]
    pub id_column: Option<String>,

    /// Maximum provider calls for this run (overrides the provider default)
    #[arg(short = 'q', long = "quota")]
    pub quota: Option<usize>,

    /// Directory the report is written to
    #[arg(short = 'o', long = "output", default_value = ".")]
    pub output: PathBuf,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Check the input and print the estimate without calling any provider
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn exports(&self) -> Vec<ExportFormat> {
        match self {
            OutputFormat::Csv => vec![ExportFormat::Csv],
            OutputFormat::Json => vec![ExportFormat::Json],
            OutputFormat::Both => vec![ExportFormat::Csv, ExportFormat::Json],
        }
    }
}

impl Args {
    /// Explicit column names win; missing ones are detected from the header
    pub fn column_selection(&self, headers: &[String]) -> Result<ColumnSelection> {
        let (detected_lat, detected_lon) = find_coordinate_columns(headers);

        let latitude = self
            .lat_column
            .clone()
            .or(detected_lat)
            .ok_or_else(|| ConfigError::MissingColumn {
                column: "latitude".to_string(),
            })?;
        let longitude = self
            .lon_column
            .clone()
            .or(detected_lon)
            .ok_or_else(|| ConfigError::MissingColumn {
                column: "longitude".to_string(),
            })?;

        Ok(ColumnSelection {
            id: self.id_column.clone(),
            latitude,
            longitude,
        })
    }
}

/// Parses command-line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
