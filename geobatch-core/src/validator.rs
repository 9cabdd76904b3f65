use crate::address::RowStatus;

/// Result of checking a single coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    NoCoordinates,
    IncompleteCoordinates,
    InvalidRange,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// Status recorded for a row that failed validation (None when valid)
    pub fn failure_status(&self) -> Option<RowStatus> {
        match self {
            Validation::Valid => None,
            Validation::NoCoordinates => Some(RowStatus::NoCoordinates),
            Validation::IncompleteCoordinates => Some(RowStatus::IncompleteCoordinates),
            Validation::InvalidRange => Some(RowStatus::InvalidRange),
        }
    }
}

/// Classifies a coordinate pair. NaN is treated the same as a missing value.
pub fn validate(lat: Option<f64>, lon: Option<f64>) -> Validation {
    let lat = lat.filter(|v| !v.is_nan());
    let lon = lon.filter(|v| !v.is_nan());

    match (lat, lon) {
        (None, None) => Validation::NoCoordinates,
        (None, Some(_)) | (Some(_), None) => Validation::IncompleteCoordinates,
        (Some(lat), Some(lon)) => {
            if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
                Validation::Valid
            } else {
                Validation::InvalidRange
            }
        }
    }
}

/// Parses a raw table cell into a coordinate value
/// Examples: "6.5244", " -122.4194 ", "" (None), "N/A" (None)
pub fn parse_coordinate(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.to_lowercase().as_str() {
        "nan" | "null" | "none" | "n/a" | "na" => return None,
        _ => {}
    }

    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}
