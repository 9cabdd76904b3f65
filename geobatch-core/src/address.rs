use serde::{Deserialize, Serialize};
use std::fmt;

/// Value written into every address field when no provider answer exists
pub const NOT_AVAILABLE: &str = "Not Available";

/// Structured address returned by a provider client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub street1: String,
    pub street2: String,
    pub city: String,
    pub state: String,
    pub postal: String,
    pub country: String,
    /// Provider's formatted one-line address
    pub full_address: String,
}

impl AddressRecord {
    /// Placeholder used for rows that never received a provider answer
    pub fn not_available() -> Self {
        Self {
            street1: NOT_AVAILABLE.to_string(),
            street2: NOT_AVAILABLE.to_string(),
            city: NOT_AVAILABLE.to_string(),
            state: NOT_AVAILABLE.to_string(),
            postal: NOT_AVAILABLE.to_string(),
            country: NOT_AVAILABLE.to_string(),
            full_address: NOT_AVAILABLE.to_string(),
        }
    }

    /// Trim surrounding whitespace from every field
    pub(crate) fn trimmed(self) -> Self {
        Self {
            street1: clean_field(&self.street1),
            street2: clean_field(&self.street2),
            city: clean_field(&self.city),
            state: clean_field(&self.state),
            postal: clean_field(&self.postal),
            country: clean_field(&self.country),
            full_address: clean_field(&self.full_address),
        }
    }
}

/// Joins two optional address parts with a space, e.g. house number and road
pub(crate) fn join_parts(first: Option<&str>, second: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), second.unwrap_or(""))
        .trim()
        .to_string()
}

fn clean_field(value: &str) -> String {
    value.trim().to_string()
}

/// Outcome recorded for a single input row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    Success,
    Error,
    NoCoordinates,
    IncompleteCoordinates,
    InvalidRange,
    RateLimitDeferred,
}

impl RowStatus {
    /// Label written to the report's status column
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Success => "Success",
            RowStatus::Error => "Error",
            RowStatus::NoCoordinates => "No Coordinates",
            RowStatus::IncompleteCoordinates => "Incomplete Coordinates",
            RowStatus::InvalidRange => "Invalid Range",
            RowStatus::RateLimitDeferred => "Rate Limit Deferred",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One orchestrated input row
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRow {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: AddressRecord,
    pub status: RowStatus,
}

impl ProcessedRow {
    /// Row that carries the placeholder address and a non-success status
    pub fn placeholder(latitude: Option<f64>, longitude: Option<f64>, status: RowStatus) -> Self {
        Self {
            latitude,
            longitude,
            address: AddressRecord::not_available(),
            status,
        }
    }
}
