use crate::address::{RowStatus, NOT_AVAILABLE};
use crate::report::Report;
use std::collections::{HashMap, HashSet};

/// Summary figures over a finished report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStats {
    pub total_records: usize,
    pub successful: usize,
    /// Every row that did not end in `Success`
    pub unsuccessful: usize,
    /// Percentage of successful rows (0 for an empty report)
    pub success_rate: f64,
    pub unique_states: usize,
    pub unique_cities: usize,
    pub unique_countries: usize,
}

impl ReportStats {
    pub fn from_report(report: &Report) -> Self {
        let total_records = report.len();
        let successful = report
            .column_values("Geocoding Status")
            .iter()
            .filter(|s| s.as_str() == RowStatus::Success.label())
            .count();

        let success_rate = if total_records > 0 {
            successful as f64 / total_records as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_records,
            successful,
            unsuccessful: total_records - successful,
            success_rate,
            unique_states: count_unique(report, "State"),
            unique_cities: count_unique(report, "City"),
            unique_countries: count_unique(report, "Country"),
        }
    }
}

fn is_real_value(value: &str) -> bool {
    !value.is_empty() && value != NOT_AVAILABLE
}

fn count_unique(report: &Report, column: &str) -> usize {
    report
        .column_values(column)
        .into_iter()
        .filter(|v| is_real_value(v))
        .collect::<HashSet<_>>()
        .len()
}

/// Most frequent values of a column, placeholders excluded
/// Ties are broken alphabetically so the output is stable.
pub fn top_locations(report: &Report, column: &str, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in report.column_values(column) {
        if is_real_value(&value) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
