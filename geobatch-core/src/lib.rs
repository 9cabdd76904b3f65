use anyhow::Result;
use std::time::Duration;

// Internal modules (private)
mod activity_log;
mod address;
mod batch;
mod config;
mod corrections;
mod providers;
mod report;
mod stats;
mod table;
mod validator;

#[cfg(test)]
mod test_support;

// Re-export public types
pub use activity_log::{ActivityLog, DEFAULT_WINDOW};
pub use address::{AddressRecord, ProcessedRow, RowStatus, NOT_AVAILABLE};
pub use batch::{estimate_duration, BatchOutcome, BatchRunner, RunContext, RunCounters, RunProgress};
pub use config::{api_key_from_env, resolve_api_key, ConfigError, API_KEY_ENV};
pub use corrections::correct as correct_address;
pub use providers::{
    create_client, GoogleMapsClient, LocationIqClient, NominatimClient, Provider, ProviderConfig,
    ReverseGeocoder, NOMINATIM_QUOTA, REQUEST_TIMEOUT,
};
pub use report::{assemble, unique_filename, Cell, ExportFormat, Report, REPORT_COLUMNS};
pub use stats::{top_locations, ReportStats};
pub use table::{
    find_coordinate_columns, remaining_columns, ColumnSelection, InputTable, ResolvedColumns,
    DEFAULT_SHEET,
};
pub use validator::{parse_coordinate, validate, Validation};

/// Configuration options for the geocoding engine
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Provider, key, quota and endpoint
    pub provider: ProviderConfig,
    /// Number of recent activity lines kept for display
    pub log_window: usize,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::new(Provider::Nominatim), // Free provider, no key needed
            log_window: DEFAULT_WINDOW,
        }
    }
}

/// What a run would do, computed without calling any provider
#[derive(Debug, Clone, PartialEq)]
pub struct Preflight {
    pub provider: Provider,
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Valid rows the quota allows calling
    pub planned_calls: usize,
    /// Valid rows that will be deferred by the quota
    pub deferred_rows: usize,
    pub estimated: Duration,
}

/// Main engine that checks a table and geocodes it
pub struct GeocodeEngine {
    config: GeocodeConfig,
}

impl GeocodeEngine {
    /// Create a new engine with the given configuration
    pub fn new(config: GeocodeConfig) -> Self {
        Self { config }
    }

    /// Validate everything that can fail before the first request
    ///
    /// Fails on a missing column, a missing API key for a paid provider, or a
    /// table with no usable coordinate pair.
    pub fn preflight(&self, table: &InputTable, columns: &ColumnSelection) -> Result<Preflight> {
        let resolved = table.resolve(columns)?;

        let provider_config = &self.config.provider;
        if provider_config.provider.requires_api_key() {
            provider_config.required_key()?;
        }

        let valid_rows = table.count_valid_coordinates(&resolved);
        if valid_rows == 0 {
            return Err(ConfigError::NoValidCoordinates {
                latitude: columns.latitude.clone(),
                longitude: columns.longitude.clone(),
            }
            .into());
        }

        let quota = provider_config.hourly_quota;
        let planned_calls = quota.map_or(valid_rows, |q| valid_rows.min(q));
        let preflight = Preflight {
            provider: provider_config.provider,
            total_rows: table.len(),
            valid_rows,
            planned_calls,
            deferred_rows: valid_rows - planned_calls,
            estimated: estimate_duration(valid_rows, quota, provider_config.rate_limit),
        };

        log::info!(
            "Preflight: {} of {} rows valid, {} calls planned with {}",
            preflight.valid_rows,
            preflight.total_rows,
            preflight.planned_calls,
            preflight.provider
        );
        Ok(preflight)
    }

    /// Geocode every row with the configured provider
    ///
    /// Takes the `Preflight` computed for the same table, so the checks are not repeated.
    pub fn run(
        &self,
        preflight: &Preflight,
        table: &InputTable,
        columns: &ColumnSelection,
        observer: impl FnMut(&RunProgress, &ActivityLog),
    ) -> Result<BatchOutcome> {
        anyhow::ensure!(
            preflight.total_rows == table.len() && preflight.provider == self.config.provider.provider,
            "Preflight was computed for a different table or provider"
        );
        log::debug!(
            "Starting run: {} calls planned, about {:.1}s",
            preflight.planned_calls,
            preflight.estimated.as_secs_f64()
        );

        let client = create_client(&self.config.provider)?;
        self.run_with_client(client.as_ref(), table, columns, observer, std::thread::sleep)
    }

    /// Geocode with an explicit client and pause function
    pub fn run_with_client(
        &self,
        client: &dyn ReverseGeocoder,
        table: &InputTable,
        columns: &ColumnSelection,
        observer: impl FnMut(&RunProgress, &ActivityLog),
        pause: impl FnMut(Duration),
    ) -> Result<BatchOutcome> {
        BatchRunner::new(client)
            .with_quota(self.config.provider.hourly_quota)
            .with_log_window(self.config.log_window)
            .with_pause(pause)
            .on_progress(observer)
            .run(table, columns)
    }
}
