mod google;
mod locationiq;
mod nominatim;

pub use google::GoogleMapsClient;
pub use locationiq::LocationIqClient;
pub use nominatim::NominatimClient;

use crate::activity_log::ActivityLog;
use crate::address::AddressRecord;
use crate::config::ConfigError;
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Per-request timeout shared by every provider
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Requests allowed per run for the free Nominatim service
pub const NOMINATIM_QUOTA: usize = 50;

/// Supported geocoding services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    LocationIq,
    GoogleMaps,
    Nominatim,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::LocationIq, Provider::GoogleMaps, Provider::Nominatim];

    /// Short token used on the command line
    pub fn token(&self) -> &'static str {
        match self {
            Provider::LocationIq => "locationiq",
            Provider::GoogleMaps => "google",
            Provider::Nominatim => "nominatim",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::LocationIq => "LocationIQ",
            Provider::GoogleMaps => "Google Maps",
            Provider::Nominatim => "OpenStreetMap (Nominatim)",
        }
    }

    /// Minimum wall-clock gap between two consecutive calls
    pub fn rate_limit(&self) -> Duration {
        match self {
            Provider::LocationIq => Duration::from_millis(800),
            Provider::GoogleMaps => Duration::from_millis(500),
            Provider::Nominatim => Duration::from_secs(1),
        }
    }

    /// Paid providers refuse to run without a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Provider::Nominatim)
    }

    /// Default ceiling on real calls per run
    pub fn default_quota(&self) -> Option<usize> {
        match self {
            Provider::Nominatim => Some(NOMINATIM_QUOTA),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::LocationIq => locationiq::BASE_URL,
            Provider::GoogleMaps => google::BASE_URL,
            Provider::Nominatim => nominatim::BASE_URL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    /// Accepts either the short token or the display name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.token() == wanted || p.display_name().to_lowercase() == wanted)
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

/// Settings for one provider, fixed before a run starts
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub rate_limit: Duration,
    pub api_key: Option<String>,
    /// Ceiling on real calls within a single run
    pub hourly_quota: Option<usize>,
    pub base_url: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Provider defaults with no key
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            rate_limit: provider.rate_limit(),
            api_key: None,
            hourly_quota: provider.default_quota(),
            base_url: provider.default_base_url().to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Sets the key; blank keys are treated as absent
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        self
    }

    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.hourly_quota = quota;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Key for paid providers, or the configuration error naming the provider
    pub(crate) fn required_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey {
                provider: self.provider.display_name(),
            })
    }
}

/// Capability shared by every provider client
///
/// Clients never return errors for a single lookup: any failure is written to
/// the activity log and surfaces as `None`, which the batch runner records as
/// an `Error` row.
pub trait ReverseGeocoder {
    fn provider(&self) -> Provider;

    /// Pause applied after each real call
    fn rate_limit(&self) -> Duration {
        self.provider().rate_limit()
    }

    /// Resolve a coordinate pair into an address, logging progress to `log`
    fn reverse_geocode(&self, lat: f64, lon: f64, log: &mut ActivityLog) -> Option<AddressRecord>;
}

/// Builds the client for the configured provider
pub fn create_client(config: &ProviderConfig) -> Result<Box<dyn ReverseGeocoder>> {
    let client: Box<dyn ReverseGeocoder> = match config.provider {
        Provider::LocationIq => Box::new(LocationIqClient::new(config)?),
        Provider::GoogleMaps => Box::new(GoogleMapsClient::new(config)?),
        Provider::Nominatim => Box::new(NominatimClient::new(config)?),
    };
    Ok(client)
}

/// Identification string sent with every request
pub(crate) fn user_agent() -> String {
    format!(
        "geobatch/{} (https://github.com/geobatch/geobatch)",
        env!("CARGO_PKG_VERSION")
    )
}

pub(crate) fn build_http_client(config: &ProviderConfig) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(config.timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Sends a request and decodes the JSON body. Any failure is logged and
/// returned as `None`.
pub(crate) fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    log: &mut ActivityLog,
) -> Option<T> {
    let response = match request.send() {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            log.push("⏱️ Request timeout");
            return None;
        }
        Err(e) => {
            log.push(format!("❌ Request failed: {}", e));
            return None;
        }
    };

    let status = response.status();
    log.push(format!("📥 Response Status: {}", status.as_u16()));

    if status != StatusCode::OK {
        log.push(format!("❌ Error: HTTP {}", status.as_u16()));
        return None;
    }

    match response.json::<T>() {
        Ok(data) => Some(data),
        Err(e) if e.is_timeout() => {
            log.push("⏱️ Request timeout");
            None
        }
        Err(e) => {
            log.push(format!("❌ Malformed response: {}", e));
            None
        }
    }
}
