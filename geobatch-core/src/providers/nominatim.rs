use super::{build_http_client, fetch_json, Provider, ProviderConfig, ReverseGeocoder};
use crate::activity_log::ActivityLog;
use crate::address::AddressRecord;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

pub(crate) const BASE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Nominatim API response structure
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    address: Option<Address>,
    /// Set instead of an address when nothing lies near the point (e.g. open sea)
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    road: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    county: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// Client for the free OpenStreetMap Nominatim service
///
/// Nominatim's usage policy requires an identifying User-Agent on every call;
/// the shared HTTP client sends one.
pub struct NominatimClient {
    http: Client,
    base_url: String,
    rate_limit: Duration,
}

impl NominatimClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            base_url: config.base_url.clone(),
            rate_limit: config.rate_limit,
        })
    }

    fn request_url(&self, lat: f64, lon: f64) -> Result<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ],
        )
        .context("Invalid Nominatim base URL")
    }
}

impl ReverseGeocoder for NominatimClient {
    fn provider(&self) -> Provider {
        Provider::Nominatim
    }

    fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    fn reverse_geocode(&self, lat: f64, lon: f64, log: &mut ActivityLog) -> Option<AddressRecord> {
        log.push(format!(
            "📤 Sending request to Nominatim: lat={}, lon={}",
            lat, lon
        ));

        let url = match self.request_url(lat, lon) {
            Ok(url) => url,
            Err(e) => {
                log.push(format!("❌ Exception: {:#}", e));
                return None;
            }
        };

        let data: NominatimResponse = fetch_json(self.http.get(url), log)?;
        if let Some(error) = &data.error {
            log.push(format!("⚠️ No results found: {}", error));
            return None;
        }

        log.push("✅ Data received successfully");
        Some(to_record(data))
    }
}

fn to_record(data: NominatimResponse) -> AddressRecord {
    let address = data.address.unwrap_or_default();

    AddressRecord {
        street1: address.road.unwrap_or_default(),
        street2: address.suburb.unwrap_or_default(),
        city: address.city.or(address.county).unwrap_or_default(),
        state: address.state.unwrap_or_default(),
        postal: address.postcode.unwrap_or_default(),
        country: address.country.unwrap_or_default(),
        full_address: data.display_name.unwrap_or_default(),
    }
    .trimmed()
}
