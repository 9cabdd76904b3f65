use super::{build_http_client, fetch_json, Provider, ProviderConfig, ReverseGeocoder};
use crate::activity_log::ActivityLog;
use crate::address::{join_parts, AddressRecord};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

pub(crate) const BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const PLUS_CODE: &str = "plus_code";

/// Result types preferred over the rest, checked in order
const PRIORITY_TYPES: [&str; 11] = [
    "street_address",
    "premise",
    "subpremise",
    "route",
    "intersection",
    "political",
    "administrative_area_level_1",
    "administrative_area_level_2",
    "administrative_area_level_3",
    "administrative_area_level_4",
    "administrative_area_level_5",
];

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    types: Vec<String>,
}

impl GeocodeResult {
    fn has_type(&self, wanted: &str) -> bool {
        self.types.iter().any(|t| t == wanted)
    }

    /// Tagged only as a plus code; mixed tags keep the result eligible
    fn is_plus_code(&self) -> bool {
        !self.types.is_empty() && self.types.iter().all(|t| t == PLUS_CODE)
    }

    fn component(&self, wanted: &str) -> Option<&str> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == wanted))
            .map(|c| c.long_name.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    #[serde(default)]
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

/// Which result was chosen and whether only plus codes were available
#[derive(Debug, PartialEq)]
struct Selection {
    index: usize,
    plus_code_fallback: bool,
}

/// Client for the Google Maps Geocoding API (key required)
pub struct GoogleMapsClient {
    http: Client,
    base_url: String,
    api_key: String,
    rate_limit: Duration,
}

impl GoogleMapsClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.required_key()?.to_string();
        Ok(Self {
            http: build_http_client(config)?,
            base_url: config.base_url.clone(),
            api_key,
            rate_limit: config.rate_limit,
        })
    }

    fn request_url(&self, lat: f64, lon: f64) -> Result<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("latlng", format!("{},{}", lat, lon)),
                ("key", self.api_key.clone()),
            ],
        )
        .context("Invalid Google Maps base URL")
    }
}

impl ReverseGeocoder for GoogleMapsClient {
    fn provider(&self) -> Provider {
        Provider::GoogleMaps
    }

    fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    fn reverse_geocode(&self, lat: f64, lon: f64, log: &mut ActivityLog) -> Option<AddressRecord> {
        log.push(format!(
            "📤 Sending request to Google Maps: lat={}, lon={}",
            lat, lon
        ));

        let url = match self.request_url(lat, lon) {
            Ok(url) => url,
            Err(e) => {
                log.push(format!("❌ Exception: {:#}", e));
                return None;
            }
        };

        let data: GeocodeResponse = fetch_json(self.http.get(url), log)?;
        to_record(data, log)
    }
}

/// Picks the result to use from Google's ranked list
fn select_result(results: &[GeocodeResult]) -> Option<Selection> {
    if results.is_empty() {
        return None;
    }

    let candidates: Vec<usize> = (0..results.len())
        .filter(|&i| !results[i].is_plus_code())
        .collect();

    let Some(&first_candidate) = candidates.first() else {
        return Some(Selection {
            index: 0,
            plus_code_fallback: true,
        });
    };

    let index = PRIORITY_TYPES
        .iter()
        .find_map(|wanted| candidates.iter().copied().find(|&i| results[i].has_type(wanted)))
        .unwrap_or(first_candidate);

    Some(Selection {
        index,
        plus_code_fallback: false,
    })
}

fn to_record(data: GeocodeResponse, log: &mut ActivityLog) -> Option<AddressRecord> {
    if !data.status.is_empty() && data.status != "OK" {
        match &data.error_message {
            Some(message) => log.push(format!("⚠️ API status {}: {}", data.status, message)),
            None => log.push(format!("⚠️ API status {}", data.status)),
        }
    }

    let Some(selection) = select_result(&data.results) else {
        log.push("⚠️ No results found");
        return None;
    };

    log.push("✅ Data received successfully");
    if selection.plus_code_fallback {
        log.push("⚠️ Only plus-code results available, using the first result");
    }

    Some(record_from_result(&data.results[selection.index]))
}

fn record_from_result(result: &GeocodeResult) -> AddressRecord {
    let mut street1 = join_parts(result.component("street_number"), result.component("route"));
    if street1.is_empty() {
        street1 = result
            .formatted_address
            .split(',')
            .next()
            .unwrap_or("")
            .to_string();
    }

    // Each component fills at most one field, state first
    let mut state = String::new();
    let mut city = String::new();
    let mut postal = String::new();
    let mut country = String::new();

    for component in &result.address_components {
        let has = |wanted: &str| component.types.iter().any(|t| t == wanted);

        if has("administrative_area_level_1") {
            state = component.long_name.clone();
        } else if has("locality") {
            city = component.long_name.clone();
        } else if has("postal_code") {
            postal = component.long_name.clone();
        } else if has("country") {
            country = component.long_name.clone();
        }
    }

    AddressRecord {
        street1,
        street2: String::new(),
        city,
        state,
        postal,
        country,
        full_address: result.formatted_address.clone(),
    }
    .trimmed()
}
