use super::{build_http_client, fetch_json, Provider, ProviderConfig, ReverseGeocoder};
use crate::activity_log::ActivityLog;
use crate::address::{join_parts, AddressRecord};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

pub(crate) const BASE_URL: &str = "https://us1.locationiq.com/v1/reverse.php";

/// LocationIQ reverse geocoding response
#[derive(Debug, Deserialize)]
struct LocationIqResponse {
    display_name: Option<String>,
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    house_number: Option<String>,
    road: Option<String>,
    quarter: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// Client for the LocationIQ API (key required)
pub struct LocationIqClient {
    http: Client,
    base_url: String,
    api_key: String,
    rate_limit: Duration,
}

impl LocationIqClient {
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
                ("key", self.api_key.clone()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
            ],
        )
        .context("Invalid LocationIQ base URL")
    }
}

impl ReverseGeocoder for LocationIqClient {
    fn provider(&self) -> Provider {
        Provider::LocationIq
    }

    fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    fn reverse_geocode(&self, lat: f64, lon: f64, log: &mut ActivityLog) -> Option<AddressRecord> {
        log.push(format!(
            "📤 Sending request to LocationIQ: lat={}, lon={}",
            lat, lon
        ));

        let url = match self.request_url(lat, lon) {
            Ok(url) => url,
            Err(e) => {
                log.push(format!("❌ Exception: {:#}", e));
                return None;
            }
        };

        let data: LocationIqResponse = fetch_json(self.http.get(url), log)?;
        log.push("✅ Data received successfully");
        Some(to_record(data))
    }
}

fn to_record(data: LocationIqResponse) -> AddressRecord {
    let address = data.address.unwrap_or_default();

    AddressRecord {
        street1: join_parts(address.house_number.as_deref(), address.road.as_deref()),
        street2: join_parts(address.quarter.as_deref(), address.suburb.as_deref()),
        city: address.city.unwrap_or_default(),
        state: address.state.unwrap_or_default(),
        postal: address.postcode.unwrap_or_default(),
        country: address.country.unwrap_or_default(),
        full_address: data.display_name.unwrap_or_default(),
    }
    .trimmed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::OneShotServer;

    fn client_for(base_url: &str) -> LocationIqClient {
        let config = ProviderConfig::new(Provider::LocationIq)
            .with_api_key(Some("pk.test".to_string()))
            .with_base_url(base_url);
        LocationIqClient::new(&config).unwrap()
    }

    #[test]
    fn test_request_url_carries_key_and_coordinates() {
        let client = client_for(BASE_URL);
        let url = client.request_url(6.5244, 3.3792).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("us1.locationiq.com"));
        assert!(query.contains(&("key".to_string(), "pk.test".to_string())));
        assert!(query.contains(&("lat".to_string(), "6.5244".to_string())));
        assert!(query.contains(&("lon".to_string(), "3.3792".to_string())));
        assert!(query.contains(&("format".to_string(), "json".to_string())));
    }

    #[test]
    fn test_to_record_splits_streets() {
        let json = r#"{
            "display_name": "12, Marina Road, Lagos Island, Lagos, Lagos State, 101223, Nigeria",
            "address": {
                "house_number": "12",
                "road": "Marina Road",
                "quarter": "Marina",
                "suburb": "Lagos Island",
                "city": "Lagos",
                "state": "Lagos State",
                "postcode": "101223",
                "country": "Nigeria"
            }
        }"#;

        let data: LocationIqResponse = serde_json::from_str(json).unwrap();
        let record = to_record(data);

        assert_eq!(record.street1, "12 Marina Road");
        assert_eq!(record.street2, "Marina Lagos Island");
        assert_eq!(record.city, "Lagos");
        assert_eq!(record.state, "Lagos State");
        assert_eq!(record.postal, "101223");
        assert_eq!(record.country, "Nigeria");
        assert!(record.full_address.starts_with("12, Marina Road"));
    }

    #[test]
    fn test_to_record_defaults_missing_fields() {
        let data: LocationIqResponse =
            serde_json::from_str(r#"{"address": {"road": "Allen Avenue"}}"#).unwrap();
        let record = to_record(data);

        assert_eq!(record.street1, "Allen Avenue");
        assert_eq!(record.street2, "");
        assert_eq!(record.city, "");
        assert_eq!(record.full_address, "");
    }

    #[test]
    fn test_non_200_status_fails() {
        let server = OneShotServer::respond("401 Unauthorized", r#"{"error":"Invalid key"}"#);
        let client = client_for(&server.url);
        let mut log = ActivityLog::default();

        assert!(client.reverse_geocode(6.5244, 3.3792, &mut log).is_none());
        assert_eq!(log.last(), Some("❌ Error: HTTP 401"));
        server.request();
    }

    #[test]
    fn test_success_over_http() {
        let server = OneShotServer::respond(
            "200 OK",
            r#"{"display_name":"Allen Avenue, Ikeja","address":{"road":"Allen Avenue","city":"Ikeja"}}"#,
        );
        let client = client_for(&server.url);
        let mut log = ActivityLog::default();

        let record = client.reverse_geocode(6.6018, 3.3515, &mut log).unwrap();
        assert_eq!(record.street1, "Allen Avenue");
        assert_eq!(record.city, "Ikeja");

        let request = server.request();
        assert!(request.contains("key=pk.test"));
    }
}
