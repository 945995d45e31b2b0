//! Reverse geocoding through the Nominatim `/reverse` endpoint.

use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Coordinate, GeocodeError, Geocoder};
use crate::common::constants::USER_AGENT;

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<ReverseAddress>,
}

#[derive(Debug, Deserialize)]
struct ReverseAddress {
    #[serde(default)]
    country_code: Option<String>,
}

/// Blocking Nominatim client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("zoom", "3".to_string()),
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
            ])
            .send()
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: ReverseResponse = resp
            .json()
            .map_err(|e| GeocodeError::Payload(e.to_string()))?;

        Ok(body
            .address
            .and_then(|a| a.country_code)
            .filter(|code| !code.is_empty())
            .map(|code| code.to_ascii_uppercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocoder_for(server: &mockito::ServerGuard) -> NominatimGeocoder {
        NominatimGeocoder::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_country_code_is_uppercased() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("format".into(), "jsonv2".into()),
                mockito::Matcher::UrlEncoded("lat".into(), "30.0444".into()),
                mockito::Matcher::UrlEncoded("lon".into(), "31.2357".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"display_name":"Egypt","address":{"country":"Egypt","country_code":"eg"}}"#)
            .create();

        let code = geocoder_for(&server)
            .reverse_geocode(Coordinate::new(30.0444, 31.2357))
            .unwrap();

        mock.assert();
        assert_eq!(code.as_deref(), Some("EG"));
    }

    #[test]
    fn test_open_sea_has_no_country() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":"Unable to geocode"}"#)
            .create();

        let code = geocoder_for(&server)
            .reverse_geocode(Coordinate::new(0.0, -30.0))
            .unwrap();
        assert_eq!(code, None);
    }

    #[test]
    fn test_http_error_is_reported() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/reverse")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create();

        let err = geocoder_for(&server)
            .reverse_geocode(Coordinate::new(0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, GeocodeError::Status(503)));
    }
}
