//! Remote prayer time computation (AlAdhan `/v1/timings`).

use chrono::{DateTime, Local};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use super::CalculationMethod;
use crate::common::constants::USER_AGENT;
use crate::geo::Coordinate;

/// Prayer name → raw clock string, exactly as the remote returned it.
pub type RawTimings = HashMap<String, String>;

/// Failure to obtain a day of timings from the remote collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("timings endpoint returned HTTP {0}")]
    Status(u16),
    #[error("malformed timings payload: {0}")]
    Payload(String),
    #[error("timings payload has no entry for {0}")]
    MissingPrayer(String),
    #[error("unreadable time for {prayer}: {raw}")]
    InvalidTime { prayer: String, raw: String },
}

/// Computes a day of prayer clock times for a place and method.
#[cfg_attr(test, mockall::automock)]
pub trait TimingsProvider: Send + Sync {
    /// `at` selects the day; its Unix timestamp is what the remote receives.
    fn fetch_timings(
        &self,
        coordinate: Coordinate,
        method: CalculationMethod,
        at: DateTime<Local>,
    ) -> Result<RawTimings, FetchError>;
}

#[derive(Debug, Deserialize)]
struct TimingsResponse {
    data: TimingsData,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: RawTimings,
}

/// Blocking AlAdhan client.
#[derive(Debug, Clone)]
pub struct AladhanClient {
    client: Client,
    base_url: String,
}

impl AladhanClient {
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

    fn url_for(&self, at: DateTime<Local>) -> String {
        format!("{}/v1/timings/{}", self.base_url, at.timestamp())
    }
}

impl TimingsProvider for AladhanClient {
    fn fetch_timings(
        &self,
        coordinate: Coordinate,
        method: CalculationMethod,
        at: DateTime<Local>,
    ) -> Result<RawTimings, FetchError> {
        let url = self.url_for(at);

        log_decorated!("Fetching prayer times (method {method})");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("method", method.id().to_string()),
            ])
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: TimingsResponse = resp
            .json()
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        Ok(body.data.timings)
    }
}
