//! HTTP client for the flight-data and weather providers.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use flight_delay::config::UpstreamConfig;
use flight_delay::prediction::{FlightStatusSnapshot, UpstreamContextProvider, UpstreamError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Provider responses are wrapped as `{"status": "success", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlightStatusData {
    status: RawStatus,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    text: String,
    code: String,
    #[serde(default)]
    delay: u32,
}

#[derive(Debug, Deserialize)]
struct WeatherData {
    flight_impact: FlightImpact,
}

#[derive(Debug, Deserialize)]
struct FlightImpact {
    delay_probability: f64,
}

#[derive(Debug, Deserialize)]
struct CarrierData {
    performance: Performance,
}

#[derive(Debug, Deserialize)]
struct Performance {
    on_time_performance: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    stats: HistoryStats,
}

#[derive(Debug, Deserialize)]
struct HistoryStats {
    avg_delay: f64,
}

pub(crate) struct HttpContextProvider {
    client: Client,
    timeout: Duration,
    flight_api_url: String,
    weather_api_url: String,
}

impl HttpContextProvider {
    /// Returns `None` when no flight API is configured.
    pub(crate) fn from_config(config: &UpstreamConfig) -> Result<Option<Self>, UpstreamError> {
        let Some(flight_api_url) = config.flight_api_url.clone() else {
            return Ok(None);
        };
        let weather_api_url = config
            .weather_api_url
            .clone()
            .unwrap_or_else(|| flight_api_url.clone());

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        Ok(Some(Self {
            client,
            timeout: config.timeout,
            flight_api_url: flight_api_url.trim_end_matches('/').to_string(),
            weather_api_url: weather_api_url.trim_end_matches('/').to_string(),
        }))
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        let response = self.client.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::Transport(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Unavailable(format!("{url} returned {status}")));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|err| UpstreamError::Malformed(err.to_string()))?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, UpstreamError> {
    if envelope.status != "success" {
        let message = envelope.message.unwrap_or(envelope.status);
        return Err(UpstreamError::Unavailable(message));
    }
    envelope
        .data
        .ok_or_else(|| UpstreamError::Malformed("success envelope without data".to_string()))
}

#[async_trait]
impl UpstreamContextProvider for HttpContextProvider {
    async fn fetch_flight_status(
        &self,
        flight_number: &str,
        date: NaiveDate,
    ) -> Result<FlightStatusSnapshot, UpstreamError> {
        let url = format!(
            "{}/flight/{flight_number}?date={}",
            self.flight_api_url,
            date.format("%Y-%m-%d")
        );
        let data: FlightStatusData = self.fetch(&url).await?;
        Ok(FlightStatusSnapshot {
            status: data.status.text,
            code: data.status.code,
            delay_minutes: data.status.delay,
        })
    }

    async fn fetch_airport_weather_impact(&self, airport: &str) -> Result<f64, UpstreamError> {
        let url = format!("{}/weather/airport/{airport}", self.weather_api_url);
        let data: WeatherData = self.fetch(&url).await?;
        Ok(data.flight_impact.delay_probability)
    }

    async fn fetch_carrier_performance(&self, carrier: &str) -> Result<f64, UpstreamError> {
        let url = format!("{}/airline/{carrier}/stats", self.flight_api_url);
        let data: CarrierData = self.fetch(&url).await?;
        Ok(data.performance.on_time_performance)
    }

    async fn fetch_historical_stats(
        &self,
        flight_number: &str,
        days: u32,
    ) -> Result<f64, UpstreamError> {
        let url = format!(
            "{}/flight/{flight_number}/history?days={days}",
            self.flight_api_url
        );
        let data: HistoryData = self.fetch(&url).await?;
        Ok(data.stats.avg_delay)
    }
}
