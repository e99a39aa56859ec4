//! Live signals from external flight/weather providers.
//!
//! The engine never performs I/O itself. [`ContextGatherer`] drives an
//! [`UpstreamContextProvider`] through per-signal TTL caches and a timeout, replacing any
//! signal that cannot be fetched with its neutral default.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::FlightQuery;
use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::UpstreamConfig;

pub const DEFAULT_WEATHER_IMPACT: f64 = 0.1;
pub const DEFAULT_CARRIER_ON_TIME_RATE: f64 = 0.8;
pub const DEFAULT_HISTORICAL_AVERAGE_DELAY: f64 = 20.0;

/// Live status of a specific flight on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightStatusSnapshot {
    pub status: String,
    pub code: String,
    pub delay_minutes: u32,
}

/// External provider of live context. Every call may fail; failures degrade the prediction
/// to neutral defaults rather than failing it.
#[async_trait]
pub trait UpstreamContextProvider: Send + Sync {
    async fn fetch_flight_status(
        &self,
        flight_number: &str,
        date: NaiveDate,
    ) -> Result<FlightStatusSnapshot, UpstreamError>;

    /// Delay-probability contribution of current weather at the airport, in `[0, 1]`.
    async fn fetch_airport_weather_impact(&self, airport: &str) -> Result<f64, UpstreamError>;

    /// On-time rate of the carrier, in `[0, 1]`.
    async fn fetch_carrier_performance(&self, carrier: &str) -> Result<f64, UpstreamError>;

    /// Average delay in minutes of the flight over the last `days` days.
    async fn fetch_historical_stats(&self, flight_number: &str, days: u32)
        -> Result<f64, UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamSignal {
    FlightStatus,
    OriginWeather,
    DestinationWeather,
    CarrierPerformance,
    HistoricalStats,
}

/// Typed upstream signals with neutral defaults for anything missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamContext {
    pub flight_status: Option<FlightStatusSnapshot>,
    pub origin_weather_impact: f64,
    pub destination_weather_impact: f64,
    pub carrier_on_time_rate: f64,
    pub historical_average_delay: f64,
    #[serde(default)]
    pub unavailable_signals: Vec<UpstreamSignal>,
}

impl Default for UpstreamContext {
    fn default() -> Self {
        Self {
            flight_status: None,
            origin_weather_impact: DEFAULT_WEATHER_IMPACT,
            destination_weather_impact: DEFAULT_WEATHER_IMPACT,
            carrier_on_time_rate: DEFAULT_CARRIER_ON_TIME_RATE,
            historical_average_delay: DEFAULT_HISTORICAL_AVERAGE_DELAY,
            unavailable_signals: Vec::new(),
        }
    }
}

impl UpstreamContext {
    pub fn is_complete(&self) -> bool {
        self.unavailable_signals.is_empty()
    }
}

/// Fetches and caches the upstream signals for a query.
pub struct ContextGatherer {
    provider: Arc<dyn UpstreamContextProvider>,
    status: TtlCache<(String, NaiveDate), FlightStatusSnapshot>,
    weather: TtlCache<String, f64>,
    carriers: TtlCache<String, f64>,
    history: TtlCache<(String, u32), f64>,
    timeout: Duration,
    history_days: u32,
}

impl ContextGatherer {
    pub fn new(provider: Arc<dyn UpstreamContextProvider>, config: &UpstreamConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<dyn UpstreamContextProvider>,
        config: &UpstreamConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            status: TtlCache::with_clock(config.status_ttl, clock.clone()),
            weather: TtlCache::with_clock(config.weather_ttl, clock.clone()),
            carriers: TtlCache::with_clock(config.stats_ttl, clock.clone()),
            history: TtlCache::with_clock(config.stats_ttl, clock),
            timeout: config.timeout,
            history_days: config.history_days,
        }
    }

    /// Fetch all signals concurrently. Never fails.
    pub async fn gather(&self, query: &FlightQuery) -> UpstreamContext {
        let provider = &self.provider;
        let flight_number = query.flight_number().to_string();
        let date = query.departure_date();
        let days = self.history_days;

        let status = self.guarded(
            self.status
                .get_or_compute_async((flight_number.clone(), date), move || async move {
                    provider.fetch_flight_status(query.flight_number(), date).await
                }),
        );
        let origin = self.weather_impact(query.origin());
        let destination = self.weather_impact(query.destination());
        let carrier = self.guarded(self.carriers.get_or_compute_async(
            query.carrier().to_string(),
            move || async move {
                let rate = provider.fetch_carrier_performance(query.carrier()).await?;
                unit_interval("on-time rate", rate)
            },
        ));
        let history = self.guarded(self.history.get_or_compute_async(
            (flight_number, days),
            move || async move {
                let minutes = provider
                    .fetch_historical_stats(query.flight_number(), days)
                    .await?;
                if minutes.is_finite() && minutes >= 0.0 {
                    Ok(minutes)
                } else {
                    Err(UpstreamError::Malformed(format!(
                        "average delay {minutes} is not a non-negative number"
                    )))
                }
            },
        ));

        let (status, origin, destination, carrier, history) =
            tokio::join!(status, origin, destination, carrier, history);

        let mut unavailable = Vec::new();
        let mut settle = |signal: UpstreamSignal, error: UpstreamError| {
            warn!(?signal, flight = %query.flight_number(), %error, "upstream signal unavailable, using default");
            unavailable.push(signal);
        };

        let flight_status = status
            .map_err(|error| settle(UpstreamSignal::FlightStatus, error))
            .ok();
        let origin_weather_impact = origin
            .map_err(|error| settle(UpstreamSignal::OriginWeather, error))
            .unwrap_or(DEFAULT_WEATHER_IMPACT);
        let destination_weather_impact = destination
            .map_err(|error| settle(UpstreamSignal::DestinationWeather, error))
            .unwrap_or(DEFAULT_WEATHER_IMPACT);
        let carrier_on_time_rate = carrier
            .map_err(|error| settle(UpstreamSignal::CarrierPerformance, error))
            .unwrap_or(DEFAULT_CARRIER_ON_TIME_RATE);
        let historical_average_delay = history
            .map_err(|error| settle(UpstreamSignal::HistoricalStats, error))
            .unwrap_or(DEFAULT_HISTORICAL_AVERAGE_DELAY);

        UpstreamContext {
            flight_status,
            origin_weather_impact,
            destination_weather_impact,
            carrier_on_time_rate,
            historical_average_delay,
            unavailable_signals: unavailable,
        }
    }

    async fn weather_impact(&self, airport: &str) -> Result<f64, UpstreamError> {
        let provider = &self.provider;
        self.guarded(
            self.weather
                .get_or_compute_async(airport.to_string(), move || async move {
                    let impact = provider.fetch_airport_weather_impact(airport).await?;
                    unit_interval("weather impact", impact)
                }),
        )
        .await
    }

    /// A timed-out fetch is dropped before it can write to the cache.
    async fn guarded<T, F>(&self, fetch: F) -> Result<T, UpstreamError>
    where
        F: Future<Output = Result<T, UpstreamError>>,
    {
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.timeout)),
        }
    }
}

impl std::fmt::Debug for ContextGatherer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGatherer")
            .field("timeout", &self.timeout)
            .field("history_days", &self.history_days)
            .field("status", &self.status)
            .field("weather", &self.weather)
            .finish()
    }
}

fn unit_interval(what: &str, value: f64) -> Result<f64, UpstreamError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(UpstreamError::Malformed(format!("{what} {value} outside [0, 1]")))
    }
}
