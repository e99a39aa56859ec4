use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::cache::ManualClock;
use crate::config::UpstreamConfig;
use crate::prediction::upstream::{FlightStatusSnapshot, UpstreamContextProvider, UpstreamError};
use crate::prediction::{
    prediction_router, ContextGatherer, FlightRequest, PredictionEngine, PredictionService,
    ProfileTables,
};

pub(super) fn request() -> FlightRequest {
    FlightRequest {
        carrier: "CA".to_string(),
        flight_number: "CA1501".to_string(),
        origin: "PEK".to_string(),
        destination: "PVG".to_string(),
        departure_date: "2024-07-15".to_string(),
        departure_time: "18:30".to_string(),
    }
}

pub(super) fn unknown_request() -> FlightRequest {
    FlightRequest {
        carrier: "ZZ".to_string(),
        flight_number: "ZZ9".to_string(),
        origin: "XXX".to_string(),
        destination: "YYY".to_string(),
        departure_date: "2024-01-01".to_string(),
        departure_time: "03:00".to_string(),
    }
}

pub(super) fn profiles() -> Arc<ProfileTables> {
    Arc::new(ProfileTables::builtin())
}

pub(super) fn engine() -> PredictionEngine {
    PredictionEngine::new(profiles())
}

pub(super) fn clock() -> Arc<ManualClock> {
    let start = Utc
        .with_ymd_and_hms(2024, 7, 15, 6, 0, 0)
        .single()
        .expect("valid start");
    Arc::new(ManualClock::new(start))
}

pub(super) fn upstream_config() -> UpstreamConfig {
    UpstreamConfig {
        flight_api_url: Some("http://flights.invalid".to_string()),
        weather_api_url: Some("http://weather.invalid".to_string()),
        timeout: Duration::from_millis(200),
        ..UpstreamConfig::default()
    }
}

/// Scripted provider that records every call.
#[derive(Default)]
pub(super) struct ScriptedProvider {
    pub(super) status: Option<FlightStatusSnapshot>,
    pub(super) weather: HashMap<String, f64>,
    pub(super) on_time_rate: Option<f64>,
    pub(super) average_delay: Option<f64>,
    pub(super) latency: Option<Duration>,
    calls: AtomicUsize,
    airports: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(super) fn healthy() -> Self {
        let mut weather = HashMap::new();
        weather.insert("PEK".to_string(), 0.45);
        weather.insert("PVG".to_string(), 0.15);
        Self {
            status: Some(FlightStatusSnapshot {
                status: "延误".to_string(),
                code: "DELAYED".to_string(),
                delay_minutes: 40,
            }),
            weather,
            on_time_rate: Some(0.83),
            average_delay: Some(12.5),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn weather_lookups(&self) -> Vec<String> {
        self.airports.lock().expect("airport log poisoned").clone()
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl UpstreamContextProvider for ScriptedProvider {
    async fn fetch_flight_status(
        &self,
        _flight_number: &str,
        _date: NaiveDate,
    ) -> Result<FlightStatusSnapshot, UpstreamError> {
        self.enter().await;
        self.status
            .clone()
            .ok_or_else(|| UpstreamError::Unavailable("no status".to_string()))
    }

    async fn fetch_airport_weather_impact(&self, airport: &str) -> Result<f64, UpstreamError> {
        self.enter().await;
        self.airports
            .lock()
            .expect("airport log poisoned")
            .push(airport.to_string());
        self.weather
            .get(airport)
            .copied()
            .ok_or_else(|| UpstreamError::Transport("connection refused".to_string()))
    }

    async fn fetch_carrier_performance(&self, _carrier: &str) -> Result<f64, UpstreamError> {
        self.enter().await;
        self.on_time_rate
            .ok_or_else(|| UpstreamError::Malformed("missing performance".to_string()))
    }

    async fn fetch_historical_stats(
        &self,
        _flight_number: &str,
        _days: u32,
    ) -> Result<f64, UpstreamError> {
        self.enter().await;
        self.average_delay
            .ok_or_else(|| UpstreamError::Unavailable("no history".to_string()))
    }
}

pub(super) fn gatherer(provider: Arc<ScriptedProvider>) -> ContextGatherer {
    ContextGatherer::with_clock(provider, &upstream_config(), clock())
}

pub(super) fn service_with_context(provider: Arc<ScriptedProvider>) -> PredictionService {
    PredictionService::new(Arc::new(engine())).with_context(Arc::new(gatherer(provider)))
}

pub(super) fn router_with_service(service: PredictionService) -> axum::Router {
    prediction_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
