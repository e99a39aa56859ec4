//! Integration tests for the delay prediction workflow.
//!
//! Scenarios exercise the public engine, service facade, and HTTP router together with
//! on-disk profile overrides and learned models, without reaching into private modules.

mod common {
    use std::fs;
    use std::path::PathBuf;

    use flight_delay::prediction::FlightRequest;

    pub(super) fn request(
        carrier: &str,
        origin: &str,
        destination: &str,
        date: &str,
        time: &str,
    ) -> FlightRequest {
        FlightRequest {
            carrier: carrier.to_string(),
            flight_number: format!("{carrier}1234"),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: date.to_string(),
            departure_time: time.to_string(),
        }
    }

    /// Write `contents` to a per-test file under the system temp directory.
    pub(super) fn fixture(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flight-delay-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create fixture dir");
        let path = dir.join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }
}

use std::sync::Arc;

use axum::http::StatusCode;
use common::*;
use flight_delay::config::{DelayEstimateMode, PredictionConfig};
use flight_delay::prediction::{
    prediction_router, ModelUsed, PredictionEngine, PredictionService, RiskLevel,
};
use tower::ServiceExt;

#[test]
fn weighted_scenarios_classify_as_documented() {
    let engine = PredictionEngine::from_config(&PredictionConfig::default()).expect("builtin");

    let beijing = engine
        .predict(&request("CA", "PEK", "PVG", "2024-07-15", "18:30"), None)
        .expect("valid request");
    assert!((beijing.delay_probability - 0.34025).abs() < 1e-9);
    assert_eq!(beijing.risk_level, RiskLevel::Low);
    assert_eq!(beijing.delay_window.max_minutes, 15);

    let unknown = engine
        .predict(&request("ZZ", "XXX", "YYY", "2024-01-01", "03:00"), None)
        .expect("valid request");
    assert!((unknown.delay_probability - 0.275).abs() < 1e-9);
    assert_eq!(unknown.risk_level, RiskLevel::Low);
}

#[test]
fn csv_overrides_replace_builtin_profiles() {
    let carriers = fixture(
        "carriers.csv",
        "code,name,delay_rate,on_time_rate\nCA,Air China,0.40,0.60\nXY,Example Air,0.10,0.90\n",
    );
    let config = PredictionConfig {
        carrier_profiles: Some(carriers),
        ..PredictionConfig::default()
    };
    let engine = PredictionEngine::from_config(&config).expect("overrides load");
    let stats = engine.statistics();
    assert_eq!(stats.profile_version, "custom");
    assert_eq!(stats.carrier_count, 2);

    let result = engine
        .predict(&request("CA", "PEK", "PVG", "2024-07-15", "18:30"), None)
        .expect("valid request");
    // carrier term moves from 0.18 * 0.30 to 0.40 * 0.30
    assert!((result.delay_probability - 0.40625).abs() < 1e-9);
    assert_eq!(result.risk_level, RiskLevel::Medium);
    assert_eq!(result.factors[0].description, "Air China历史延误率较高");
}

#[test]
fn learned_model_from_disk_takes_precedence() {
    let model = fixture(
        "model.json",
        r#"{"version":"2024.10","intercept":-1.2,"coefficients":{"is_peak":0.8,"origin_delay_rate":2.0}}"#,
    );
    let config = PredictionConfig {
        model_path: Some(model),
        delay_estimate: DelayEstimateMode::Seeded,
        ..PredictionConfig::default()
    };
    let engine = PredictionEngine::from_config(&config).expect("profiles load");
    assert_eq!(engine.statistics().model_version.as_deref(), Some("linear-2024.10"));

    let result = engine
        .predict(&request("MU", "PEK", "CAN", "2024-03-12", "08:00"), None)
        .expect("valid request");
    // logit = -1.2 + 0.8 + 0.25 * 2.0 = 0.1
    let expected = 1.0 / (1.0 + (-0.1f64).exp());
    assert_eq!(result.model_used, ModelUsed::Learned);
    assert!((result.delay_probability - expected).abs() < 1e-12);
    assert!(result.delay_window.contains(result.estimated_delay_minutes));
    assert!(result.feature_importance.is_some());
}

#[tokio::test]
async fn router_serves_predictions_end_to_end() {
    let engine = PredictionEngine::from_config(&PredictionConfig::default()).expect("builtin");
    let service = Arc::new(PredictionService::new(Arc::new(engine)));
    let router = prediction_router(service);

    let body = serde_json::to_vec(&request("HU", "CAN", "PEK", "2024-10-02", "07:15"))
        .expect("serializes");
    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/predict")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json payload");
    let probability = payload
        .pointer("/prediction/delay_probability")
        .and_then(serde_json::Value::as_f64)
        .expect("probability present");
    assert!((0.05..=0.95).contains(&probability));
    assert!(payload
        .pointer("/suggestions/0")
        .and_then(serde_json::Value::as_str)
        .is_some());
}
