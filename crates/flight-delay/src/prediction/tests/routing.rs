use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde_json::Value;
use tower::ServiceExt;

use super::common::*;
use crate::prediction::router::predict_handler;
use crate::prediction::PredictionService;

fn post_predict(body: Vec<u8>) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post("/api/v1/predict")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn predict_route_returns_report() {
    let router = router_with_service(PredictionService::new(Arc::new(engine())));

    let response = router
        .oneshot(post_predict(serde_json::to_vec(&request()).expect("serializes")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.pointer("/prediction/risk_level").and_then(Value::as_str),
        Some("low")
    );
    assert_eq!(
        payload.pointer("/prediction/model_used").and_then(Value::as_str),
        Some("rule-based")
    );
    assert!(payload
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|s| !s.is_empty())
        .unwrap_or(false));
    assert!(payload.get("context").is_none());
}

#[tokio::test]
async fn predict_handler_rejects_invalid_input() {
    let service = Arc::new(PredictionService::new(Arc::new(engine())));
    let mut bad = request();
    bad.departure_date = "15/07/2024".to_string();

    let response = predict_handler(State(service), axum::Json(bad)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("field").and_then(Value::as_str),
        Some("departure_date")
    );
}

#[tokio::test]
async fn predict_route_accepts_airline_alias() {
    let router = router_with_service(PredictionService::new(Arc::new(engine())));
    let body = br#"{"airline":"9C","flight_number":"9C8888","origin":"PEK","destination":"PVG","departure_date":"2024-10-04","departure_time":"08:00"}"#;

    let response = router
        .oneshot(post_predict(body.to_vec()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.pointer("/prediction/risk_level").and_then(Value::as_str),
        Some("medium")
    );
}

#[tokio::test]
async fn stats_and_listings_are_exposed() {
    let router = router_with_service(PredictionService::new(Arc::new(engine())));

    for (uri, check) in [
        ("/api/v1/engine/stats", "/carrier_count"),
        ("/api/v1/carriers", "/0/code"),
        ("/api/v1/airports", "/0/code"),
    ] {
        let response = router
            .clone()
            .oneshot(
                axum::http::Request::get(uri)
                    .body(axum::body::Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let payload = read_json_body(response).await;
        assert!(payload.pointer(check).is_some(), "{uri} missing {check}");
    }
}
