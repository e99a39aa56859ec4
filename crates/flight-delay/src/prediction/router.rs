use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{FlightRequest, PredictionError};
use super::service::PredictionService;

/// Router builder exposing prediction and profile lookup endpoints.
pub fn prediction_router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/api/v1/predict", post(predict_handler))
        .route("/api/v1/engine/stats", get(stats_handler))
        .route("/api/v1/carriers", get(carriers_handler))
        .route("/api/v1/airports", get(airports_handler))
        .with_state(service)
}

pub(crate) async fn predict_handler(
    State(service): State<Arc<PredictionService>>,
    axum::Json(request): axum::Json<FlightRequest>,
) -> Response {
    match service.predict(&request).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(PredictionError::InvalidInput { field, reason }) => {
            let payload = json!({
                "error": "invalid_input",
                "field": field,
                "message": reason,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn stats_handler(State(service): State<Arc<PredictionService>>) -> Response {
    (StatusCode::OK, axum::Json(service.statistics())).into_response()
}

pub(crate) async fn carriers_handler(State(service): State<Arc<PredictionService>>) -> Response {
    let carriers: Vec<_> = service.engine().profiles().carriers().cloned().collect();
    (StatusCode::OK, axum::Json(carriers)).into_response()
}

pub(crate) async fn airports_handler(State(service): State<Arc<PredictionService>>) -> Response {
    let airports: Vec<_> = service.engine().profiles().airports().cloned().collect();
    (StatusCode::OK, axum::Json(airports)).into_response()
}
