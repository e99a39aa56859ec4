use crate::upstream::HttpContextProvider;
use chrono::{NaiveDate, NaiveTime};
use flight_delay::config::AppConfig;
use flight_delay::error::AppError;
use flight_delay::prediction::{ContextGatherer, PredictionEngine, PredictionService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Engine from the prediction config, wrapped with upstream context when a provider is
/// configured and its client can be built.
pub(crate) fn build_prediction_service(config: &AppConfig) -> Result<PredictionService, AppError> {
    let engine = Arc::new(PredictionEngine::from_config(&config.prediction)?);
    let service = PredictionService::new(engine);

    match HttpContextProvider::from_config(&config.upstream) {
        Ok(Some(provider)) => {
            info!(
                timeout_ms = config.upstream.timeout.as_millis() as u64,
                "upstream context enabled"
            );
            let gatherer = ContextGatherer::new(Arc::new(provider), &config.upstream);
            Ok(service.with_context(Arc::new(gatherer)))
        }
        Ok(None) => Ok(service),
        Err(error) => {
            warn!(%error, "upstream client unavailable, predicting without live context");
            Ok(service)
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|err| format!("failed to parse '{raw}' as HH:MM ({err})"))
}
