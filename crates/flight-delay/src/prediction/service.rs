use std::sync::Arc;

use tracing::debug;

use super::advice::advise;
use super::domain::{FlightQuery, FlightRequest, PredictionError, PredictionReport};
use super::engine::{EngineStatistics, PredictionEngine};
use super::upstream::ContextGatherer;

/// Service composing the prediction engine with optional live upstream context.
#[derive(Debug)]
pub struct PredictionService {
    engine: Arc<PredictionEngine>,
    gatherer: Option<Arc<ContextGatherer>>,
}

impl PredictionService {
    pub fn new(engine: Arc<PredictionEngine>) -> Self {
        Self {
            engine,
            gatherer: None,
        }
    }

    pub fn with_context(mut self, gatherer: Arc<ContextGatherer>) -> Self {
        self.gatherer = Some(gatherer);
        self
    }

    pub fn engine(&self) -> &Arc<PredictionEngine> {
        &self.engine
    }

    /// Validate, gather upstream context if configured, predict, and attach travel advice.
    pub async fn predict(&self, request: &FlightRequest) -> Result<PredictionReport, PredictionError> {
        let query = FlightQuery::parse(request)?;

        let context = match &self.gatherer {
            Some(gatherer) => Some(gatherer.gather(&query).await),
            None => None,
        };

        let prediction = self.engine.predict_query(&query, context.as_ref());
        debug!(
            flight = %query.flight_number(),
            probability = prediction.delay_probability,
            risk = prediction.risk_level.label(),
            model = prediction.model_used.label(),
            "prediction complete"
        );

        Ok(PredictionReport {
            suggestions: advise(&prediction, &query),
            prediction,
            context,
        })
    }

    pub fn statistics(&self) -> EngineStatistics {
        self.engine.statistics()
    }
}
