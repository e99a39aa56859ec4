use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::classify::{classify, RiskLevel};
use super::domain::{
    AirportInfo, CarrierInfo, FactorCategory, FlightQuery, FlightRequest, ModelUsed,
    PredictionError, PredictionResult, RiskFactor, RouteInfo,
};
use super::explain::FactorExplainer;
use super::features::FeatureSet;
use super::profiles::{ProfileError, ProfileTables, DEFAULT_DELAY_RATE};
use super::scoring::{DelayScorer, LinearDelayModel, RuleBasedScorer, ScoringWeights};
use super::upstream::UpstreamContext;
use crate::config::{DelayEstimateMode, PredictionConfig};

const UNKNOWN_CODE: &str = "UNKNOWN";
const UNKNOWN_NAME: &str = "未知";

/// Summary of what the engine has loaded, for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatistics {
    pub carrier_count: usize,
    pub airport_count: usize,
    pub model_available: bool,
    pub method: String,
    pub model_version: Option<String>,
    pub profile_version: String,
    pub average_carrier_delay_rate: Option<f64>,
}

/// Orchestrates feature extraction, scoring, classification, and explanation.
///
/// A learned scorer, when present, is tried first; any error drops to the rule-based scorer,
/// and a failure there yields [`default_prediction`]. Only an unparseable request is reported
/// to the caller.
pub struct PredictionEngine {
    profiles: Arc<ProfileTables>,
    rules: RuleBasedScorer,
    explainer: FactorExplainer,
    learned: Option<Arc<dyn DelayScorer>>,
    estimate_mode: DelayEstimateMode,
}

impl PredictionEngine {
    pub fn new(profiles: Arc<ProfileTables>) -> Self {
        Self::with_weights(profiles, ScoringWeights::default())
    }

    pub fn with_weights(profiles: Arc<ProfileTables>, weights: ScoringWeights) -> Self {
        Self {
            rules: RuleBasedScorer::with_weights(profiles.clone(), weights),
            explainer: FactorExplainer::new(profiles.clone(), weights),
            profiles,
            learned: None,
            estimate_mode: DelayEstimateMode::default(),
        }
    }

    pub fn with_learned_model(mut self, model: Arc<dyn DelayScorer>) -> Self {
        self.learned = Some(model);
        self
    }

    pub fn with_delay_estimate(mut self, mode: DelayEstimateMode) -> Self {
        self.estimate_mode = mode;
        self
    }

    /// Build from configuration. Broken profile overrides are fatal; an unreadable model
    /// only disables the learned path.
    pub fn from_config(config: &PredictionConfig) -> Result<Self, ProfileError> {
        let profiles = Arc::new(ProfileTables::load(config)?);
        let mut engine = Self::new(profiles.clone()).with_delay_estimate(config.delay_estimate);

        if let Some(path) = &config.model_path {
            match LinearDelayModel::from_path(path, profiles) {
                Ok(model) => {
                    info!(model = model.name(), path = %path.display(), "loaded learned delay model");
                    engine = engine.with_learned_model(Arc::new(model));
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "learned model unavailable, using rule-based scoring");
                }
            }
        }

        Ok(engine)
    }

    pub fn profiles(&self) -> &Arc<ProfileTables> {
        &self.profiles
    }

    pub fn predict(
        &self,
        request: &FlightRequest,
        context: Option<&UpstreamContext>,
    ) -> Result<PredictionResult, PredictionError> {
        let query = FlightQuery::parse(request)?;
        Ok(self.predict_query(&query, context))
    }

    pub fn predict_query(
        &self,
        query: &FlightQuery,
        context: Option<&UpstreamContext>,
    ) -> PredictionResult {
        let features = FeatureSet::extract(query);

        let (probability, model_used, feature_importance) = match self.score(query, &features) {
            Some(scored) => scored,
            None => return default_prediction(),
        };

        let assessment = classify(probability, query, self.estimate_mode);

        PredictionResult {
            delay_probability: probability,
            risk_level: assessment.level,
            risk_label: assessment.level.label().to_string(),
            estimated_delay_minutes: assessment.estimated_delay_minutes,
            delay_window: assessment.delay_window,
            confidence: assessment.confidence,
            factors: self.explainer.explain(query, &features, context),
            carrier_info: self.carrier_info(query.carrier()),
            route_info: RouteInfo {
                origin: self.airport_info(query.origin()),
                destination: self.airport_info(query.destination()),
            },
            model_used,
            feature_importance,
        }
    }

    fn score(
        &self,
        query: &FlightQuery,
        features: &FeatureSet,
    ) -> Option<(f64, ModelUsed, Option<BTreeMap<String, f64>>)> {
        if let Some(model) = &self.learned {
            match model.score(query, features) {
                Ok(probability) => {
                    let probability = self.rules.weights().clamp(probability);
                    return Some((probability, ModelUsed::Learned, model.feature_importance()));
                }
                Err(error) => {
                    warn!(model = model.name(), flight = %query.flight_number(), %error, "learned scorer failed, using rule-based scoring");
                }
            }
        }

        match self.rules.score(query, features) {
            Ok(probability) => Some((probability, ModelUsed::RuleBased, None)),
            Err(error) => {
                warn!(flight = %query.flight_number(), %error, "rule-based scorer failed, returning default prediction");
                None
            }
        }
    }

    fn carrier_info(&self, code: &str) -> CarrierInfo {
        match self.profiles.carrier(code) {
            Some(profile) => CarrierInfo {
                code: profile.code.clone(),
                name: profile.name.clone(),
                historical_delay_rate: profile.delay_rate,
            },
            None => CarrierInfo {
                code: code.to_string(),
                name: UNKNOWN_NAME.to_string(),
                historical_delay_rate: DEFAULT_DELAY_RATE,
            },
        }
    }

    fn airport_info(&self, code: &str) -> AirportInfo {
        match self.profiles.airport(code) {
            Some(profile) => AirportInfo {
                code: profile.code.clone(),
                name: profile.name.clone(),
                delay_rate: profile.delay_rate,
            },
            None => AirportInfo {
                code: code.to_string(),
                name: UNKNOWN_NAME.to_string(),
                delay_rate: DEFAULT_DELAY_RATE,
            },
        }
    }

    pub fn statistics(&self) -> EngineStatistics {
        let (method, model_version) = match &self.learned {
            Some(model) => (ModelUsed::Learned, Some(model.name().to_string())),
            None => (ModelUsed::RuleBased, None),
        };
        EngineStatistics {
            carrier_count: self.profiles.carrier_count(),
            airport_count: self.profiles.airport_count(),
            model_available: self.learned.is_some(),
            method: method.label().to_string(),
            model_version,
            profile_version: self.profiles.version().to_string(),
            average_carrier_delay_rate: self.profiles.average_carrier_delay_rate(),
        }
    }
}

impl std::fmt::Debug for PredictionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionEngine")
            .field("profiles", &self.profiles.version())
            .field("learned", &self.learned.as_ref().map(|model| model.name()))
            .field("estimate_mode", &self.estimate_mode)
            .finish()
    }
}

/// Result returned when no scorer could produce a usable probability.
pub fn default_prediction() -> PredictionResult {
    let level = RiskLevel::Medium;
    let unknown_airport = || AirportInfo {
        code: UNKNOWN_CODE.to_string(),
        name: UNKNOWN_NAME.to_string(),
        delay_rate: DEFAULT_DELAY_RATE,
    };

    PredictionResult {
        delay_probability: 0.3,
        risk_level: level,
        risk_label: level.label().to_string(),
        estimated_delay_minutes: 15,
        delay_window: level.delay_window(),
        confidence: 0.5,
        factors: vec![RiskFactor {
            category: FactorCategory::InsufficientData,
            magnitude: 0.0,
            description: "系统暂时无法分析具体因素".to_string(),
        }],
        carrier_info: CarrierInfo {
            code: UNKNOWN_CODE.to_string(),
            name: UNKNOWN_NAME.to_string(),
            historical_delay_rate: DEFAULT_DELAY_RATE,
        },
        route_info: RouteInfo {
            origin: unknown_airport(),
            destination: unknown_airport(),
        },
        model_used: ModelUsed::Default,
        feature_importance: None,
    }
}
