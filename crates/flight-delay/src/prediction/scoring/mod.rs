mod config;
mod model;
pub(crate) mod rules;

pub use config::ScoringWeights;
pub use model::{LinearDelayModel, ModelError, MODEL_FEATURES};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::FlightQuery;
use super::features::FeatureSet;
use super::profiles::ProfileTables;

/// Capability implemented by anything able to turn a query into a delay probability.
///
/// The rule-based scorer is always present; a learned model may be tried first and is
/// abandoned for the rules on any error.
pub trait DelayScorer: Send + Sync {
    /// Short identifier reported in engine statistics.
    fn name(&self) -> &str;

    fn score(&self, query: &FlightQuery, features: &FeatureSet) -> Result<f64, ScorerError>;

    fn feature_importance(&self) -> Option<BTreeMap<String, f64>> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScorerError {
    #[error("scorer produced a non-finite probability")]
    NonFinite,
    #[error("scorer produced probability {0} outside [0, 1]")]
    OutOfRange(f64),
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Reject probabilities no downstream consumer can use.
pub(crate) fn check_probability(probability: f64) -> Result<f64, ScorerError> {
    if !probability.is_finite() {
        Err(ScorerError::NonFinite)
    } else if !(0.0..=1.0).contains(&probability) {
        Err(ScorerError::OutOfRange(probability))
    } else {
        Ok(probability)
    }
}

/// The five weighted inputs of the rule-based score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Carrier,
    Airport,
    TimeOfDay,
    Season,
    Route,
}

/// Discrete contribution to a score, allowing transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: ScoreFactor,
    pub raw: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_probability: f64,
    pub components: Vec<FactorContribution>,
    pub unclamped: f64,
    pub probability: f64,
}

impl ScoreBreakdown {
    pub fn contribution(&self, factor: ScoreFactor) -> f64 {
        self.components
            .iter()
            .find(|component| component.factor == factor)
            .map(|component| component.contribution)
            .unwrap_or(0.0)
    }
}

/// Stateless evaluator applying the weighted heuristic to a query.
#[derive(Debug, Clone)]
pub struct RuleBasedScorer {
    profiles: Arc<ProfileTables>,
    weights: ScoringWeights,
}

impl RuleBasedScorer {
    pub fn new(profiles: Arc<ProfileTables>) -> Self {
        Self::with_weights(profiles, ScoringWeights::default())
    }

    pub fn with_weights(profiles: Arc<ProfileTables>, weights: ScoringWeights) -> Self {
        Self { profiles, weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn breakdown(&self, query: &FlightQuery, features: &FeatureSet) -> ScoreBreakdown {
        rules::score_query(&self.profiles, &self.weights, query, features)
    }
}

impl DelayScorer for RuleBasedScorer {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn score(&self, query: &FlightQuery, features: &FeatureSet) -> Result<f64, ScorerError> {
        let breakdown = self.breakdown(query, features);
        if !breakdown.unclamped.is_finite() {
            return Err(ScorerError::NonFinite);
        }
        check_probability(breakdown.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::FlightRequest;

    fn query(carrier: &str, origin: &str, destination: &str, date: &str, time: &str) -> FlightQuery {
        FlightQuery::parse(&FlightRequest {
            carrier: carrier.to_string(),
            flight_number: format!("{carrier}100"),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: date.to_string(),
            departure_time: time.to_string(),
        })
        .expect("valid query")
    }

    fn scorer() -> RuleBasedScorer {
        RuleBasedScorer::new(Arc::new(ProfileTables::builtin()))
    }

    #[test]
    fn beijing_shanghai_summer_evening() {
        let q = query("CA", "PEK", "PVG", "2024-07-15", "18:30");
        let features = FeatureSet::extract(&q);
        let probability = scorer().score(&q, &features).expect("scores");
        assert!((probability - 0.34025).abs() < 1e-9, "got {probability}");
    }

    #[test]
    fn unknown_codes_use_neutral_rates() {
        let q = query("ZZ", "XXX", "YYY", "2024-01-01", "03:00");
        let features = FeatureSet::extract(&q);
        let probability = scorer().score(&q, &features).expect("scores");
        assert!((probability - 0.275).abs() < 1e-9, "got {probability}");
    }

    #[test]
    fn score_is_pure() {
        let scorer = scorer();
        let q = query("HU", "CAN", "PEK", "2024-10-02", "07:15");
        let features = FeatureSet::extract(&q);
        let first = scorer.score(&q, &features).expect("scores");
        for _ in 0..10 {
            assert_eq!(scorer.score(&q, &features).expect("scores"), first);
        }
    }

    #[test]
    fn clamps_to_bounds() {
        let profiles = Arc::new(ProfileTables::builtin());
        let heavy = ScoringWeights {
            base_probability: 0.9,
            ..ScoringWeights::default()
        };
        let q = query("9C", "PEK", "PVG", "2024-10-04", "08:00");
        let features = FeatureSet::extract(&q);
        let high = RuleBasedScorer::with_weights(profiles.clone(), heavy)
            .score(&q, &features)
            .expect("scores");
        assert_eq!(high, 0.95);

        let light = ScoringWeights {
            base_probability: -0.5,
            ..ScoringWeights::default()
        };
        let low = RuleBasedScorer::with_weights(profiles, light)
            .score(&q, &features)
            .expect("scores");
        assert_eq!(low, 0.05);
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        let broken = ScoringWeights {
            carrier: f64::NAN,
            ..ScoringWeights::default()
        };
        let q = query("CA", "PEK", "PVG", "2024-07-15", "18:30");
        let features = FeatureSet::extract(&q);
        let result =
            RuleBasedScorer::with_weights(Arc::new(ProfileTables::builtin()), broken)
                .score(&q, &features);
        assert_eq!(result, Err(ScorerError::NonFinite));
    }

    #[test]
    fn check_probability_bounds() {
        assert_eq!(check_probability(0.0), Ok(0.0));
        assert_eq!(check_probability(1.0), Ok(1.0));
        assert_eq!(check_probability(1.2), Err(ScorerError::OutOfRange(1.2)));
        assert_eq!(check_probability(f64::INFINITY), Err(ScorerError::NonFinite));
    }
}
