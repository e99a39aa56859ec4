use serde::{Deserialize, Serialize};

/// Weights and bounds of the rule-based scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub base_probability: f64,
    pub carrier: f64,
    pub airport: f64,
    pub time_of_day: f64,
    pub season: f64,
    pub route: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base_probability: 0.15,
            carrier: 0.30,
            airport: 0.25,
            time_of_day: 0.20,
            season: 0.15,
            route: 0.10,
            floor: 0.05,
            ceiling: 0.95,
        }
    }
}

impl ScoringWeights {
    pub fn clamp(&self, probability: f64) -> f64 {
        probability.max(self.floor).min(self.ceiling)
    }
}
