use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use super::super::domain::FlightQuery;
use super::super::features::FeatureSet;
use super::super::profiles::ProfileTables;
use super::{check_probability, DelayScorer, ScorerError};

/// Feature names a linear model may weight, in vector order.
pub const MODEL_FEATURES: [&str; 11] = [
    "hour",
    "weekday",
    "month",
    "day",
    "is_peak",
    "is_weekend",
    "is_high_traffic_day",
    "is_holiday_season",
    "carrier_delay_rate",
    "origin_delay_rate",
    "destination_delay_rate",
];

#[derive(Debug, Deserialize)]
struct ModelFile {
    #[serde(default)]
    version: Option<String>,
    intercept: f64,
    coefficients: BTreeMap<String, f64>,
}

/// Logistic model over the feature set and profile rates, trained offline.
#[derive(Debug, Clone)]
pub struct LinearDelayModel {
    name: String,
    intercept: f64,
    weights: [f64; MODEL_FEATURES.len()],
    profiles: Arc<ProfileTables>,
}

impl LinearDelayModel {
    pub fn from_path(path: &Path, profiles: Arc<ProfileTables>) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw, profiles)
    }

    pub fn from_json(raw: &str, profiles: Arc<ProfileTables>) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(raw)?;
        if !file.intercept.is_finite() {
            return Err(ModelError::NonFiniteWeight("intercept".to_string()));
        }

        let mut weights = [0.0; MODEL_FEATURES.len()];
        for (feature, weight) in file.coefficients {
            let index = MODEL_FEATURES
                .iter()
                .position(|name| *name == feature)
                .ok_or_else(|| ModelError::UnknownFeature(feature.clone()))?;
            if !weight.is_finite() {
                return Err(ModelError::NonFiniteWeight(feature));
            }
            weights[index] = weight;
        }

        let name = match file.version {
            Some(version) => format!("linear-{version}"),
            None => "linear".to_string(),
        };

        Ok(Self {
            name,
            intercept: file.intercept,
            weights,
            profiles,
        })
    }

    fn feature_vector(&self, query: &FlightQuery, features: &FeatureSet) -> [f64; MODEL_FEATURES.len()] {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        [
            f64::from(features.hour),
            f64::from(features.weekday),
            f64::from(features.month),
            f64::from(features.day),
            flag(features.is_peak),
            flag(features.is_weekend),
            flag(features.is_high_traffic_day),
            flag(features.is_holiday_season),
            self.profiles.carrier_delay_rate(query.carrier()),
            self.profiles.airport_delay_rate(query.origin()),
            self.profiles.airport_delay_rate(query.destination()),
        ]
    }
}

impl DelayScorer for LinearDelayModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, query: &FlightQuery, features: &FeatureSet) -> Result<f64, ScorerError> {
        let logit = self
            .feature_vector(query, features)
            .iter()
            .zip(self.weights.iter())
            .fold(self.intercept, |acc, (x, w)| acc + x * w);
        check_probability(1.0 / (1.0 + (-logit).exp()))
    }

    /// Share of total absolute weight per non-zero feature.
    fn feature_importance(&self) -> Option<BTreeMap<String, f64>> {
        let total: f64 = self.weights.iter().map(|w| w.abs()).sum();
        if total == 0.0 {
            return None;
        }
        Some(
            MODEL_FEATURES
                .iter()
                .zip(self.weights.iter())
                .filter(|(_, w)| **w != 0.0)
                .map(|(name, w)| (name.to_string(), w.abs() / total))
                .collect(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unable to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model references unknown feature '{0}'")]
    UnknownFeature(String),
    #[error("model weight for '{0}' is not finite")]
    NonFiniteWeight(String),
}
