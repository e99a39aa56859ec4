//! Flight delay risk scoring.
//!
//! A raw [`FlightRequest`] is validated into a [`FlightQuery`], reduced to a [`FeatureSet`],
//! scored by a [`DelayScorer`], discretized into a [`RiskLevel`], and explained as a ranked list
//! of [`RiskFactor`]s. Static carrier and airport history lives in [`ProfileTables`]; live
//! upstream signals are optional and reach the engine through [`ContextGatherer`].

pub mod advice;
pub mod classify;
pub mod domain;
pub mod engine;
pub(crate) mod explain;
pub mod features;
pub mod profiles;
pub mod router;
pub mod scoring;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod tests;

pub use advice::advise;
pub use classify::{classify, DelayWindow, RiskAssessment, RiskLevel};
pub use domain::{
    AirportInfo, CarrierInfo, FactorCategory, FlightQuery, FlightRequest, ModelUsed,
    PredictionError, PredictionReport, PredictionResult, RiskFactor, RouteInfo,
};
pub use engine::{default_prediction, EngineStatistics, PredictionEngine};
pub use explain::FactorExplainer;
pub use features::{extract_features, parse_departure, FeatureSet, TravelSeason};
pub use profiles::{
    AirportProfile, CarrierProfile, ProfileError, ProfileTables, RouteKind, DEFAULT_DELAY_RATE,
};
pub use router::prediction_router;
pub use scoring::{
    DelayScorer, LinearDelayModel, ModelError, RuleBasedScorer, ScoreBreakdown, ScoreFactor,
    ScorerError, ScoringWeights,
};
pub use service::PredictionService;
pub use upstream::{
    ContextGatherer, FlightStatusSnapshot, UpstreamContext, UpstreamContextProvider,
    UpstreamError, UpstreamSignal,
};
