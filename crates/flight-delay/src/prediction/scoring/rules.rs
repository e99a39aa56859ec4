use super::super::domain::FlightQuery;
use super::super::features::{FeatureSet, TravelSeason};
use super::super::profiles::{ProfileTables, RouteKind};
use super::config::ScoringWeights;
use super::{FactorContribution, ScoreBreakdown, ScoreFactor};

pub(crate) const MORNING_PEAK_BONUS: f64 = 0.25;
pub(crate) const EVENING_PEAK_BONUS: f64 = 0.20;
pub(crate) const HIGH_TRAFFIC_DAY_BONUS: f64 = 0.15;
pub(crate) const OVERNIGHT_CREDIT: f64 = -0.10;

pub(crate) fn carrier_factor(profiles: &ProfileTables, carrier: &str) -> f64 {
    profiles.carrier_delay_rate(carrier)
}

pub(crate) fn airport_factor(profiles: &ProfileTables, origin: &str, destination: &str) -> f64 {
    (profiles.airport_delay_rate(origin) + profiles.airport_delay_rate(destination)) / 2.0
}

/// Sum of the time-of-day sub-terms, before weighting.
pub(crate) fn time_factor(features: &FeatureSet) -> f64 {
    let mut factor = 0.0;

    if features.is_morning_peak() {
        factor += MORNING_PEAK_BONUS;
    } else if features.is_evening_peak() {
        factor += EVENING_PEAK_BONUS;
    }

    if features.is_high_traffic_day {
        factor += HIGH_TRAFFIC_DAY_BONUS;
    }

    if features.is_overnight() {
        factor += OVERNIGHT_CREDIT;
    }

    factor
}

pub(crate) fn season_factor(season: Option<TravelSeason>) -> f64 {
    match season {
        Some(TravelSeason::SpringFestival) => 0.20,
        Some(TravelSeason::Summer) => 0.15,
        Some(TravelSeason::GoldenWeek) => 0.25,
        Some(TravelSeason::LabourDay) => 0.20,
        None => 0.0,
    }
}

pub(crate) fn route_factor(kind: RouteKind) -> f64 {
    match kind {
        RouteKind::Busy => 0.15,
        RouteKind::ReverseOfBusy => 0.10,
        RouteKind::Regular => 0.05,
    }
}

pub(crate) fn score_query(
    profiles: &ProfileTables,
    weights: &ScoringWeights,
    query: &FlightQuery,
    features: &FeatureSet,
) -> ScoreBreakdown {
    let raw_factors = [
        (
            ScoreFactor::Carrier,
            carrier_factor(profiles, query.carrier()),
            weights.carrier,
        ),
        (
            ScoreFactor::Airport,
            airport_factor(profiles, query.origin(), query.destination()),
            weights.airport,
        ),
        (
            ScoreFactor::TimeOfDay,
            time_factor(features),
            weights.time_of_day,
        ),
        (
            ScoreFactor::Season,
            season_factor(features.season),
            weights.season,
        ),
        (
            ScoreFactor::Route,
            route_factor(profiles.route_kind(query.origin(), query.destination())),
            weights.route,
        ),
    ];

    let components: Vec<FactorContribution> = raw_factors
        .into_iter()
        .map(|(factor, raw, weight)| FactorContribution {
            factor,
            raw,
            weight,
            contribution: raw * weight,
        })
        .collect();

    let unclamped = weights.base_probability
        + components
            .iter()
            .map(|component| component.contribution)
            .sum::<f64>();

    ScoreBreakdown {
        base_probability: weights.base_probability,
        components,
        unclamped,
        probability: weights.clamp(unclamped),
    }
}
