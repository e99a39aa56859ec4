use std::sync::Arc;

use super::domain::{FactorCategory, FlightQuery, RiskFactor};
use super::features::FeatureSet;
use super::profiles::ProfileTables;
use super::scoring::rules::{self, EVENING_PEAK_BONUS, MORNING_PEAK_BONUS};
use super::scoring::ScoringWeights;
use super::upstream::UpstreamContext;

/// Profile rates above this produce an explanation entry.
const NOTABLE_RATE: f64 = 0.25;
/// Weather impact at or above this produces an explanation entry.
const NOTABLE_WEATHER_IMPACT: f64 = 0.3;
const HIGH_TRAFFIC_DAY_MAGNITUDE: f64 = 0.03;
const MIN_FACTORS: usize = 2;

/// Builds the ranked, human-readable list of risk factors for a query.
#[derive(Debug, Clone)]
pub struct FactorExplainer {
    profiles: Arc<ProfileTables>,
    weights: ScoringWeights,
}

impl FactorExplainer {
    pub fn new(profiles: Arc<ProfileTables>, weights: ScoringWeights) -> Self {
        Self { profiles, weights }
    }

    /// Factors sorted by descending magnitude. Never empty: when fewer than two notes apply a
    /// baseline entry is appended.
    pub fn explain(
        &self,
        query: &FlightQuery,
        features: &FeatureSet,
        context: Option<&UpstreamContext>,
    ) -> Vec<RiskFactor> {
        let mut factors = Vec::new();

        if let Some(carrier) = self.profiles.carrier(query.carrier()) {
            if carrier.delay_rate > NOTABLE_RATE {
                factors.push(RiskFactor {
                    category: FactorCategory::Carrier,
                    magnitude: carrier.delay_rate * self.weights.carrier,
                    description: format!("{}历史延误率较高", carrier.name),
                });
            }
        }

        let airport_share = self.weights.airport / 2.0;
        if let Some(origin) = self.profiles.airport(query.origin()) {
            if origin.delay_rate > NOTABLE_RATE {
                factors.push(RiskFactor {
                    category: FactorCategory::OriginAirport,
                    magnitude: origin.delay_rate * airport_share,
                    description: format!("{}是繁忙机场", origin.name),
                });
            }
        }
        if let Some(destination) = self.profiles.airport(query.destination()) {
            if destination.delay_rate > NOTABLE_RATE {
                factors.push(RiskFactor {
                    category: FactorCategory::DestinationAirport,
                    magnitude: destination.delay_rate * airport_share,
                    description: format!("{}到达延误风险高", destination.name),
                });
            }
        }

        if features.is_morning_peak() {
            factors.push(RiskFactor {
                category: FactorCategory::TimeOfDay,
                magnitude: MORNING_PEAK_BONUS * self.weights.time_of_day,
                description: "早高峰时段".to_string(),
            });
        } else if features.is_evening_peak() {
            factors.push(RiskFactor {
                category: FactorCategory::TimeOfDay,
                magnitude: EVENING_PEAK_BONUS * self.weights.time_of_day,
                description: "晚高峰时段".to_string(),
            });
        }

        if let Some(season) = features.season {
            factors.push(RiskFactor {
                category: FactorCategory::Season,
                magnitude: rules::season_factor(Some(season)) * self.weights.season,
                description: season.label().to_string(),
            });
        }

        if features.is_high_traffic_day {
            factors.push(RiskFactor {
                category: FactorCategory::Weekend,
                magnitude: HIGH_TRAFFIC_DAY_MAGNITUDE,
                description: "周末客流较大".to_string(),
            });
        }

        if let Some(context) = context {
            self.explain_context(query, context, &mut factors);
        }

        // stable, so equal magnitudes keep insertion order
        factors.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));

        if factors.len() < MIN_FACTORS {
            factors.push(RiskFactor {
                category: FactorCategory::Baseline,
                magnitude: 0.0,
                description: "常规运行条件下".to_string(),
            });
        }

        factors
    }

    fn explain_context(
        &self,
        query: &FlightQuery,
        context: &UpstreamContext,
        factors: &mut Vec<RiskFactor>,
    ) {
        let airport_share = self.weights.airport / 2.0;
        let weather = [
            (query.origin(), context.origin_weather_impact, "出发地"),
            (query.destination(), context.destination_weather_impact, "目的地"),
        ];
        for (code, impact, side) in weather {
            if impact >= NOTABLE_WEATHER_IMPACT {
                let name = self
                    .profiles
                    .airport(code)
                    .map(|airport| airport.name.as_str())
                    .unwrap_or(code);
                factors.push(RiskFactor {
                    category: FactorCategory::Weather,
                    magnitude: impact * airport_share,
                    description: format!("{side}{name}天气影响较大"),
                });
            }
        }

        if let Some(status) = &context.flight_status {
            if status.delay_minutes > 0 {
                let share = (f64::from(status.delay_minutes) / 120.0).min(1.0);
                factors.push(RiskFactor {
                    category: FactorCategory::LiveStatus,
                    magnitude: share * self.weights.time_of_day,
                    description: format!("航班当前已延误{}分钟", status.delay_minutes),
                });
            }
        }
    }
}
