use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::domain::FlightQuery;
use crate::config::DelayEstimateMode;

/// Ordered delay severity buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Thresholds are lower-inclusive: exactly 0.2 is `Low`, exactly 0.8 is `VeryHigh`.
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.2 {
            Self::VeryLow
        } else if probability < 0.4 {
            Self::Low
        } else if probability < 0.6 {
            Self::Medium
        } else if probability < 0.8 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "极低",
            RiskLevel::Low => "低",
            RiskLevel::Medium => "中",
            RiskLevel::High => "高",
            RiskLevel::VeryHigh => "极高",
        }
    }

    pub const fn delay_window(self) -> DelayWindow {
        match self {
            RiskLevel::VeryLow | RiskLevel::Low => DelayWindow {
                min_minutes: 0,
                max_minutes: 15,
            },
            RiskLevel::Medium => DelayWindow {
                min_minutes: 15,
                max_minutes: 45,
            },
            RiskLevel::High | RiskLevel::VeryHigh => DelayWindow {
                min_minutes: 45,
                max_minutes: 120,
            },
        }
    }

    pub const fn confidence(self) -> f64 {
        match self {
            RiskLevel::VeryLow | RiskLevel::Low => 0.9,
            RiskLevel::Medium => 0.8,
            RiskLevel::High | RiskLevel::VeryHigh => 0.7,
        }
    }
}

/// Half-open minute range `[min_minutes, max_minutes)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayWindow {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl DelayWindow {
    pub const fn midpoint(self) -> u32 {
        (self.min_minutes + self.max_minutes) / 2
    }

    pub const fn contains(self, minutes: u32) -> bool {
        minutes >= self.min_minutes && minutes < self.max_minutes
    }
}

/// Discretized view of a probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub delay_window: DelayWindow,
    pub estimated_delay_minutes: u32,
    pub confidence: f64,
}

pub fn classify(probability: f64, query: &FlightQuery, mode: DelayEstimateMode) -> RiskAssessment {
    let level = RiskLevel::from_probability(probability);
    let delay_window = level.delay_window();
    RiskAssessment {
        level,
        delay_window,
        estimated_delay_minutes: estimate_minutes(delay_window, query, mode),
        confidence: level.confidence(),
    }
}

fn estimate_minutes(window: DelayWindow, query: &FlightQuery, mode: DelayEstimateMode) -> u32 {
    match mode {
        DelayEstimateMode::Midpoint => window.midpoint(),
        DelayEstimateMode::Seeded => {
            let mut hasher = DefaultHasher::new();
            query.hash(&mut hasher);
            let span = u64::from(window.max_minutes - window.min_minutes);
            // span is at most 75, so the remainder fits in u32
            window.min_minutes + (hasher.finish() % span) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::FlightRequest;

    fn query(flight_number: &str) -> FlightQuery {
        FlightQuery::parse(&FlightRequest {
            carrier: "MU".to_string(),
            flight_number: flight_number.to_string(),
            origin: "PVG".to_string(),
            destination: "CAN".to_string(),
            departure_date: "2024-08-09".to_string(),
            departure_time: "17:40".to_string(),
        })
        .expect("valid query")
    }

    #[test]
    fn boundaries_belong_to_the_higher_bucket() {
        assert_eq!(RiskLevel::from_probability(0.05), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_probability(0.1999), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_probability(0.2), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.8), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_probability(0.95), RiskLevel::VeryHigh);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RiskLevel::VeryLow < RiskLevel::Low);
        assert!(RiskLevel::High < RiskLevel::VeryHigh);
    }

    #[test]
    fn windows_and_confidence_follow_level() {
        let low = classify(0.34, &query("MU5301"), DelayEstimateMode::Midpoint);
        assert_eq!(low.level, RiskLevel::Low);
        assert_eq!(low.delay_window, DelayWindow { min_minutes: 0, max_minutes: 15 });
        assert_eq!(low.estimated_delay_minutes, 7);
        assert_eq!(low.confidence, 0.9);

        let medium = classify(0.5, &query("MU5301"), DelayEstimateMode::Midpoint);
        assert_eq!(medium.estimated_delay_minutes, 30);
        assert_eq!(medium.confidence, 0.8);

        let very_high = classify(0.9, &query("MU5301"), DelayEstimateMode::Midpoint);
        assert_eq!(very_high.estimated_delay_minutes, 82);
        assert_eq!(very_high.confidence, 0.7);
    }

    #[test]
    fn seeded_estimate_is_reproducible_and_in_window() {
        for flight in ["MU5301", "MU5302", "MU5303", "MU5304"] {
            let q = query(flight);
            let first = classify(0.7, &q, DelayEstimateMode::Seeded);
            let second = classify(0.7, &q, DelayEstimateMode::Seeded);
            assert_eq!(first.estimated_delay_minutes, second.estimated_delay_minutes);
            assert!(first.delay_window.contains(first.estimated_delay_minutes));
        }
    }
}
