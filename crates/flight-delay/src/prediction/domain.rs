use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::classify::{DelayWindow, RiskLevel};
use super::features::parse_departure;
use super::upstream::UpstreamContext;

/// Raw query as submitted by a caller; dates and times are still text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRequest {
    #[serde(alias = "airline")]
    pub carrier: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`
    pub departure_date: String,
    /// `HH:MM`, seconds optional
    pub departure_time: String,
}

/// Validated flight query with normalized codes and a single departure timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlightQuery {
    carrier: String,
    flight_number: String,
    origin: String,
    destination: String,
    departure: NaiveDateTime,
}

const MAX_CODE_LEN: usize = 4;
const MAX_FLIGHT_NUMBER_LEN: usize = 10;

impl FlightQuery {
    pub fn new(
        carrier: &str,
        flight_number: &str,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        departure_time: NaiveTime,
    ) -> Result<Self, PredictionError> {
        Ok(Self {
            carrier: validate_code("carrier", carrier, MAX_CODE_LEN)?,
            flight_number: validate_code("flight_number", flight_number, MAX_FLIGHT_NUMBER_LEN)?,
            origin: validate_code("origin", origin, MAX_CODE_LEN)?,
            destination: validate_code("destination", destination, MAX_CODE_LEN)?,
            departure: NaiveDateTime::new(departure_date, departure_time),
        })
    }

    pub fn parse(request: &FlightRequest) -> Result<Self, PredictionError> {
        let departure = parse_departure(&request.departure_date, &request.departure_time)?;
        Self::new(
            &request.carrier,
            &request.flight_number,
            &request.origin,
            &request.destination,
            departure.date(),
            departure.time(),
        )
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn departure(&self) -> NaiveDateTime {
        self.departure
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure.date()
    }
}

impl TryFrom<&FlightRequest> for FlightQuery {
    type Error = PredictionError;

    fn try_from(request: &FlightRequest) -> Result<Self, Self::Error> {
        Self::parse(request)
    }
}

fn validate_code(field: &'static str, raw: &str, max_len: usize) -> Result<String, PredictionError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(PredictionError::invalid(field, "must not be empty"));
    }
    if code.len() > max_len {
        return Err(PredictionError::invalid(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PredictionError::invalid(field, "must be alphanumeric"));
    }
    Ok(code)
}

/// The only error surfaced to callers of the prediction engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl PredictionError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Broad grouping of an explanation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Carrier,
    OriginAirport,
    DestinationAirport,
    TimeOfDay,
    Season,
    Weekend,
    Weather,
    LiveStatus,
    Baseline,
    InsufficientData,
}

/// One ranked entry in a prediction's explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: FactorCategory,
    pub magnitude: f64,
    pub description: String,
}

/// Which scoring path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelUsed {
    Learned,
    RuleBased,
    Default,
}

impl ModelUsed {
    pub const fn label(self) -> &'static str {
        match self {
            ModelUsed::Learned => "learned",
            ModelUsed::RuleBased => "rule-based",
            ModelUsed::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierInfo {
    pub code: String,
    pub name: String,
    pub historical_delay_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportInfo {
    pub code: String,
    pub name: String,
    pub delay_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub origin: AirportInfo,
    pub destination: AirportInfo,
}

/// Uniform engine output; owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub delay_probability: f64,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub estimated_delay_minutes: u32,
    pub delay_window: DelayWindow,
    pub confidence: f64,
    pub factors: Vec<RiskFactor>,
    pub carrier_info: CarrierInfo,
    pub route_info: RouteInfo,
    pub model_used: ModelUsed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<BTreeMap<String, f64>>,
}

/// Prediction plus the advice and upstream context returned by the service facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub prediction: PredictionResult,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<UpstreamContext>,
}
