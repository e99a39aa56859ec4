use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::domain::{FlightQuery, PredictionError};

/// Holiday travel windows, in the order they are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelSeason {
    /// January and February.
    SpringFestival,
    /// July and August.
    Summer,
    /// October 1-7.
    GoldenWeek,
    /// May 1-5.
    LabourDay,
}

impl TravelSeason {
    pub fn from_month_day(month: u32, day: u32) -> Option<Self> {
        match (month, day) {
            (1 | 2, _) => Some(Self::SpringFestival),
            (7 | 8, _) => Some(Self::Summer),
            (10, 1..=7) => Some(Self::GoldenWeek),
            (5, 1..=5) => Some(Self::LabourDay),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TravelSeason::SpringFestival => "春运期间",
            TravelSeason::Summer => "暑运期间",
            TravelSeason::GoldenWeek => "国庆黄金周",
            TravelSeason::LabourDay => "五一假期",
        }
    }
}

/// Structured signals derived from a departure timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
    pub month: u32,
    pub day: u32,
    pub is_peak: bool,
    /// Saturday or Sunday.
    pub is_weekend: bool,
    /// Friday through Sunday; weighted separately from `is_weekend` by the scorer.
    pub is_high_traffic_day: bool,
    pub is_holiday_season: bool,
    pub season: Option<TravelSeason>,
}

impl FeatureSet {
    pub fn from_departure(departure: NaiveDateTime) -> Self {
        let hour = departure.hour();
        let weekday = departure.weekday().num_days_from_monday();
        let month = departure.month();
        let day = departure.day();
        let season = TravelSeason::from_month_day(month, day);

        Self {
            hour,
            weekday,
            month,
            day,
            is_peak: is_morning_peak(hour) || is_evening_peak(hour),
            is_weekend: weekday >= 5,
            is_high_traffic_day: weekday >= 4,
            is_holiday_season: season.is_some(),
            season,
        }
    }

    pub fn extract(query: &FlightQuery) -> Self {
        Self::from_departure(query.departure())
    }

    pub fn is_morning_peak(&self) -> bool {
        is_morning_peak(self.hour)
    }

    pub fn is_evening_peak(&self) -> bool {
        is_evening_peak(self.hour)
    }

    pub fn is_overnight(&self) -> bool {
        self.hour <= 5
    }
}

fn is_morning_peak(hour: u32) -> bool {
    (7..=9).contains(&hour)
}

fn is_evening_peak(hour: u32) -> bool {
    (17..=19).contains(&hour)
}

/// Combine a `YYYY-MM-DD` date and an `HH:MM[:SS]` clock time into one timestamp.
pub fn parse_departure(date: &str, time: &str) -> Result<NaiveDateTime, PredictionError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|err| {
        PredictionError::invalid("departure_date", format!("'{date}' is not YYYY-MM-DD ({err})"))
    })?;

    let trimmed = time.trim();
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|err| {
            PredictionError::invalid("departure_time", format!("'{time}' is not HH:MM ({err})"))
        })?;

    Ok(NaiveDateTime::new(date, time))
}

/// Parse and extract in one step.
pub fn extract_features(date: &str, time: &str) -> Result<FeatureSet, PredictionError> {
    parse_departure(date, time).map(FeatureSet::from_departure)
}
