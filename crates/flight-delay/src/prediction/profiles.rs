//! Static carrier and airport delay history, loaded once and shared read-only.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PredictionConfig;

/// Rate used for any carrier or airport missing from the tables.
pub const DEFAULT_DELAY_RATE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub code: String,
    pub name: String,
    pub delay_rate: f64,
    pub on_time_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportProfile {
    pub code: String,
    pub name: String,
    pub city: String,
    pub delay_rate: f64,
}

/// How an origin/destination pair relates to the busy route list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Busy,
    ReverseOfBusy,
    Regular,
}

/// Immutable lookup tables consumed by the scorer and explainer.
#[derive(Debug, Clone)]
pub struct ProfileTables {
    version: String,
    carriers: BTreeMap<String, CarrierProfile>,
    airports: BTreeMap<String, AirportProfile>,
    busy_routes: BTreeSet<(String, String)>,
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl ProfileTables {
    pub fn new(
        version: impl Into<String>,
        carriers: Vec<CarrierProfile>,
        airports: Vec<AirportProfile>,
        busy_routes: Vec<(String, String)>,
    ) -> Result<Self, ProfileError> {
        let mut tables = Self {
            version: version.into(),
            carriers: BTreeMap::new(),
            airports: BTreeMap::new(),
            busy_routes: busy_routes
                .into_iter()
                .map(|(origin, destination)| (normalize_code(&origin), normalize_code(&destination)))
                .collect(),
        };
        tables.replace_carriers(carriers)?;
        tables.replace_airports(airports)?;
        Ok(tables)
    }

    /// Tables shipped with the engine.
    pub fn builtin() -> Self {
        let carriers = [
            ("CA", "中国国际航空", 0.18, 0.82),
            ("MU", "中国东方航空", 0.22, 0.78),
            ("CZ", "中国南方航空", 0.20, 0.80),
            ("HU", "海南航空", 0.25, 0.75),
            ("ZH", "深圳航空", 0.15, 0.85),
            ("MF", "厦门航空", 0.12, 0.88),
            ("HO", "吉祥航空", 0.14, 0.86),
            ("9C", "春秋航空", 0.28, 0.72),
            ("KN", "中国联合航空", 0.20, 0.80),
            ("GS", "天津航空", 0.23, 0.77),
        ]
        .into_iter()
        .map(|(code, name, delay_rate, on_time_rate)| {
            (
                code.to_string(),
                CarrierProfile {
                    code: code.to_string(),
                    name: name.to_string(),
                    delay_rate,
                    on_time_rate,
                },
            )
        })
        .collect();

        let airports = [
            ("PEK", "北京首都", "北京", 0.25),
            ("PVG", "上海浦东", "上海", 0.22),
            ("CAN", "广州白云", "广州", 0.20),
            ("SZX", "深圳宝安", "深圳", 0.18),
            ("CTU", "成都天府", "成都", 0.15),
            ("CKG", "重庆江北", "重庆", 0.17),
            ("XIY", "西安咸阳", "西安", 0.14),
            ("HGH", "杭州萧山", "杭州", 0.16),
            ("NKG", "南京禄口", "南京", 0.13),
            ("TAO", "青岛胶东", "青岛", 0.19),
        ]
        .into_iter()
        .map(|(code, name, city, delay_rate)| {
            (
                code.to_string(),
                AirportProfile {
                    code: code.to_string(),
                    name: name.to_string(),
                    city: city.to_string(),
                    delay_rate,
                },
            )
        })
        .collect();

        let busy_routes = [
            ("PEK", "PVG"),
            ("PEK", "CAN"),
            ("PVG", "CAN"),
            ("PEK", "SZX"),
            ("PVG", "CTU"),
        ]
        .into_iter()
        .map(|(origin, destination)| (origin.to_string(), destination.to_string()))
        .collect();

        Self {
            version: "builtin-2024".to_string(),
            carriers,
            airports,
            busy_routes,
        }
    }

    /// Built-in tables with any CSV overrides named in the configuration applied.
    pub fn load(config: &PredictionConfig) -> Result<Self, ProfileError> {
        let mut tables = Self::builtin();
        let mut overridden = false;

        if let Some(path) = &config.carrier_profiles {
            let rows = parse_carrier_rows(open(path)?)?;
            tables.replace_carriers(rows)?;
            overridden = true;
        }
        if let Some(path) = &config.airport_profiles {
            let rows = parse_airport_rows(open(path)?)?;
            tables.replace_airports(rows)?;
            overridden = true;
        }
        if overridden {
            tables.version = "custom".to_string();
        }

        tracing::info!(
            version = %tables.version,
            carriers = tables.carrier_count(),
            airports = tables.airport_count(),
            "profile tables loaded"
        );
        Ok(tables)
    }

    pub fn with_carriers_csv<R: Read>(mut self, reader: R) -> Result<Self, ProfileError> {
        let rows = parse_carrier_rows(reader)?;
        self.replace_carriers(rows)?;
        Ok(self)
    }

    pub fn with_airports_csv<R: Read>(mut self, reader: R) -> Result<Self, ProfileError> {
        let rows = parse_airport_rows(reader)?;
        self.replace_airports(rows)?;
        Ok(self)
    }

    fn replace_carriers(&mut self, rows: Vec<CarrierProfile>) -> Result<(), ProfileError> {
        let mut carriers = BTreeMap::new();
        for mut profile in rows {
            profile.code = checked_code(&profile.code)?;
            check_rate(&profile.code, profile.delay_rate)?;
            check_rate(&profile.code, profile.on_time_rate)?;
            carriers.insert(profile.code.clone(), profile);
        }
        self.carriers = carriers;
        Ok(())
    }

    fn replace_airports(&mut self, rows: Vec<AirportProfile>) -> Result<(), ProfileError> {
        let mut airports = BTreeMap::new();
        for mut profile in rows {
            profile.code = checked_code(&profile.code)?;
            check_rate(&profile.code, profile.delay_rate)?;
            airports.insert(profile.code.clone(), profile);
        }
        self.airports = airports;
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn carrier(&self, code: &str) -> Option<&CarrierProfile> {
        self.carriers.get(&normalize_code(code))
    }

    pub fn airport(&self, code: &str) -> Option<&AirportProfile> {
        self.airports.get(&normalize_code(code))
    }

    pub fn carrier_delay_rate(&self, code: &str) -> f64 {
        self.carrier(code)
            .map(|profile| profile.delay_rate)
            .unwrap_or(DEFAULT_DELAY_RATE)
    }

    pub fn airport_delay_rate(&self, code: &str) -> f64 {
        self.airport(code)
            .map(|profile| profile.delay_rate)
            .unwrap_or(DEFAULT_DELAY_RATE)
    }

    pub fn route_kind(&self, origin: &str, destination: &str) -> RouteKind {
        let origin = normalize_code(origin);
        let destination = normalize_code(destination);
        if self
            .busy_routes
            .contains(&(origin.clone(), destination.clone()))
        {
            RouteKind::Busy
        } else if self.busy_routes.contains(&(destination, origin)) {
            RouteKind::ReverseOfBusy
        } else {
            RouteKind::Regular
        }
    }

    /// Carriers ordered by code.
    pub fn carriers(&self) -> impl Iterator<Item = &CarrierProfile> {
        self.carriers.values()
    }

    /// Airports ordered by code.
    pub fn airports(&self) -> impl Iterator<Item = &AirportProfile> {
        self.airports.values()
    }

    pub fn busy_routes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.busy_routes
            .iter()
            .map(|(origin, destination)| (origin.as_str(), destination.as_str()))
    }

    pub fn carrier_count(&self) -> usize {
        self.carriers.len()
    }

    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }

    pub fn average_carrier_delay_rate(&self) -> Option<f64> {
        if self.carriers.is_empty() {
            return None;
        }
        let total: f64 = self.carriers.values().map(|profile| profile.delay_rate).sum();
        Some(total / self.carriers.len() as f64)
    }
}

fn checked_code(raw: &str) -> Result<String, ProfileError> {
    let code = normalize_code(raw);
    if code.is_empty() {
        Err(ProfileError::EmptyCode)
    } else {
        Ok(code)
    }
}

fn check_rate(code: &str, rate: f64) -> Result<(), ProfileError> {
    if rate.is_finite() && (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(ProfileError::RateOutOfRange {
            code: code.to_string(),
            rate,
        })
    }
}

fn open(path: &Path) -> Result<File, ProfileError> {
    File::open(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct CarrierRow {
    code: String,
    name: String,
    delay_rate: f64,
    #[serde(default)]
    on_time_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AirportRow {
    code: String,
    name: String,
    delay_rate: f64,
    #[serde(default)]
    city: Option<String>,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn parse_carrier_rows<R: Read>(reader: R) -> Result<Vec<CarrierProfile>, ProfileError> {
    let mut rows = Vec::new();
    for record in csv_reader(reader).deserialize::<CarrierRow>() {
        let row = record?;
        rows.push(CarrierProfile {
            on_time_rate: row.on_time_rate.unwrap_or(1.0 - row.delay_rate),
            code: row.code,
            name: row.name,
            delay_rate: row.delay_rate,
        });
    }
    Ok(rows)
}

fn parse_airport_rows<R: Read>(reader: R) -> Result<Vec<AirportProfile>, ProfileError> {
    let mut rows = Vec::new();
    for record in csv_reader(reader).deserialize::<AirportRow>() {
        let row = record?;
        rows.push(AirportProfile {
            code: row.code,
            name: row.name,
            city: row.city.unwrap_or_default(),
            delay_rate: row.delay_rate,
        });
    }
    Ok(rows)
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unable to read profile table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed profile table: {0}")]
    Csv(#[from] csv::Error),
    #[error("profile row is missing a code")]
    EmptyCode,
    #[error("delay rate {rate} for {code} is outside [0, 1]")]
    RateOutOfRange { code: String, rate: f64 },
}
