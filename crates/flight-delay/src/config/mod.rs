use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub prediction: PredictionConfig,
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let prediction = PredictionConfig {
            carrier_profiles: optional_path("PREDICTION_CARRIER_PROFILES"),
            airport_profiles: optional_path("PREDICTION_AIRPORT_PROFILES"),
            model_path: optional_path("PREDICTION_MODEL_PATH"),
            delay_estimate: DelayEstimateMode::from_str(
                &env::var("PREDICTION_DELAY_ESTIMATE").unwrap_or_else(|_| "midpoint".to_string()),
            ),
        };

        let upstream = UpstreamConfig {
            flight_api_url: optional_string("UPSTREAM_FLIGHT_API_URL"),
            weather_api_url: optional_string("UPSTREAM_WEATHER_API_URL"),
            timeout: Duration::from_millis(numeric("UPSTREAM_TIMEOUT_MS", 2_000)?),
            status_ttl: Duration::from_secs(numeric("UPSTREAM_STATUS_TTL_SECS", 300)?),
            weather_ttl: Duration::from_secs(numeric("UPSTREAM_WEATHER_TTL_SECS", 300)?),
            stats_ttl: Duration::from_secs(numeric("UPSTREAM_STATS_TTL_SECS", 300)?),
            history_days: numeric("UPSTREAM_HISTORY_DAYS", 30)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            prediction,
            upstream,
        })
    }
}

fn optional_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn optional_path(key: &str) -> Option<PathBuf> {
    optional_string(key).map(PathBuf::from)
}

fn numeric<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_string(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Where the engine sources its profile tables and optional learned model.
#[derive(Debug, Clone, Default)]
pub struct PredictionConfig {
    pub carrier_profiles: Option<PathBuf>,
    pub airport_profiles: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub delay_estimate: DelayEstimateMode,
}

/// How a representative delay is picked inside a risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayEstimateMode {
    /// Always the bucket midpoint.
    #[default]
    Midpoint,
    /// A value inside the bucket derived from a hash of the query.
    Seeded,
}

impl DelayEstimateMode {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "seeded" | "hash" => Self::Seeded,
            _ => Self::Midpoint,
        }
    }
}

/// Upstream provider endpoints plus the cache and timeout policy applied to them.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub flight_api_url: Option<String>,
    pub weather_api_url: Option<String>,
    pub timeout: Duration,
    pub status_ttl: Duration,
    pub weather_ttl: Duration,
    pub stats_ttl: Duration,
    pub history_days: u32,
}

impl UpstreamConfig {
    pub fn enabled(&self) -> bool {
        self.flight_api_url.is_some()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            flight_api_url: None,
            weather_api_url: None,
            timeout: Duration::from_millis(2_000),
            status_ttl: Duration::from_secs(300),
            weather_ttl: Duration::from_secs(300),
            stats_ttl: Duration::from_secs(300),
            history_days: 30,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
