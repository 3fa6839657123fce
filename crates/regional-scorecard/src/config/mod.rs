use crate::scoring::coefficients::parse_assignment;
use crate::scoring::{CoefficientMap, DEFAULT_POPULATION};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub scoring: ScoringSettings,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringSettings::from_env()?,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where batch inputs live and how activities are weighted by default.
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions_dir: Option<PathBuf>,
    pub default_population: u64,
    /// Defaults merged with `SCORECARD_COEFFICIENTS` overrides.
    pub coefficients: CoefficientMap,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output_csv"),
            extensions_dir: None,
            default_population: DEFAULT_POPULATION,
            coefficients: CoefficientMap::defaults(),
        }
    }
}

impl ScoringSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(dir) = non_empty_var("SCORECARD_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_var("SCORECARD_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }
        settings.extensions_dir = non_empty_var("SCORECARD_EXTENSIONS_DIR").map(PathBuf::from);

        if let Some(raw) = non_empty_var("SCORECARD_DEFAULT_POPULATION") {
            settings.default_population = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|population| *population > 0)
                .ok_or(ConfigError::InvalidPopulation)?;
        }

        if let Some(raw) = non_empty_var("SCORECARD_COEFFICIENTS") {
            settings.apply_overrides(raw.split(',').filter(|part| !part.trim().is_empty()))?;
        }

        Ok(settings)
    }

    /// Applies `key=value` overrides on top of the current coefficients.
    pub fn apply_overrides<'a, I>(&mut self, assignments: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for raw in assignments {
            let (key, value) = parse_assignment(raw).map_err(|reason| {
                ConfigError::InvalidCoefficient {
                    value: raw.trim().to_string(),
                    reason,
                }
            })?;
            self.coefficients.insert(key, value);
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCoefficient { value: String, reason: String },
    InvalidPopulation,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCoefficient { value, reason } => {
                write!(f, "invalid coefficient override '{value}': {reason}")
            }
            ConfigError::InvalidPopulation => {
                write!(f, "SCORECARD_DEFAULT_POPULATION must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCoefficient { .. }
            | ConfigError::InvalidPopulation => None,
        }
    }
}
