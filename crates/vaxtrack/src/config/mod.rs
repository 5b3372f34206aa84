use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::vaccination::SchedulingPolicy;

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
    pub storage: StorageConfig,
    pub scheduling: SchedulingConfig,
    pub admin: AdminConfig,
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

        let data_path = match env::var("APP_DATA_PATH") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value.trim())),
            Err(_) => Some(PathBuf::from(StorageConfig::DEFAULT_FILE)),
        };

        let drive_lead_days = match env::var("APP_DRIVE_LEAD_DAYS") {
            Ok(value) => match value.trim().parse::<i64>() {
                Ok(days) if (0..=SchedulingPolicy::MAX_LEAD_DAYS).contains(&days) => days,
                _ => return Err(ConfigError::InvalidLeadDays { value }),
            },
            Err(_) => SchedulingPolicy::DEFAULT_LEAD_DAYS,
        };

        let username = env::var("APP_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let password = env::var("APP_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig { data_path },
            scheduling: SchedulingConfig { drive_lead_days },
            admin: AdminConfig { username, password },
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

/// Where the entity snapshot lives. `None` keeps everything in memory.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_path: Option<PathBuf>,
}

impl StorageConfig {
    pub const DEFAULT_FILE: &'static str = "vaccination.json";
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulingConfig {
    pub drive_lead_days: i64,
}

impl SchedulingConfig {
    pub fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::new(self.drive_lead_days)
    }
}

/// Single administrator credential accepted by the login endpoint.
#[derive(Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl AdminConfig {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLeadDays { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLeadDays { value } => write!(
                f,
                "APP_DRIVE_LEAD_DAYS must be a number of days between 0 and {}, got '{}'",
                SchedulingPolicy::MAX_LEAD_DAYS,
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidLeadDays { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
