use std::env;
use std::fmt;
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
    pub registration: RegistrationConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let data_dir = env::var("REGISTRATION_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let default_capacity = env::var("REGISTRATION_DEFAULT_CAPACITY")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidCapacity)?;
        if default_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }

        let noreply_address =
            env::var("REGISTRATION_NOREPLY").unwrap_or_else(|_| "noreply@localhost".to_string());

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            registration: RegistrationConfig {
                data_dir,
                default_capacity,
                noreply_address,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Settings for the registration reconciliation run.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Directory holding the CSV-backed ledger tables.
    pub data_dir: PathBuf,
    /// Seat cap applied to classes whose catalog row omits one.
    pub default_capacity: usize,
    /// Sender address stamped on outbound notifications.
    pub noreply_address: String,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCapacity => {
                write!(f, "REGISTRATION_DEFAULT_CAPACITY must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("REGISTRATION_DATA_DIR");
        env::remove_var("REGISTRATION_DEFAULT_CAPACITY");
        env::remove_var("REGISTRATION_NOREPLY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.registration.data_dir, PathBuf::from("./data"));
        assert_eq!(config.registration.default_capacity, 15);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn rejects_zero_capacity() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REGISTRATION_DEFAULT_CAPACITY", "0");
        let result = AppConfig::load();
        assert!(matches!(result, Err(ConfigError::InvalidCapacity)));
        reset_env();
    }

    #[test]
    fn recognizes_production_environment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        reset_env();
    }
}
