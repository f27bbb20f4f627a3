//! Process-wide tracing for reconciliation runs.
//!
//! Operators read run logs after the fact, so production and test output is
//! plain compact text; development keeps the pretty human formatter. The
//! filter comes from `RUST_LOG` when set, otherwise from the configured
//! level.

use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directive: String, source: ParseError },
    Init(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "invalid log filter directive '{directive}'")
            }
            TelemetryError::Init(err) => write!(f, "tracing setup failed: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Init(err) => Some(&**err),
        }
    }
}

pub fn init(environment: AppEnvironment, config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_from(config)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match environment {
        AppEnvironment::Development => builder.pretty().try_init(),
        AppEnvironment::Test | AppEnvironment::Production => {
            builder.compact().with_ansi(false).try_init()
        }
    }
    .map_err(TelemetryError::Init)
}

fn filter_from(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}
