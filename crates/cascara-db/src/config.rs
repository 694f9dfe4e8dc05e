use std::time::Duration;

use cascara_core::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Connection-pool settings for the Postgres-backed stores.
///
/// Every running job worker holds connections for claim/update round trips,
/// so the pool is sized and the acquire timeout bounded rather than left at
/// sqlx defaults.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (required)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    /// - `DATABASE_ACQUIRE_TIMEOUT_SECS` (optional, defaults to 10)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("DATABASE_MAX_CONNECTIONS").ok(),
            std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS").ok(),
        )
    }

    fn from_vars(
        url: Option<String>,
        max_connections: Option<String>,
        acquire_timeout_secs: Option<String>,
    ) -> Result<Self, AppError> {
        let url = url.ok_or_else(|| {
            AppError::ConfigError("DATABASE_URL not set. Required for database operations.".into())
        })?;

        let max_connections = match max_connections {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => u32::try_from(parse_positive("DATABASE_MAX_CONNECTIONS", &raw)?)
                .map_err(|_| {
                    AppError::ConfigError(format!("DATABASE_MAX_CONNECTIONS '{raw}' is too large"))
                })?,
        };

        let acquire_timeout_secs = match acquire_timeout_secs {
            None => DEFAULT_ACQUIRE_TIMEOUT_SECS,
            Some(raw) => parse_positive("DATABASE_ACQUIRE_TIMEOUT_SECS", &raw)?,
        };

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        })
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, AppError> {
    let parsed: u64 = raw.parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {name} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}
