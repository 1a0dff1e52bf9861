//! Runtime configuration parsed from environment variables.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
pub const DEFAULT_COURSES_DIR: &str = "./data/courses";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared secret expected in the `X-API-Key` header on admin routes.
    pub admin_api_key: String,
    /// Lifetime of learner bearer tokens.
    pub session_ttl_secs: u64,
    /// Root directory for uploaded course material.
    pub courses_dir: String,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    /// - `ADMIN_API_KEY` (the admin surface refuses to start without one)
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `SESSION_TTL_SECS`: default 86400
    /// - `COURSES_DIR`: default `./data/courses`
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is absent or a numeric
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;
        let admin_api_key = std::env::var("ADMIN_API_KEY").map_err(|_| ConfigError::MissingVar("ADMIN_API_KEY"))?;
        if admin_api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue { var: "ADMIN_API_KEY", value: admin_api_key });
        }

        let port = env_parse_or("PORT", DEFAULT_PORT)?;
        let session_ttl_secs = env_parse_or("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        let courses_dir = std::env::var("COURSES_DIR").unwrap_or_else(|_| DEFAULT_COURSES_DIR.to_string());

        Ok(Self { database_url, port, admin_api_key, session_ttl_secs, courses_dir })
    }
}

fn env_parse_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(var) {
        Ok(raw) => parse_value(var, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    raw.parse::<T>()
        .map_err(|_| ConfigError::InvalidValue { var, value: raw.to_string() })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
