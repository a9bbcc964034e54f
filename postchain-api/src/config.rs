/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file picked
/// up in development.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `APP_ENV`: `production` enables secure cookies and HSTS (default: development)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: none). Listed
///   origins may send the `jwt` cookie; `*` allows any origin without credentials
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `JWT_EXPIRES_IN_DAYS`: Token lifetime (default: 90)
/// - `JWT_COOKIE_EXPIRES_IN_DAYS`: Cookie lifetime (default: 90)
/// - `RATE_LIMIT_MAX`: Requests per client per window on `/api` (default: 100)
/// - `RATE_LIMIT_WINDOW_SECS`: Rate limit window (default: 3600)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for text
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use postchain_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Minimum length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Accepted range for token and cookie lifetimes, in days
pub const LIFETIME_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Rate limiting on `/api`
    pub rate_limit: RateLimitConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Running in production
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing key
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in days
    pub expires_in_days: i64,

    /// `jwt` cookie lifetime in days
    pub cookie_expires_in_days: i64,
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or values are
    /// malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let expires_in_days = lifetime_days(&lookup, "JWT_EXPIRES_IN_DAYS")?;
        let cookie_expires_in_days = lifetime_days(&lookup, "JWT_COOKIE_EXPIRES_IN_DAYS")?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
                production: lookup("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
                cors_origins,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_days,
                cookie_expires_in_days,
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_or(&lookup, "RATE_LIMIT_MAX", 100)?,
                window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 3600)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn lifetime_days<F>(lookup: &F, key: &str) -> anyhow::Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let days = parse_or(lookup, key, 90)?;
    if !LIFETIME_DAYS_RANGE.contains(&days) {
        anyhow::bail!(
            "{} must be between {} and {} days",
            key,
            LIFETIME_DAYS_RANGE.start(),
            LIFETIME_DAYS_RANGE.end()
        );
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", SECRET), ("DATABASE_URL", "postgresql://localhost/test")]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(!config.api.production);
        assert!(config.api.cors_origins.is_empty());
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.expires_in_days, 90);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 3600);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("APP_ENV", "production"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("JWT_EXPIRES_IN_DAYS", "7"),
            ("RATE_LIMIT_MAX", "5"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert!(config.api.production);
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.jwt.expires_in_days, 7);
        assert_eq!(config.rate_limit.max_requests, 5);
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = load(&[("JWT_SECRET", "short"), ("DATABASE_URL", "postgresql://localhost/test")]).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_missing_database_url() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
    }

    #[test]
    fn test_malformed_number() {
        let err = load(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("API_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("API_PORT"));
    }

    #[test]
    fn test_lifetime_out_of_range() {
        for (key, raw) in [
            ("JWT_EXPIRES_IN_DAYS", "1000000000000000"),
            ("JWT_EXPIRES_IN_DAYS", "-1"),
            ("JWT_COOKIE_EXPIRES_IN_DAYS", "0"),
            ("JWT_COOKIE_EXPIRES_IN_DAYS", "3651"),
        ] {
            let err = load(&[
                ("JWT_SECRET", SECRET),
                ("DATABASE_URL", "postgresql://localhost/test"),
                (key, raw),
            ])
            .unwrap_err();
            assert!(err.to_string().contains(key), "{} = {}", key, raw);
        }
    }

    #[test]
    fn test_lifetime_bounds_accepted() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_EXPIRES_IN_DAYS", "1"),
            ("JWT_COOKIE_EXPIRES_IN_DAYS", "3650"),
        ])
        .unwrap();

        assert_eq!(config.jwt.expires_in_days, 1);
        assert_eq!(config.jwt.cookie_expires_in_days, 3650);
    }
}
