//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::auth::RefreshPolicy;
use chrono::Duration;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;

const DEV_IDENTITY_SECRET: &str = "notespace-dev-identity-secret-change-in-production";
const DEV_WORKSPACE_SECRET: &str = "notespace-dev-workspace-secret-change-in-production";

/// Upper bound on workspace token lifetime (one year)
const MAX_WORKSPACE_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 3000,
        }
    }
}

/// Where repositories keep their rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    pub require_tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            max_pool_size: 5,
            require_tls: false,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Identity provider and workspace token settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub identity_secret: String,
    pub identity_issuer: Option<String>,
    pub identity_audience: Option<String>,
    pub workspace_token_secret: String,
    pub workspace_token_ttl: Duration,
    pub refresh: RefreshPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_secret: DEV_IDENTITY_SECRET.to_string(),
            identity_issuer: None,
            identity_audience: None,
            workspace_token_secret: DEV_WORKSPACE_SECRET.to_string(),
            workspace_token_ttl: Duration::days(7),
            refresh: RefreshPolicy::default(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; `load` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: parse_or(&lookup, "HOST", ServerConfig::default().host)?,
            port: parse_or(&lookup, "PORT", ServerConfig::default().port)?,
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let max_pool_size = parse_or(
            &lookup,
            "DB_MAX_CONNECTIONS",
            DatabaseConfig::default().max_pool_size,
        )?;

        // Try to load DATABASE_URL first, fall back to individual vars
        let database = if let Some(database_url) = lookup("DATABASE_URL") {
            Self::parse_database_url(&database_url, max_pool_size)?
        } else {
            let defaults = DatabaseConfig::default();
            DatabaseConfig {
                host: lookup("DB_HOST").unwrap_or(defaults.host),
                port: parse_or(&lookup, "DB_PORT", defaults.port)?,
                user: lookup("DB_USER").unwrap_or(defaults.user),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                database: lookup("DB_NAME").unwrap_or(defaults.database),
                max_pool_size,
                require_tls: false,
            }
        };

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let defaults = AuthConfig::default();
        let ttl_secs = parse_or(
            &lookup,
            "WORKSPACE_TOKEN_TTL_SECS",
            defaults.workspace_token_ttl.num_seconds(),
        )?;
        let rotate_secs = parse_or(
            &lookup,
            "WORKSPACE_TOKEN_ROTATE_WITHIN_SECS",
            defaults.refresh.rotate_within.num_seconds(),
        )?;
        if !(1..=MAX_WORKSPACE_TOKEN_TTL_SECS).contains(&ttl_secs) {
            return Err(ConfigError::InvalidValue(format!(
                "WORKSPACE_TOKEN_TTL_SECS must be between 1 and {}",
                MAX_WORKSPACE_TOKEN_TTL_SECS
            )));
        }

        let auth = AuthConfig {
            identity_secret: secret_or_dev(&lookup, "IDENTITY_JWT_SECRET", DEV_IDENTITY_SECRET),
            identity_issuer: lookup("IDENTITY_ISSUER").filter(|s| !s.is_empty()),
            identity_audience: lookup("IDENTITY_AUDIENCE").filter(|s| !s.is_empty()),
            workspace_token_secret: secret_or_dev(
                &lookup,
                "WORKSPACE_TOKEN_SECRET",
                DEV_WORKSPACE_SECRET,
            ),
            workspace_token_ttl: Duration::seconds(ttl_secs),
            refresh: RefreshPolicy {
                // Never wider than the token lifetime
                rotate_within: Duration::seconds(rotate_secs.clamp(0, ttl_secs)),
                include_all_memberships: parse_or(
                    &lookup,
                    "WORKSPACE_TOKEN_INCLUDE_ALL",
                    defaults.refresh.include_all_memberships,
                )?,
            },
        };

        Ok(Self {
            server,
            storage,
            database,
            cors,
            auth,
        })
    }

    /// Parse a DATABASE_URL connection string (postgresql://...)
    fn parse_database_url(
        url: &str,
        max_pool_size: usize,
    ) -> Result<DatabaseConfig, ConfigError> {
        let parsed = url::Url::parse(url).map_err(|_| {
            ConfigError::InvalidValue(
                "Invalid DATABASE_URL format (expected postgresql://...)".to_string(),
            )
        })?;

        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(ConfigError::InvalidValue(
                "DATABASE_URL must use the postgresql:// scheme".to_string(),
            ));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidValue("Missing host in DATABASE_URL".to_string()))?
            .to_string();

        let require_tls = host.contains("neon.tech")
            || parsed
                .query_pairs()
                .any(|(k, v)| k == "sslmode" && v == "require");

        Ok(DatabaseConfig {
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().map(|p| p.to_string()).unwrap_or_default(),
            database: parsed.path().trim_start_matches('/').to_string(),
            host,
            max_pool_size,
            require_tls,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| {
                ConfigError::InvalidValue(format!("{} has an invalid value: {}", key, raw))
            }),
        _ => Ok(default),
    }
}

fn secret_or_dev<F>(lookup: &F, key: &str, dev_default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|s| !s.is_empty()) {
        Some(secret) => secret,
        None => {
            warn!("⚠️  {} not set, using default (INSECURE - set in production!)", key);
            dev_default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.storage, StorageBackend::Postgres);
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.max_pool_size, 5);
        assert_eq!(settings.auth.workspace_token_ttl, Duration::days(7));
        assert!(settings.auth.refresh.include_all_memberships);
    }

    #[test]
    fn test_database_url_is_parsed() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgresql://demo:pw@db.example.com:6543/notes?sslmode=require"),
            ("DB_MAX_CONNECTIONS", "8"),
        ])
        .unwrap();
        let db = settings.database;
        assert_eq!(db.host, "db.example.com");
        assert_eq!(db.port, 6543);
        assert_eq!(db.user, "demo");
        assert_eq!(db.password, "pw");
        assert_eq!(db.database, "notes");
        assert_eq!(db.max_pool_size, 8);
        assert!(db.require_tls);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(settings_from(&[("DATABASE_URL", "mysql://x@y/z")]).is_err());
        assert!(settings_from(&[("PORT", "eighty")]).is_err());
        assert!(settings_from(&[("STORAGE_BACKEND", "redis")]).is_err());
        assert!(settings_from(&[("WORKSPACE_TOKEN_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_token_ttl_is_bounded() {
        let huge = i64::MAX.to_string();
        assert!(settings_from(&[("WORKSPACE_TOKEN_TTL_SECS", huge.as_str())]).is_err());
        assert!(settings_from(&[("WORKSPACE_TOKEN_TTL_SECS", "31536001")]).is_err());

        let settings = settings_from(&[
            ("WORKSPACE_TOKEN_TTL_SECS", "31536000"),
            ("WORKSPACE_TOKEN_ROTATE_WITHIN_SECS", huge.as_str()),
        ])
        .unwrap();
        assert_eq!(settings.auth.workspace_token_ttl, Duration::days(365));
        assert_eq!(settings.auth.refresh.rotate_within, Duration::days(365));
    }

    #[test]
    fn test_refresh_policy_from_environment() {
        let settings = settings_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("WORKSPACE_TOKEN_ROTATE_WITHIN_SECS", "600"),
            ("WORKSPACE_TOKEN_INCLUDE_ALL", "false"),
        ])
        .unwrap();
        assert_eq!(settings.storage, StorageBackend::Memory);
        assert_eq!(settings.auth.refresh.rotate_within, Duration::minutes(10));
        assert!(!settings.auth.refresh.include_all_memberships);
    }
}
