//! Backend configuration and environment variable handling.

use std::env;

use serde::Deserialize;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Connection settings for the managed PostgREST endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service or anon key, sent as `apikey` and bearer token
    pub key: String,
    /// Optional schema override (`Accept-Profile`/`Content-Profile`)
    #[serde(default)]
    pub schema: Option<String>,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            schema: None,
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SUPABASE_URL` (required)
    /// - `SUPABASE_KEY` (required)
    /// - `SUPABASE_SCHEMA` (optional)
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env() -> Result<Self, String> {
        let url = env_non_empty("SUPABASE_URL")
            .ok_or_else(|| "SUPABASE_URL environment variable not set".to_string())?;
        let key = env_non_empty("SUPABASE_KEY")
            .ok_or_else(|| "SUPABASE_KEY environment variable not set".to_string())?;
        Ok(Self {
            url,
            key,
            schema: env_non_empty("SUPABASE_SCHEMA"),
        })
    }

    /// Whether both required variables are present in the environment.
    pub fn is_configured() -> bool {
        env_non_empty("SUPABASE_URL").is_some() && env_non_empty("SUPABASE_KEY").is_some()
    }
}

/// Configuration for the raw-SQL connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of idle connections kept in the pool
    pub min_pool_size: u32,
    /// Pool checkout timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL`: Connection string. When absent, a URL is composed
    ///   from `PGHOST`, `PGUSER`, `PGPASSWORD`, `PGDATABASE` and `PGPORT`
    ///   (`PGHOST` required in that case).
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Checkout timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    pub fn from_env() -> Result<Self, String> {
        let database_url = database_url_from_env().ok_or_else(|| {
            "DATABASE_URL (or PGHOST and friends) must be set".to_string()
        })?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_parse("PG_POOL_MAX").unwrap_or(defaults.max_pool_size),
            min_pool_size: env_parse("PG_POOL_MIN").unwrap_or(defaults.min_pool_size),
            connection_timeout_sec: env_parse("PG_CONN_TIMEOUT_SEC")
                .unwrap_or(defaults.connection_timeout_sec),
            idle_timeout_sec: env_parse("PG_IDLE_TIMEOUT_SEC")
                .unwrap_or(defaults.idle_timeout_sec),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Resolve the connection string: `DATABASE_URL` first, then the libpq-style
/// `PG*` variables.
pub fn database_url_from_env() -> Option<String> {
    if let Some(url) = env_non_empty("DATABASE_URL") {
        return Some(url);
    }
    let host = env_non_empty("PGHOST")?;
    Some(compose_database_url(
        &host,
        env_non_empty("PGPORT").as_deref(),
        env_non_empty("PGUSER").as_deref(),
        env_non_empty("PGPASSWORD").as_deref(),
        env_non_empty("PGDATABASE").as_deref(),
    ))
}

/// Build a `postgres://` URL from its parts. The password is inserted verbatim.
pub fn compose_database_url(
    host: &str,
    port: Option<&str>,
    user: Option<&str>,
    password: Option<&str>,
    database: Option<&str>,
) -> String {
    let mut url = String::from("postgres://");
    if let Some(user) = user {
        url.push_str(user);
        if let Some(password) = password {
            url.push(':');
            url.push_str(password);
        }
        url.push('@');
    }
    url.push_str(host);
    url.push(':');
    url.push_str(port.unwrap_or("5432"));
    if let Some(database) = database {
        url.push('/');
        url.push_str(database);
    }
    url
}

/// Environment name reported by the status endpoints (`NODE_ENV`, default `development`).
pub fn environment_name() -> String {
    env_non_empty("NODE_ENV").unwrap_or_else(|| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_full_url() {
        let url = compose_database_url("db.local", Some("6543"), Some("app"), Some("s3"), Some("escala"));
        assert_eq!(url, "postgres://app:s3@db.local:6543/escala");
    }

    #[test]
    fn test_compose_minimal_url() {
        assert_eq!(
            compose_database_url("localhost", None, None, Some("ignored"), None),
            "postgres://localhost:5432"
        );
    }

    #[test]
    fn test_postgres_defaults() {
        let config = PostgresConfig::with_url("postgres://localhost/escala");
        assert_eq!(config.max_pool_size, 10);
        assert_eq!(config.min_pool_size, 1);
        assert_eq!(config.connection_timeout_sec, 30);
        assert_eq!(config.idle_timeout_sec, 600);
    }
}
