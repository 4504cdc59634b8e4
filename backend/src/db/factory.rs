//! Storage factory for dependency injection.
//!
//! Builds a [`StorageStack`]: the repository handed to request handlers plus
//! the schema strategies the bootstrap should try, in order. Everything is
//! constructed once in `main` and passed around explicitly.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::bootstrap::{Bootstrapper, SchemaStrategy};
use super::config::{database_url_from_env, PostgresConfig, SupabaseConfig};
use super::fallback::{FallbackPolicy, FallbackRepository, NamedAdapter};
use super::repo_config::RepositoryConfig;
#[cfg(feature = "local-repo")]
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
#[cfg(feature = "supabase-repo")]
use super::repositories::RestRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// PostgREST table API only
    Supabase,
    /// Raw SQL over a Diesel pool only
    Postgres,
    /// In-memory local repository
    Local,
    /// Supabase first, raw SQL second
    Fallback,
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supabase" | "rest" => Ok(Self::Supabase),
            "postgres" | "pg" | "sql" => Ok(Self::Postgres),
            "local" | "memory" => Ok(Self::Local),
            "fallback" | "chain" => Ok(Self::Fallback),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Supabase => "supabase",
            Self::Postgres => "postgres",
            Self::Local => "local",
            Self::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

impl RepositoryType {
    /// Get repository type from environment variables.
    ///
    /// `REPOSITORY_TYPE` wins when it parses. Otherwise the type is inferred:
    /// both Supabase and a database URL give `Fallback`, either one alone
    /// gives that backend, and nothing at all gives `Local`.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            match val.parse() {
                Ok(repo_type) => return repo_type,
                Err(e) => log::warn!("{}; inferring from the environment instead", e),
            }
        }

        let supabase = SupabaseConfig::is_configured();
        let database = database_url_from_env().is_some();
        match (supabase, database) {
            (true, true) => Self::Fallback,
            (true, false) => Self::Supabase,
            (false, true) => Self::Postgres,
            (false, false) => Self::Local,
        }
    }
}

/// Chain policy from `REPOSITORY_POLICY`, defaulting to first-success.
pub fn policy_from_env() -> FallbackPolicy {
    match std::env::var("REPOSITORY_POLICY") {
        Ok(val) => val.parse().unwrap_or_else(|e| {
            log::warn!("{}; using {}", e, FallbackPolicy::default());
            FallbackPolicy::default()
        }),
        Err(_) => FallbackPolicy::default(),
    }
}

/// A ready-to-use storage backend.
#[derive(Clone)]
pub struct StorageStack {
    pub kind: RepositoryType,
    pub repository: Arc<dyn FullRepository>,
    /// Table-creation strategies for the bootstrap, in the order to try them.
    pub schema_strategies: Vec<Arc<dyn SchemaStrategy>>,
}

impl StorageStack {
    pub fn bootstrapper(&self) -> Bootstrapper {
        Bootstrapper::new(self.repository.clone(), self.schema_strategies.clone())
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.schema_strategies.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for StorageStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageStack")
            .field("kind", &self.kind)
            .field("schema_strategies", &self.strategy_names())
            .finish()
    }
}

#[allow(dead_code)]
fn feature_disabled(feature: &str) -> RepositoryError {
    RepositoryError::configuration(format!("{} feature not enabled", feature))
}

/// Repository factory for creating storage stacks.
///
/// # Example
/// ```ignore
/// use escala::db::{RepositoryFactory, SupabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let stack = RepositoryFactory::create_supabase(&SupabaseConfig::from_env()?)?;
///     let report = stack.bootstrapper().run().await;
///     println!("bootstrap finished in state {}", report.state);
///     Ok(())
/// }
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a storage stack of the given type.
    ///
    /// `supabase` is required for `Supabase`, `postgres` for `Postgres`, and
    /// at least one of them for `Fallback`.
    pub fn create(
        repo_type: RepositoryType,
        supabase: Option<&SupabaseConfig>,
        postgres: Option<&PostgresConfig>,
        policy: FallbackPolicy,
    ) -> RepositoryResult<StorageStack> {
        match repo_type {
            RepositoryType::Supabase => {
                let config = supabase.ok_or_else(|| {
                    RepositoryError::configuration(
                        "Supabase repository requires SUPABASE_URL and SUPABASE_KEY",
                    )
                })?;
                Self::create_supabase(config)
            }
            RepositoryType::Postgres => {
                let config = postgres.ok_or_else(|| {
                    RepositoryError::configuration("Postgres repository requires DATABASE_URL")
                })?;
                Self::create_postgres(config)
            }
            RepositoryType::Local => Self::create_local(),
            RepositoryType::Fallback => Self::create_fallback(supabase, postgres, policy),
        }
    }

    /// Create an in-memory local stack.
    #[cfg(feature = "local-repo")]
    pub fn create_local() -> RepositoryResult<StorageStack> {
        let local = Arc::new(LocalRepository::new());
        Ok(StorageStack {
            kind: RepositoryType::Local,
            repository: local.clone(),
            schema_strategies: vec![local],
        })
    }

    #[cfg(not(feature = "local-repo"))]
    pub fn create_local() -> RepositoryResult<StorageStack> {
        Err(feature_disabled("local-repo"))
    }

    /// Create a PostgREST-backed stack; tables are created through the RPC.
    #[cfg(feature = "supabase-repo")]
    pub fn create_supabase(config: &SupabaseConfig) -> RepositoryResult<StorageStack> {
        let rest = Arc::new(RestRepository::new(config)?);
        Ok(StorageStack {
            kind: RepositoryType::Supabase,
            repository: rest.clone(),
            schema_strategies: vec![rest],
        })
    }

    #[cfg(not(feature = "supabase-repo"))]
    pub fn create_supabase(_config: &SupabaseConfig) -> RepositoryResult<StorageStack> {
        Err(feature_disabled("supabase-repo"))
    }

    /// Create a raw-SQL stack. Builds the connection pool.
    #[cfg(feature = "postgres-repo")]
    pub fn create_postgres(config: &PostgresConfig) -> RepositoryResult<StorageStack> {
        let pg = Arc::new(PostgresRepository::new(config.clone())?);
        Ok(StorageStack {
            kind: RepositoryType::Postgres,
            repository: pg.clone(),
            schema_strategies: vec![pg],
        })
    }

    #[cfg(not(feature = "postgres-repo"))]
    pub fn create_postgres(_config: &PostgresConfig) -> RepositoryResult<StorageStack> {
        Err(feature_disabled("postgres-repo"))
    }

    /// Create the adapter chain: REST first, raw SQL second.
    ///
    /// An adapter that cannot be constructed (feature disabled, invalid URL,
    /// unreachable pool) is left out with a warning. The chain is an error
    /// only when no adapter remains.
    pub fn create_fallback(
        supabase: Option<&SupabaseConfig>,
        postgres: Option<&PostgresConfig>,
        policy: FallbackPolicy,
    ) -> RepositoryResult<StorageStack> {
        let mut adapters = Vec::new();
        let mut schema_strategies = Vec::new();

        for (name, candidate) in [
            ("rest", supabase.map(Self::create_supabase)),
            ("postgres", postgres.map(Self::create_postgres)),
        ] {
            match candidate {
                Some(Ok(stack)) => {
                    adapters.push(NamedAdapter::new(name, stack.repository));
                    schema_strategies.extend(stack.schema_strategies);
                }
                Some(Err(e)) => log::warn!("Leaving '{}' adapter out of the chain: {}", name, e),
                None => log::debug!("No configuration for '{}' adapter", name),
            }
        }

        let chain = FallbackRepository::new(adapters, policy)?;
        log::info!(
            "Storage chain: [{}] with policy {}",
            chain.adapter_names().join(" -> "),
            policy
        );
        Ok(StorageStack {
            kind: RepositoryType::Fallback,
            repository: Arc::new(chain),
            schema_strategies,
        })
    }

    /// Create a stack from environment configuration.
    ///
    /// Reads `REPOSITORY_TYPE` and `REPOSITORY_POLICY` plus the Supabase and
    /// Postgres variables described in [`super::config`].
    pub fn from_env() -> RepositoryResult<StorageStack> {
        let repo_type = RepositoryType::from_env();
        let supabase = SupabaseConfig::from_env().ok();
        let postgres = PostgresConfig::from_env().ok();
        log::info!("Creating '{}' storage from environment", repo_type);
        Self::create(repo_type, supabase.as_ref(), postgres.as_ref(), policy_from_env())
    }

    /// Create a stack from a TOML configuration file.
    pub fn from_config_file<P: AsRef<Path>>(config_path: P) -> RepositoryResult<StorageStack> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config)
    }

    /// Create a stack from `repository.toml` in the standard locations.
    pub fn from_default_config() -> RepositoryResult<StorageStack> {
        let config = RepositoryConfig::from_default_location()?;
        Self::from_repository_config(&config)
    }

    /// Create a stack from a parsed configuration.
    pub fn from_repository_config(config: &RepositoryConfig) -> RepositoryResult<StorageStack> {
        let repo_type = config.repository_type().map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })?;
        let policy = config
            .policy()
            .map_err(|e| RepositoryError::configuration(format!("Invalid policy: {}", e)))?;
        Self::create(
            repo_type,
            config.to_supabase_config().as_ref(),
            config.to_postgres_config().as_ref(),
            policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_type_from_str() {
        assert_eq!(
            RepositoryType::from_str("local").unwrap(),
            RepositoryType::Local
        );
        assert_eq!(
            RepositoryType::from_str("postgres").unwrap(),
            RepositoryType::Postgres
        );
        assert_eq!(
            RepositoryType::from_str("Pg").unwrap(),
            RepositoryType::Postgres
        );
        assert_eq!(
            RepositoryType::from_str(" SUPABASE ").unwrap(),
            RepositoryType::Supabase
        );
        assert_eq!(
            RepositoryType::from_str("chain").unwrap(),
            RepositoryType::Fallback
        );
        assert!(RepositoryType::from_str("invalid").is_err());
    }

    #[test]
    fn test_missing_configuration_is_rejected() {
        let err = RepositoryFactory::create(
            RepositoryType::Supabase,
            None,
            None,
            FallbackPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationError { .. }));

        let err = RepositoryFactory::create_fallback(None, None, FallbackPolicy::default())
            .unwrap_err();
        assert!(err.to_string().contains("at least one storage adapter"));
    }

    #[cfg(feature = "local-repo")]
    #[tokio::test]
    async fn test_create_local_stack() {
        let stack = RepositoryFactory::create_local().unwrap();
        assert_eq!(stack.kind, RepositoryType::Local);
        assert_eq!(stack.strategy_names(), vec!["local"]);
        assert!(stack.repository.health_check().await.unwrap());
    }

    #[cfg(feature = "supabase-repo")]
    #[test]
    fn test_fallback_chain_skips_unbuildable_adapters() {
        let supabase = SupabaseConfig::new("https://xyz.supabase.co", "secret");
        let stack = RepositoryFactory::create_fallback(
            Some(&supabase),
            None,
            FallbackPolicy::FirstSuccess,
        )
        .unwrap();
        assert_eq!(stack.kind, RepositoryType::Fallback);
        assert_eq!(stack.strategy_names(), vec!["rpc"]);

        let bad = SupabaseConfig::new("not a url", "secret");
        assert!(
            RepositoryFactory::create_fallback(Some(&bad), None, FallbackPolicy::FirstSuccess)
                .is_err()
        );
    }
}
