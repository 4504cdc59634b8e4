//! Storage layer for the scheduling catalog.
//!
//! Provides the repository abstraction over the five persisted entities, the
//! concrete adapters, and the startup routines around them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers (crate::http)                            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  services.rs - input validation before any write        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  repository/ - one trait per entity, FullRepository     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  fallback.rs - ordered adapter chain + FallbackPolicy   │
//! └──────┬────────────────────┬────────────────────┬────────┘
//!        │                    │                    │
//!   ┌────▼─────┐       ┌──────▼──────┐       ┌─────▼─────┐
//!   │   rest   │       │  postgres   │       │   local   │
//!   │(PostgREST│       │ (raw SQL,   │       │(in-memory)│
//!   │  over    │       │  Diesel     │       │           │
//!   │ reqwest) │       │  r2d2 pool) │       │           │
//!   └──────────┘       └─────────────┘       └───────────┘
//! ```
//!
//! Alongside the request path:
//! - `bootstrap`: creates tables through ordered strategies and seeds empty tables
//! - `diagnose`: standalone connectivity probe with its own connection
//! - `factory` / `repo_config` / `config`: build a [`StorageStack`] from the
//!   environment or `repository.toml`
//! - `schema`: the `CREATE TABLE IF NOT EXISTS` definitions shared by all strategies
//! - `models`: storage row shapes and the 0/1 boolean encoding
//!
//! # Recommended Usage
//!
//! ```ignore
//! use escala::db::{services, RepositoryFactory};
//! use escala::models::NewProfessional;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let stack = RepositoryFactory::from_env()?;
//!     stack.bootstrapper().run().await;
//!
//!     let repo = stack.repository.as_ref();
//!     services::create_professional(repo, &NewProfessional::new("Prof. Ana", "AN")).await?;
//!     Ok(())
//! }
//! ```

#[cfg(not(any(
    feature = "local-repo",
    feature = "supabase-repo",
    feature = "postgres-repo"
)))]
compile_error!("Enable at least one repository backend feature.");

pub mod bootstrap;
pub mod config;
pub mod diagnose;
pub mod factory;
pub mod fallback;
pub mod models;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod schema;
pub mod services;

pub use bootstrap::{BootstrapReport, BootstrapState, Bootstrapper, SchemaStrategy};
pub use config::{PostgresConfig, SupabaseConfig};
pub use diagnose::{DatabaseStatus, DiagnoseReport};
pub use factory::{RepositoryFactory, RepositoryType, StorageStack};
pub use fallback::{FallbackPolicy, FallbackRepository, NamedAdapter};
pub use repo_config::RepositoryConfig;

#[cfg(feature = "local-repo")]
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
#[cfg(feature = "supabase-repo")]
pub use repositories::RestRepository;
pub use repository::{
    ActivityTypeRepository, ErrorContext, FullRepository, ProfessionalRepository,
    RepositoryError, RepositoryResult, ScheduleRepository, TimeSlotRepository, UserRepository,
};
