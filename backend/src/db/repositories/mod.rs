//! Storage adapter implementations.
//!
//! Each adapter implements every entity trait from [`super::repository`] and
//! the bootstrap's [`super::bootstrap::SchemaStrategy`]:
//! - `rest`: PostgREST table API over reqwest (primary)
//! - `postgres`: raw parameterized SQL over a Diesel r2d2 pool (fallback)
//! - `local`: in-memory implementation for unit testing and local development
#[cfg(feature = "local-repo")]
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;
#[cfg(feature = "supabase-repo")]
pub mod rest;

#[cfg(feature = "local-repo")]
pub use local::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use postgres::PostgresRepository;
#[cfg(feature = "supabase-repo")]
pub use rest::RestRepository;
