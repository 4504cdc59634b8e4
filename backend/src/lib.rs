//! # Escala Backend
//!
//! Storage and HTTP backend for a weekly staff-scheduling tool.
//!
//! The crate persists five entity kinds (users, professionals, activity
//! types, time slots and weekly schedule rows) behind one async repository
//! interface, with interchangeable storage adapters:
//!
//! - a PostgREST (Supabase) table API client, used first,
//! - a raw-SQL Postgres adapter over a Diesel connection pool, used as fallback,
//! - an in-memory adapter for tests and local development.
//!
//! ## Architecture
//!
//! - [`models`]: domain records, validation rules and the default seed catalog
//! - [`db`]: repository traits, adapters, the fallback chain, bootstrap and diagnostics
//! - [`http`]: Axum-based HTTP server and request handlers
//!

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod db;
pub mod models;

#[cfg(feature = "http-server")]
pub mod http;
