#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use escala::db::bootstrap::SchemaStrategy;
use escala::db::repository::{RepositoryError, RepositoryResult};
use escala::db::schema::TableDefinition;
use escala::models::ClockTime;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Every variable the storage factory and diagnose probe read.
pub const BACKEND_VARS: [&str; 11] = [
    "REPOSITORY_TYPE",
    "REPOSITORY_POLICY",
    "SUPABASE_URL",
    "SUPABASE_KEY",
    "SUPABASE_SCHEMA",
    "DATABASE_URL",
    "PGHOST",
    "PGUSER",
    "PGPASSWORD",
    "PGDATABASE",
    "PGPORT",
];

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

/// Like [`with_scoped_env`], starting from an environment with no backend configured.
pub fn with_backend_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let mut all: Vec<(&str, Option<&str>)> = BACKEND_VARS.iter().map(|k| (*k, None)).collect();
    all.extend_from_slice(changes);
    with_scoped_env(&all, f)
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

/// Schema strategy with a fixed outcome that records every call.
pub struct ScriptedSchema {
    name: &'static str,
    fail: bool,
    calls: Mutex<Vec<Vec<&'static str>>>,
}

impl ScriptedSchema {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Table names passed to each `create_tables` call.
    pub fn calls(&self) -> Vec<Vec<&'static str>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaStrategy for ScriptedSchema {
    fn name(&self) -> &str {
        self.name
    }

    async fn create_tables(&self, tables: &[TableDefinition]) -> RepositoryResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(tables.iter().map(|t| t.name).collect());
        if self.fail {
            Err(RepositoryError::query(format!(
                "function {} is not available",
                self.name
            )))
        } else {
            Ok(())
        }
    }
}
