//! Idempotent schema and seed-data initialization.
//!
//! ```text
//! TablesUnknown ──ok──────────────────────────► TablesReady ──► seed ──► Ready
//!      │                                             ▲
//!      └─err─► TablesViaSql ──ok─────────────────────┘
//!                   │
//!                   └─err (every strategy failed)──► Failed
//! ```
//!
//! Table creation goes through an ordered list of [`SchemaStrategy`]s; the
//! first one to succeed wins. Seeding then fills each empty table from
//! [`crate::models::defaults`], one `create` call per row, in dependency order
//! (activity types, time slots, professionals, schedules). A seeding failure
//! is recorded and the next entity is still attempted.
//!
//! Nothing here returns an error to the caller: the outcome is a
//! [`BootstrapReport`], and the process keeps serving either way.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::repository::{FullRepository, RepositoryResult};
use super::schema::{TableDefinition, ALL_TABLES};
use crate::models::defaults::{
    default_activity_types, default_professionals, default_time_slots, DEFAULT_SCHEDULES,
};
use crate::models::ProfessionalId;

/// A way of running `CREATE TABLE IF NOT EXISTS` for the catalog tables.
#[async_trait]
pub trait SchemaStrategy: Send + Sync {
    /// Short name used in logs and in [`BootstrapReport::strategy_used`].
    fn name(&self) -> &str;

    /// Create every table in `tables`, stopping at the first failure.
    async fn create_tables(&self, tables: &[TableDefinition]) -> RepositoryResult<()>;
}

/// Bootstrap progress. `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    TablesUnknown,
    TablesViaSql,
    TablesReady,
    Ready,
    Failed,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TablesUnknown => "tables_unknown",
            Self::TablesViaSql => "tables_via_sql",
            Self::TablesReady => "tables_ready",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedEntity {
    ActivityTypes,
    TimeSlots,
    Professionals,
    Schedules,
}

impl SeedEntity {
    pub fn table(&self) -> &'static str {
        match self {
            Self::ActivityTypes => "activity_types",
            Self::TimeSlots => "time_slots",
            Self::Professionals => "professionals",
            Self::Schedules => "schedules",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedStatus {
    /// Table already had rows; nothing inserted.
    AlreadyPopulated { existing: usize },
    /// Table was empty and the defaults were inserted. `skipped` counts seed
    /// rows that could not be resolved (schedules with unknown initials).
    Seeded { inserted: usize, skipped: usize },
    /// Listing or inserting failed; `inserted` rows made it in before that.
    Failed { inserted: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedOutcome {
    pub entity: SeedEntity,
    #[serde(flatten)]
    pub status: SeedStatus,
}

/// Result of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub state: BootstrapState,
    /// Name of the schema strategy that created the tables.
    pub strategy_used: Option<String>,
    pub seeded: Vec<SeedOutcome>,
    pub errors: Vec<String>,
}

impl BootstrapReport {
    fn new() -> Self {
        Self {
            state: BootstrapState::TablesUnknown,
            strategy_used: None,
            seeded: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == BootstrapState::Ready
    }

    /// Total rows inserted across all entities.
    pub fn inserted(&self) -> usize {
        self.seeded
            .iter()
            .map(|o| match &o.status {
                SeedStatus::Seeded { inserted, .. } | SeedStatus::Failed { inserted, .. } => {
                    *inserted
                }
                SeedStatus::AlreadyPopulated { .. } => 0,
            })
            .sum()
    }

    pub fn outcome(&self, entity: SeedEntity) -> Option<&SeedStatus> {
        self.seeded
            .iter()
            .find(|o| o.entity == entity)
            .map(|o| &o.status)
    }

    fn transition(&mut self, next: BootstrapState) {
        log::debug!("bootstrap: {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Runs table creation and seeding against a storage backend.
pub struct Bootstrapper {
    repository: Arc<dyn FullRepository>,
    strategies: Vec<Arc<dyn SchemaStrategy>>,
}

impl Bootstrapper {
    /// `strategies` are tried in order; seeding goes through `repository`.
    pub fn new(
        repository: Arc<dyn FullRepository>,
        strategies: Vec<Arc<dyn SchemaStrategy>>,
    ) -> Self {
        Self {
            repository,
            strategies,
        }
    }

    /// Run the full bootstrap. Safe to call repeatedly.
    pub async fn run(&self) -> BootstrapReport {
        let mut report = BootstrapReport::new();
        log::info!("Starting database bootstrap");

        if !self.create_tables(&mut report).await {
            report.transition(BootstrapState::Failed);
            log::error!(
                "Bootstrap failed: no schema strategy could create the tables ({})",
                report.errors.join("; ")
            );
            return report;
        }

        let seeders = [
            SeedEntity::ActivityTypes,
            SeedEntity::TimeSlots,
            SeedEntity::Professionals,
            SeedEntity::Schedules,
        ];
        for entity in seeders {
            let status = self.seed(entity).await;
            match &status {
                SeedStatus::AlreadyPopulated { existing } => {
                    log::debug!("{} already has {} rows", entity.table(), existing)
                }
                SeedStatus::Seeded { inserted, skipped } => log::info!(
                    "Seeded {} rows into {} ({} skipped)",
                    inserted,
                    entity.table(),
                    skipped
                ),
                SeedStatus::Failed { message, .. } => {
                    log::error!("Seeding {} failed: {}", entity.table(), message);
                    report
                        .errors
                        .push(format!("seed {}: {}", entity.table(), message));
                }
            }
            report.seeded.push(SeedOutcome { entity, status });
        }

        report.transition(BootstrapState::Ready);
        log::info!(
            "Bootstrap finished: {} rows inserted, {} errors",
            report.inserted(),
            report.errors.len()
        );
        report
    }

    async fn create_tables(&self, report: &mut BootstrapReport) -> bool {
        if self.strategies.is_empty() {
            report
                .errors
                .push("no schema strategy configured".to_string());
            return false;
        }
        for (idx, strategy) in self.strategies.iter().enumerate() {
            if idx > 0 {
                report.transition(BootstrapState::TablesViaSql);
            }
            match strategy.create_tables(&ALL_TABLES).await {
                Ok(()) => {
                    report.strategy_used = Some(strategy.name().to_string());
                    report.transition(BootstrapState::TablesReady);
                    return true;
                }
                Err(err) => {
                    log::warn!("Schema strategy '{}' failed: {}", strategy.name(), err);
                    report.errors.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }
        false
    }

    async fn seed(&self, entity: SeedEntity) -> SeedStatus {
        let mut inserted = 0;
        let result = match entity {
            SeedEntity::ActivityTypes => self.seed_activity_types(&mut inserted).await,
            SeedEntity::TimeSlots => self.seed_time_slots(&mut inserted).await,
            SeedEntity::Professionals => self.seed_professionals(&mut inserted).await,
            SeedEntity::Schedules => self.seed_schedules(&mut inserted).await,
        };
        result.unwrap_or_else(|err| SeedStatus::Failed {
            inserted,
            message: err.to_string(),
        })
    }

    async fn seed_activity_types(&self, inserted: &mut usize) -> RepositoryResult<SeedStatus> {
        let existing = self.repository.list_activity_types().await?.len();
        if existing > 0 {
            return Ok(SeedStatus::AlreadyPopulated { existing });
        }
        for item in default_activity_types() {
            self.repository.create_activity_type(&item).await?;
            *inserted += 1;
        }
        Ok(SeedStatus::Seeded {
            inserted: *inserted,
            skipped: 0,
        })
    }

    async fn seed_time_slots(&self, inserted: &mut usize) -> RepositoryResult<SeedStatus> {
        let existing = self.repository.list_time_slots().await?.len();
        if existing > 0 {
            return Ok(SeedStatus::AlreadyPopulated { existing });
        }
        for item in default_time_slots() {
            self.repository.create_time_slot(&item).await?;
            *inserted += 1;
        }
        Ok(SeedStatus::Seeded {
            inserted: *inserted,
            skipped: 0,
        })
    }

    async fn seed_professionals(&self, inserted: &mut usize) -> RepositoryResult<SeedStatus> {
        let existing = self.repository.list_professionals().await?.len();
        if existing > 0 {
            return Ok(SeedStatus::AlreadyPopulated { existing });
        }
        for item in default_professionals() {
            self.repository.create_professional(&item).await?;
            *inserted += 1;
        }
        Ok(SeedStatus::Seeded {
            inserted: *inserted,
            skipped: 0,
        })
    }

    async fn seed_schedules(&self, inserted: &mut usize) -> RepositoryResult<SeedStatus> {
        let existing = self
            .repository
            .list_schedules(&Default::default())
            .await?
            .len();
        if existing > 0 {
            return Ok(SeedStatus::AlreadyPopulated { existing });
        }

        // First professional wins when initials repeat.
        let mut by_initials: HashMap<String, ProfessionalId> = HashMap::new();
        for p in self.repository.list_professionals().await? {
            by_initials.entry(p.initials).or_insert(p.id);
        }

        let mut skipped = 0;
        for seed in DEFAULT_SCHEDULES.iter() {
            let new_schedule = by_initials
                .get(seed.initials)
                .and_then(|id| seed.to_new_schedule(*id));
            let Some(new_schedule) = new_schedule else {
                log::warn!(
                    "Skipping sample schedule for '{}' on {}: professional not found",
                    seed.initials,
                    seed.weekday
                );
                skipped += 1;
                continue;
            };
            self.repository.create_schedule(&new_schedule).await?;
            *inserted += 1;
        }
        Ok(SeedStatus::Seeded {
            inserted: *inserted,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_inserted_rows() {
        let report = BootstrapReport {
            state: BootstrapState::Ready,
            strategy_used: Some("rpc".into()),
            seeded: vec![
                SeedOutcome {
                    entity: SeedEntity::ActivityTypes,
                    status: SeedStatus::AlreadyPopulated { existing: 6 },
                },
                SeedOutcome {
                    entity: SeedEntity::TimeSlots,
                    status: SeedStatus::Seeded {
                        inserted: 16,
                        skipped: 0,
                    },
                },
                SeedOutcome {
                    entity: SeedEntity::Schedules,
                    status: SeedStatus::Failed {
                        inserted: 3,
                        message: "boom".into(),
                    },
                },
            ],
            errors: vec![],
        };
        assert_eq!(report.inserted(), 19);
        assert!(report.is_ready());
        assert_eq!(
            report.outcome(SeedEntity::ActivityTypes),
            Some(&SeedStatus::AlreadyPopulated { existing: 6 })
        );
        assert!(report.outcome(SeedEntity::Professionals).is_none());
    }

    #[test]
    fn test_seed_outcome_serializes_flat() {
        let outcome = SeedOutcome {
            entity: SeedEntity::TimeSlots,
            status: SeedStatus::Seeded {
                inserted: 16,
                skipped: 0,
            },
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"entity": "time_slots", "status": "seeded", "inserted": 16, "skipped": 0})
        );
    }
}
