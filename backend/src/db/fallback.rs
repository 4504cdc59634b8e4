//! Ordered adapter chain with an explicit fallback policy.
//!
//! The chain is itself a [`FullRepository`], so callers cannot tell whether
//! they talk to one adapter or several. Adapters are tried in order; every
//! failure is logged at `warn` with the adapter name.
//!
//! What happens once every adapter has failed depends on [`FallbackPolicy`]:
//!
//! | Policy | Reads | Writes |
//! |---|---|---|
//! | `FirstSuccess` | empty list / `None` / `false`, logged at `error` | last adapter's error |
//! | `PrimaryOnly` | first adapter's error | first adapter's error |
//!
//! `PrimaryOnly` never consults any adapter after the first.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::repository::*;
use crate::models::*;

/// Behaviour of the chain when adapters fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Try each adapter in order; reads degrade to empty when all fail.
    #[default]
    FirstSuccess,
    /// Use the first adapter only and propagate its errors.
    PrimaryOnly,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "first_success" | "fallback" => Ok(Self::FirstSuccess),
            "primary_only" | "primary" => Ok(Self::PrimaryOnly),
            other => Err(format!("Unknown fallback policy: {}", other)),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSuccess => f.write_str("first_success"),
            Self::PrimaryOnly => f.write_str("primary_only"),
        }
    }
}

/// One storage adapter and the name it is logged under.
#[derive(Clone)]
pub struct NamedAdapter {
    pub name: String,
    pub repository: Arc<dyn FullRepository>,
}

impl NamedAdapter {
    pub fn new(name: impl Into<String>, repository: Arc<dyn FullRepository>) -> Self {
        Self {
            name: name.into(),
            repository,
        }
    }
}

impl fmt::Debug for NamedAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedAdapter").field("name", &self.name).finish()
    }
}

/// Storage chain over an ordered list of adapters.
#[derive(Clone, Debug)]
pub struct FallbackRepository {
    adapters: Vec<NamedAdapter>,
    policy: FallbackPolicy,
}

impl FallbackRepository {
    /// Build a chain. At least one adapter is required.
    pub fn new(adapters: Vec<NamedAdapter>, policy: FallbackPolicy) -> RepositoryResult<Self> {
        if adapters.is_empty() {
            return Err(RepositoryError::configuration(
                "fallback chain needs at least one storage adapter",
            ));
        }
        Ok(Self { adapters, policy })
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name.as_str()).collect()
    }

    /// Adapters consulted under the current policy.
    fn active(&self) -> &[NamedAdapter] {
        match self.policy {
            FallbackPolicy::FirstSuccess => &self.adapters,
            FallbackPolicy::PrimaryOnly => &self.adapters[..1],
        }
    }

    fn read_exhausted<T>(
        &self,
        operation: &str,
        last_error: Option<RepositoryError>,
        empty: T,
    ) -> RepositoryResult<T> {
        match (self.policy, last_error) {
            (FallbackPolicy::PrimaryOnly, Some(err)) => Err(err),
            (FallbackPolicy::FirstSuccess, Some(err)) => {
                log::error!(
                    "{}: every storage adapter failed, serving empty result (last error: {})",
                    operation,
                    err
                );
                Ok(empty)
            }
            (_, None) => Ok(empty),
        }
    }

    fn write_exhausted<T>(
        &self,
        operation: &str,
        last_error: Option<RepositoryError>,
    ) -> RepositoryResult<T> {
        let err = last_error.unwrap_or_else(|| {
            RepositoryError::configuration("no storage adapter available")
        });
        log::error!("{}: every storage adapter failed: {}", operation, err);
        Err(err)
    }
}

/// Try `$call` against each active adapter; on exhaustion serve `$empty`
/// according to the policy.
macro_rules! chain_read {
    ($self:ident, $op:literal, $empty:expr, |$repo:ident| $call:expr) => {{
        let mut last_error = None;
        for adapter in $self.active() {
            let $repo = adapter.repository.as_ref();
            match $call.await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    log::warn!("{} failed on adapter '{}': {}", $op, adapter.name, err);
                    last_error = Some(err);
                }
            }
        }
        $self.read_exhausted($op, last_error, $empty)
    }};
}

/// Try `$call` against each active adapter; on exhaustion return the last error.
macro_rules! chain_write {
    ($self:ident, $op:literal, |$repo:ident| $call:expr) => {{
        let mut last_error = None;
        for adapter in $self.active() {
            let $repo = adapter.repository.as_ref();
            match $call.await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    log::warn!("{} failed on adapter '{}': {}", $op, adapter.name, err);
                    last_error = Some(err);
                }
            }
        }
        $self.write_exhausted($op, last_error)
    }};
}

#[async_trait]
impl UserRepository for FallbackRepository {
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        chain_read!(self, "get_user", None, |repo| repo.get_user(id))
    }

    async fn get_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        chain_read!(self, "get_user_by_username", None, |repo| repo
            .get_user_by_username(username))
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        chain_read!(self, "list_users", Vec::new(), |repo| repo.list_users())
    }

    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        chain_write!(self, "create_user", |repo| repo.create_user(user))
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> RepositoryResult<Option<User>> {
        chain_write!(self, "update_user", |repo| repo.update_user(id, patch))
    }

    async fn delete_user(&self, id: UserId) -> RepositoryResult<bool> {
        chain_write!(self, "delete_user", |repo| repo.delete_user(id))
    }
}

#[async_trait]
impl ProfessionalRepository for FallbackRepository {
    async fn get_professional(&self, id: ProfessionalId) -> RepositoryResult<Option<Professional>> {
        chain_read!(self, "get_professional", None, |repo| repo
            .get_professional(id))
    }

    async fn list_professionals(&self) -> RepositoryResult<Vec<Professional>> {
        chain_read!(self, "list_professionals", Vec::new(), |repo| repo
            .list_professionals())
    }

    async fn create_professional(
        &self,
        professional: &NewProfessional,
    ) -> RepositoryResult<Professional> {
        chain_write!(self, "create_professional", |repo| repo
            .create_professional(professional))
    }

    async fn update_professional(
        &self,
        id: ProfessionalId,
        patch: &ProfessionalPatch,
    ) -> RepositoryResult<Option<Professional>> {
        chain_write!(self, "update_professional", |repo| repo
            .update_professional(id, patch))
    }

    async fn delete_professional(&self, id: ProfessionalId) -> RepositoryResult<bool> {
        chain_write!(self, "delete_professional", |repo| repo
            .delete_professional(id))
    }
}

#[async_trait]
impl ActivityTypeRepository for FallbackRepository {
    async fn get_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<Option<ActivityType>> {
        chain_read!(self, "get_activity_type", None, |repo| repo
            .get_activity_type(id))
    }

    async fn get_activity_type_by_code(&self, code: &str) -> RepositoryResult<Option<ActivityType>> {
        chain_read!(self, "get_activity_type_by_code", None, |repo| repo
            .get_activity_type_by_code(code))
    }

    async fn list_activity_types(&self) -> RepositoryResult<Vec<ActivityType>> {
        chain_read!(self, "list_activity_types", Vec::new(), |repo| repo
            .list_activity_types())
    }

    async fn create_activity_type(
        &self,
        activity_type: &NewActivityType,
    ) -> RepositoryResult<ActivityType> {
        chain_write!(self, "create_activity_type", |repo| repo
            .create_activity_type(activity_type))
    }

    async fn update_activity_type(
        &self,
        id: ActivityTypeId,
        patch: &ActivityTypePatch,
    ) -> RepositoryResult<Option<ActivityType>> {
        chain_write!(self, "update_activity_type", |repo| repo
            .update_activity_type(id, patch))
    }

    async fn delete_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<bool> {
        chain_write!(self, "delete_activity_type", |repo| repo
            .delete_activity_type(id))
    }
}

#[async_trait]
impl TimeSlotRepository for FallbackRepository {
    async fn get_time_slot(&self, id: TimeSlotId) -> RepositoryResult<Option<TimeSlot>> {
        chain_read!(self, "get_time_slot", None, |repo| repo.get_time_slot(id))
    }

    async fn list_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        chain_read!(self, "list_time_slots", Vec::new(), |repo| repo
            .list_time_slots())
    }

    async fn list_base_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        chain_read!(self, "list_base_time_slots", Vec::new(), |repo| repo
            .list_base_time_slots())
    }

    async fn create_time_slot(&self, slot: &NewTimeSlot) -> RepositoryResult<TimeSlot> {
        chain_write!(self, "create_time_slot", |repo| repo.create_time_slot(slot))
    }

    async fn update_time_slot(
        &self,
        id: TimeSlotId,
        patch: &TimeSlotPatch,
    ) -> RepositoryResult<Option<TimeSlot>> {
        chain_write!(self, "update_time_slot", |repo| repo
            .update_time_slot(id, patch))
    }

    async fn delete_time_slot(&self, id: TimeSlotId) -> RepositoryResult<bool> {
        chain_write!(self, "delete_time_slot", |repo| repo.delete_time_slot(id))
    }
}

#[async_trait]
impl ScheduleRepository for FallbackRepository {
    /// Healthy when any consulted adapter reports healthy.
    async fn health_check(&self) -> RepositoryResult<bool> {
        for adapter in self.active() {
            match adapter.repository.health_check().await {
                Ok(true) => return Ok(true),
                Ok(false) => log::warn!("adapter '{}' reports unhealthy", adapter.name),
                Err(err) => log::warn!("health_check failed on adapter '{}': {}", adapter.name, err),
            }
        }
        Ok(false)
    }

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        chain_read!(self, "get_schedule", None, |repo| repo.get_schedule(id))
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        chain_read!(self, "list_schedules", Vec::new(), |repo| repo
            .list_schedules(filter))
    }

    async fn create_schedule(&self, schedule: &NewSchedule) -> RepositoryResult<Schedule> {
        chain_write!(self, "create_schedule", |repo| repo
            .create_schedule(schedule))
    }

    async fn update_schedule(
        &self,
        id: ScheduleId,
        patch: &SchedulePatch,
    ) -> RepositoryResult<Option<Schedule>> {
        chain_write!(self, "update_schedule", |repo| repo
            .update_schedule(id, patch))
    }

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool> {
        chain_write!(self, "delete_schedule", |repo| repo.delete_schedule(id))
    }
}
