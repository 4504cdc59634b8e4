//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! ordered maps keyed by id, providing fast, deterministic, and isolated
//! execution. Unique keys (username, activity code) are enforced the way the
//! database would enforce them, so constraint failures surface as
//! `PersistenceError`.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::db::bootstrap::SchemaStrategy;
use crate::db::repository::*;
use crate::db::schema::TableDefinition;
use crate::models::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use escala::db::repositories::LocalRepository;
/// use escala::db::repository::ProfessionalRepository;
/// use escala::models::NewProfessional;
///
/// # tokio_test_block_on(async {
/// let repo = LocalRepository::new();
/// repo.create_professional(&NewProfessional::new("Prof. Paulo", "PP")).await.unwrap();
/// assert_eq!(repo.list_professionals().await.unwrap().len(), 1);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    users: BTreeMap<UserId, User>,
    professionals: BTreeMap<ProfessionalId, Professional>,
    activity_types: BTreeMap<ActivityTypeId, ActivityType>,
    time_slots: BTreeMap<TimeSlotId, TimeSlot>,
    schedules: BTreeMap<ScheduleId, Schedule>,

    // SERIAL counters, never reused after delete
    next_user_id: i32,
    next_professional_id: i32,
    next_activity_type_id: i32,
    next_time_slot_id: i32,
    next_schedule_id: i32,

    // Tables created through the schema strategy
    tables: BTreeSet<String>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            professionals: BTreeMap::new(),
            activity_types: BTreeMap::new(),
            time_slots: BTreeMap::new(),
            schedules: BTreeMap::new(),
            next_user_id: 1,
            next_professional_id: 1,
            next_activity_type_id: 1,
            next_time_slot_id: 1,
            next_schedule_id: 1,
            tables: BTreeSet::new(),
            is_healthy: true,
        }
    }
}

fn take_id(counter: &mut i32) -> i32 {
    let id = *counter;
    *counter += 1;
    id
}

fn unique_violation(operation: &str, entity: &str, column: &str, value: &str) -> RepositoryError {
    RepositoryError::persistence_with_context(
        format!(
            "duplicate key value violates unique constraint \"{}_{}_key\"",
            entity, column
        ),
        ErrorContext::new(operation)
            .with_entity(entity)
            .with_details(format!("{}={}", column, value)),
    )
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the health status for testing connection failures.
    ///
    /// While unhealthy, reads fail with `ConnectionError`, writes with
    /// `PersistenceError`, and the schema strategy refuses to run.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository. Health status is kept.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Names of the tables created through [`SchemaStrategy::create_tables`].
    pub fn created_tables(&self) -> Vec<String> {
        self.data.read().tables.iter().cloned().collect()
    }

    /// Row count per table, keyed by table name.
    pub fn row_counts(&self) -> BTreeMap<&'static str, usize> {
        let data = self.data.read();
        BTreeMap::from([
            ("users", data.users.len()),
            ("activity_types", data.activity_types.len()),
            ("professionals", data.professionals.len()),
            ("time_slots", data.time_slots.len()),
            ("schedules", data.schedules.len()),
        ])
    }

    fn read(&self, operation: &str) -> RepositoryResult<RwLockReadGuard<'_, LocalData>> {
        let data = self.data.read();
        if !data.is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(data)
    }

    fn write(&self, operation: &str) -> RepositoryResult<RwLockWriteGuard<'_, LocalData>> {
        let data = self.data.write();
        if !data.is_healthy {
            return Err(RepositoryError::persistence_with_context(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(data)
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserRepository for LocalRepository {
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.read("get_user")?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let data = self.read("get_user_by_username")?;
        Ok(data.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        Ok(self.read("list_users")?.users.values().cloned().collect())
    }

    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let mut data = self.write("create_user")?;
        if data.users.values().any(|u| u.username == user.username) {
            return Err(unique_violation("create_user", "users", "username", &user.username));
        }
        let id = UserId(take_id(&mut data.next_user_id));
        let created = User {
            id,
            username: user.username.clone(),
            password: user.password.clone(),
        };
        data.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> RepositoryResult<Option<User>> {
        let mut data = self.write("update_user")?;
        if let Some(username) = &patch.username {
            if data.users.values().any(|u| u.id != id && &u.username == username) {
                return Err(unique_violation("update_user", "users", "username", username));
            }
        }
        let Some(user) = data.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = &patch.username {
            user.username = username.clone();
        }
        if let Some(password) = &patch.password {
            user.password = password.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> RepositoryResult<bool> {
        Ok(self.write("delete_user")?.users.remove(&id).is_some())
    }
}

// =============================================================================
// Professionals
// =============================================================================

#[async_trait]
impl ProfessionalRepository for LocalRepository {
    async fn get_professional(&self, id: ProfessionalId) -> RepositoryResult<Option<Professional>> {
        Ok(self.read("get_professional")?.professionals.get(&id).cloned())
    }

    async fn list_professionals(&self) -> RepositoryResult<Vec<Professional>> {
        let mut rows: Vec<_> = self
            .read("list_professionals")?
            .professionals
            .values()
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_professional(
        &self,
        professional: &NewProfessional,
    ) -> RepositoryResult<Professional> {
        let mut data = self.write("create_professional")?;
        let id = ProfessionalId(take_id(&mut data.next_professional_id));
        let created = Professional {
            id,
            name: professional.name.clone(),
            initials: professional.initials.clone(),
            active: professional.active,
        };
        data.professionals.insert(id, created.clone());
        Ok(created)
    }

    async fn update_professional(
        &self,
        id: ProfessionalId,
        patch: &ProfessionalPatch,
    ) -> RepositoryResult<Option<Professional>> {
        let mut data = self.write("update_professional")?;
        let Some(p) = data.professionals.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            p.name = name.clone();
        }
        if let Some(initials) = &patch.initials {
            p.initials = initials.clone();
        }
        if let Some(active) = patch.active {
            p.active = active;
        }
        Ok(Some(p.clone()))
    }

    async fn delete_professional(&self, id: ProfessionalId) -> RepositoryResult<bool> {
        Ok(self
            .write("delete_professional")?
            .professionals
            .remove(&id)
            .is_some())
    }
}

// =============================================================================
// Activity types
// =============================================================================

#[async_trait]
impl ActivityTypeRepository for LocalRepository {
    async fn get_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<Option<ActivityType>> {
        Ok(self.read("get_activity_type")?.activity_types.get(&id).cloned())
    }

    async fn get_activity_type_by_code(&self, code: &str) -> RepositoryResult<Option<ActivityType>> {
        let data = self.read("get_activity_type_by_code")?;
        Ok(data.activity_types.values().find(|a| a.code == code).cloned())
    }

    async fn list_activity_types(&self) -> RepositoryResult<Vec<ActivityType>> {
        let mut rows: Vec<_> = self
            .read("list_activity_types")?
            .activity_types
            .values()
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_activity_type(
        &self,
        activity_type: &NewActivityType,
    ) -> RepositoryResult<ActivityType> {
        let mut data = self.write("create_activity_type")?;
        if data.activity_types.values().any(|a| a.code == activity_type.code) {
            return Err(unique_violation(
                "create_activity_type",
                "activity_types",
                "code",
                &activity_type.code,
            ));
        }
        let id = ActivityTypeId(take_id(&mut data.next_activity_type_id));
        let created = ActivityType {
            id,
            code: activity_type.code.clone(),
            name: activity_type.name.clone(),
            color: activity_type.color.clone(),
        };
        data.activity_types.insert(id, created.clone());
        Ok(created)
    }

    async fn update_activity_type(
        &self,
        id: ActivityTypeId,
        patch: &ActivityTypePatch,
    ) -> RepositoryResult<Option<ActivityType>> {
        let mut data = self.write("update_activity_type")?;
        if let Some(code) = &patch.code {
            if data.activity_types.values().any(|a| a.id != id && &a.code == code) {
                return Err(unique_violation(
                    "update_activity_type",
                    "activity_types",
                    "code",
                    code,
                ));
            }
        }
        let Some(a) = data.activity_types.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(code) = &patch.code {
            a.code = code.clone();
        }
        if let Some(name) = &patch.name {
            a.name = name.clone();
        }
        if let Some(color) = &patch.color {
            a.color = color.clone();
        }
        Ok(Some(a.clone()))
    }

    async fn delete_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<bool> {
        Ok(self
            .write("delete_activity_type")?
            .activity_types
            .remove(&id)
            .is_some())
    }
}

// =============================================================================
// Time slots
// =============================================================================

fn sorted_slots<'a>(slots: impl Iterator<Item = &'a TimeSlot>) -> Vec<TimeSlot> {
    let mut rows: Vec<_> = slots.cloned().collect();
    rows.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
    rows
}

#[async_trait]
impl TimeSlotRepository for LocalRepository {
    async fn get_time_slot(&self, id: TimeSlotId) -> RepositoryResult<Option<TimeSlot>> {
        Ok(self.read("get_time_slot")?.time_slots.get(&id).cloned())
    }

    async fn list_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        Ok(sorted_slots(self.read("list_time_slots")?.time_slots.values()))
    }

    async fn list_base_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        let data = self.read("list_base_time_slots")?;
        Ok(sorted_slots(
            data.time_slots.values().filter(|s| s.is_base_slot),
        ))
    }

    async fn create_time_slot(&self, slot: &NewTimeSlot) -> RepositoryResult<TimeSlot> {
        let mut data = self.write("create_time_slot")?;
        let id = TimeSlotId(take_id(&mut data.next_time_slot_id));
        let created = TimeSlot {
            id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            interval: slot.interval,
            is_base_slot: slot.is_base_slot,
        };
        data.time_slots.insert(id, created.clone());
        Ok(created)
    }

    async fn update_time_slot(
        &self,
        id: TimeSlotId,
        patch: &TimeSlotPatch,
    ) -> RepositoryResult<Option<TimeSlot>> {
        let mut data = self.write("update_time_slot")?;
        let Some(slot) = data.time_slots.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(start_time) = patch.start_time {
            slot.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            slot.end_time = end_time;
        }
        if let Some(interval) = patch.interval {
            slot.interval = interval;
        }
        if let Some(is_base_slot) = patch.is_base_slot {
            slot.is_base_slot = is_base_slot;
        }
        Ok(Some(slot.clone()))
    }

    async fn delete_time_slot(&self, id: TimeSlotId) -> RepositoryResult<bool> {
        Ok(self.write("delete_time_slot")?.time_slots.remove(&id).is_some())
    }
}

// =============================================================================
// Schedules
// =============================================================================

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        Ok(self.read("get_schedule")?.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        let data = self.read("list_schedules")?;
        let mut rows: Vec<_> = data
            .schedules
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_schedule(&self, schedule: &NewSchedule) -> RepositoryResult<Schedule> {
        let mut data = self.write("create_schedule")?;
        let id = ScheduleId(take_id(&mut data.next_schedule_id));
        let created = Schedule {
            id,
            professional_id: schedule.professional_id,
            weekday: schedule.weekday,
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            activity_code: schedule.activity_code.clone(),
            location: schedule.location.clone(),
            notes: schedule.notes.clone(),
            updated_at: Some(Utc::now()),
        };
        data.schedules.insert(id, created.clone());
        Ok(created)
    }

    async fn update_schedule(
        &self,
        id: ScheduleId,
        patch: &SchedulePatch,
    ) -> RepositoryResult<Option<Schedule>> {
        let mut data = self.write("update_schedule")?;
        let Some(s) = data.schedules.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(professional_id) = patch.professional_id {
            s.professional_id = professional_id;
        }
        if let Some(weekday) = patch.weekday {
            s.weekday = weekday;
        }
        if let Some(start_time) = patch.start_time {
            s.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            s.end_time = end_time;
        }
        if let Some(activity_code) = &patch.activity_code {
            s.activity_code = activity_code.clone();
        }
        if let Some(location) = &patch.location {
            s.location = location.clone();
        }
        if let Some(notes) = &patch.notes {
            s.notes = notes.clone();
        }
        s.updated_at = Some(Utc::now());
        Ok(Some(s.clone()))
    }

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool> {
        Ok(self.write("delete_schedule")?.schedules.remove(&id).is_some())
    }
}

#[async_trait]
impl SchemaStrategy for LocalRepository {
    fn name(&self) -> &str {
        "local"
    }

    async fn create_tables(&self, tables: &[TableDefinition]) -> RepositoryResult<()> {
        let mut data = self.data.write();
        if !data.is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new("create_tables"),
            ));
        }
        data.tables
            .extend(tables.iter().map(|t| t.name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = LocalRepository::new();
        let first = repo
            .create_professional(&NewProfessional::new("A", "A"))
            .await
            .unwrap();
        assert!(repo.delete_professional(first.id).await.unwrap());
        let second = repo
            .create_professional(&NewProfessional::new("B", "B"))
            .await
            .unwrap();
        assert_eq!(second.id, ProfessionalId(2));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_persistence_error() {
        let repo = LocalRepository::new();
        let aula = NewActivityType::new("aula", "Aula", "#3b82f6");
        repo.create_activity_type(&aula).await.unwrap();
        let err = repo.create_activity_type(&aula).await.unwrap_err();
        assert!(err.is_persistence());
        assert!(err.message().contains("activity_types_code_key"));
    }

    #[tokio::test]
    async fn test_unhealthy_reads_and_writes() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(matches!(
            repo.list_time_slots().await,
            Err(RepositoryError::ConnectionError { .. })
        ));
        let err = repo
            .create_time_slot(&NewTimeSlot::base(t("08:00"), t("08:30")))
            .await
            .unwrap_err();
        assert!(err.is_persistence());
        assert!(!repo.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_schedules_sorted_by_start_then_id() {
        let repo = LocalRepository::new();
        for start in ["10:00", "08:00", "08:00"] {
            repo.create_schedule(&NewSchedule {
                professional_id: ProfessionalId(1),
                weekday: Weekday::Segunda,
                start_time: t(start),
                end_time: t("11:00"),
                activity_code: "aula".into(),
                location: None,
                notes: None,
            })
            .await
            .unwrap();
        }
        let ids: Vec<_> = repo
            .list_schedules(&ScheduleFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id.value())
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_clear_keeps_health() {
        let repo = LocalRepository::new();
        repo.create_user(&NewUser {
            username: "admin".into(),
            password: "x".into(),
        })
        .await
        .unwrap();
        repo.set_healthy(false);
        repo.clear();
        assert!(!repo.health_check().await.unwrap());
        repo.set_healthy(true);
        assert!(repo.list_users().await.unwrap().is_empty());
    }
}
