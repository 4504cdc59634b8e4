//! Primary storage adapter over the managed PostgREST API.
//!
//! Every trait call is exactly one table-scoped HTTP request. Result handling
//! per call shape:
//!
//! | Shape | Transport failure | Server error (`ApiError`) |
//! |---|---|---|
//! | single-row read | `ConnectionError` | `Ok(None)`, logged at debug |
//! | list read | `ConnectionError` | `QueryError` |
//! | create / update | `PersistenceError` | `PersistenceError` with the server message |
//! | delete | `PersistenceError` | `Ok(false)`, logged at debug |
//!
//! A single-row read therefore cannot tell "no such row" from "the server
//! refused the query"; callers that need the difference use the list form.

mod client;

pub use client::{decode_response, ApiError, ApiResponse, Query, TableClient};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::db::bootstrap::SchemaStrategy;
use crate::db::config::SupabaseConfig;
use crate::db::models::*;
use crate::db::repository::*;
use crate::db::schema::TableDefinition;
use crate::models::*;

/// RPC installed in the project to run `CREATE TABLE IF NOT EXISTS`.
pub const CREATE_TABLE_RPC: &str = "create_table_if_not_exists";

/// Storage adapter backed by a [`TableClient`].
#[derive(Clone, Debug)]
pub struct RestRepository {
    client: TableClient,
}

impl RestRepository {
    /// Build the adapter. No request is made until the first call.
    pub fn new(config: &SupabaseConfig) -> RepositoryResult<Self> {
        Ok(Self {
            client: TableClient::new(config)?,
        })
    }

    pub fn client(&self) -> &TableClient {
        &self.client
    }

    async fn fetch_one<R>(
        &self,
        operation: &str,
        table: &str,
        query: Query,
    ) -> RepositoryResult<Option<R::Domain>>
    where
        R: DeserializeOwned + IntoDomain,
    {
        let response = self
            .client
            .select::<R>(table, &query.limit(1))
            .await
            .map_err(|e| e.with_operation(operation).with_entity(table))?;
        match response {
            Ok(rows) => rows.into_iter().next().map(IntoDomain::into_domain).transpose(),
            Err(api) => {
                log::debug!("{} on {} answered {}: {}", operation, table, api.status, api);
                Ok(None)
            }
        }
    }

    async fn fetch_all<R>(
        &self,
        operation: &str,
        table: &str,
        query: Query,
    ) -> RepositoryResult<Vec<R::Domain>>
    where
        R: DeserializeOwned + IntoDomain,
    {
        let response = self
            .client
            .select::<R>(table, &query)
            .await
            .map_err(|e| e.with_operation(operation).with_entity(table))?;
        match response {
            Ok(rows) => decode_rows(rows),
            Err(api) => Err(RepositoryError::query_with_context(
                api.message.clone(),
                api.context(operation, table),
            )),
        }
    }

    async fn insert_one<B, R>(
        &self,
        operation: &str,
        table: &str,
        values: &B,
    ) -> RepositoryResult<R::Domain>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + IntoDomain,
    {
        let response = self
            .client
            .insert::<B, R>(table, values)
            .await
            .map_err(|e| e.with_operation(operation).with_entity(table).into_persistence())?;
        match response {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| {
                    RepositoryError::persistence_with_context(
                        "insert returned no rows",
                        ErrorContext::new(operation).with_entity(table),
                    )
                })?
                .into_domain(),
            Err(api) => Err(RepositoryError::persistence_with_context(
                api.message.clone(),
                api.context(operation, table),
            )),
        }
    }

    async fn update_one<B, R>(
        &self,
        operation: &str,
        table: &str,
        id: i32,
        values: &B,
    ) -> RepositoryResult<Option<R::Domain>>
    where
        B: Serialize + Sync + Default + PartialEq,
        R: DeserializeOwned + IntoDomain,
    {
        // Empty patch degenerates to a plain read.
        if *values == B::default() {
            return self
                .fetch_one::<R>(operation, table, Query::all().eq("id", id))
                .await;
        }

        let response = self
            .client
            .update::<B, R>(table, &Query::all().eq("id", id), values)
            .await
            .map_err(|e| {
                e.with_operation(operation)
                    .with_entity(table)
                    .into_persistence()
            })?;
        match response {
            Ok(rows) => rows.into_iter().next().map(IntoDomain::into_domain).transpose(),
            Err(api) => Err(RepositoryError::persistence_with_context(
                api.message.clone(),
                api.context(operation, table).with_entity_id(id),
            )),
        }
    }

    async fn delete_one(&self, operation: &str, table: &str, id: i32) -> RepositoryResult<bool> {
        let response = self
            .client
            .delete::<serde_json::Value>(table, &Query::all().eq("id", id))
            .await
            .map_err(|e| {
                e.with_operation(operation)
                    .with_entity(table)
                    .into_persistence()
            })?;
        match response {
            Ok(rows) => Ok(!rows.is_empty()),
            Err(api) => {
                log::debug!("{} on {} id={} answered {}: {}", operation, table, id, api.status, api);
                Ok(false)
            }
        }
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserRepository for RestRepository {
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.fetch_one::<UserRow>("get_user", "users", Query::all().eq("id", id))
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.fetch_one::<UserRow>(
            "get_user_by_username",
            "users",
            Query::all().eq("username", username),
        )
        .await
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.fetch_all::<UserRow>("list_users", "users", Query::all().order("id.asc"))
            .await
    }

    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        self.insert_one::<_, UserRow>("create_user", "users", &UserValues::from(user))
            .await
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> RepositoryResult<Option<User>> {
        self.update_one::<_, UserRow>("update_user", "users", id.value(), &UserValues::from(patch))
            .await
    }

    async fn delete_user(&self, id: UserId) -> RepositoryResult<bool> {
        self.delete_one("delete_user", "users", id.value()).await
    }
}

// =============================================================================
// Professionals
// =============================================================================

#[async_trait]
impl ProfessionalRepository for RestRepository {
    async fn get_professional(&self, id: ProfessionalId) -> RepositoryResult<Option<Professional>> {
        self.fetch_one::<ProfessionalRow>(
            "get_professional",
            "professionals",
            Query::all().eq("id", id),
        )
        .await
    }

    async fn list_professionals(&self) -> RepositoryResult<Vec<Professional>> {
        self.fetch_all::<ProfessionalRow>(
            "list_professionals",
            "professionals",
            Query::all().order("name.asc,id.asc"),
        )
        .await
    }

    async fn create_professional(
        &self,
        professional: &NewProfessional,
    ) -> RepositoryResult<Professional> {
        self.insert_one::<_, ProfessionalRow>(
            "create_professional",
            "professionals",
            &ProfessionalValues::from(professional),
        )
        .await
    }

    async fn update_professional(
        &self,
        id: ProfessionalId,
        patch: &ProfessionalPatch,
    ) -> RepositoryResult<Option<Professional>> {
        self.update_one::<_, ProfessionalRow>(
            "update_professional",
            "professionals",
            id.value(),
            &ProfessionalValues::from(patch),
        )
        .await
    }

    async fn delete_professional(&self, id: ProfessionalId) -> RepositoryResult<bool> {
        self.delete_one("delete_professional", "professionals", id.value())
            .await
    }
}

// =============================================================================
// Activity types
// =============================================================================

#[async_trait]
impl ActivityTypeRepository for RestRepository {
    async fn get_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<Option<ActivityType>> {
        self.fetch_one::<ActivityTypeRow>(
            "get_activity_type",
            "activity_types",
            Query::all().eq("id", id),
        )
        .await
    }

    async fn get_activity_type_by_code(&self, code: &str) -> RepositoryResult<Option<ActivityType>> {
        self.fetch_one::<ActivityTypeRow>(
            "get_activity_type_by_code",
            "activity_types",
            Query::all().eq("code", code),
        )
        .await
    }

    async fn list_activity_types(&self) -> RepositoryResult<Vec<ActivityType>> {
        self.fetch_all::<ActivityTypeRow>(
            "list_activity_types",
            "activity_types",
            Query::all().order("name.asc,id.asc"),
        )
        .await
    }

    async fn create_activity_type(
        &self,
        activity_type: &NewActivityType,
    ) -> RepositoryResult<ActivityType> {
        self.insert_one::<_, ActivityTypeRow>(
            "create_activity_type",
            "activity_types",
            &ActivityTypeValues::from(activity_type),
        )
        .await
    }

    async fn update_activity_type(
        &self,
        id: ActivityTypeId,
        patch: &ActivityTypePatch,
    ) -> RepositoryResult<Option<ActivityType>> {
        self.update_one::<_, ActivityTypeRow>(
            "update_activity_type",
            "activity_types",
            id.value(),
            &ActivityTypeValues::from(patch),
        )
        .await
    }

    async fn delete_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<bool> {
        self.delete_one("delete_activity_type", "activity_types", id.value())
            .await
    }
}

// =============================================================================
// Time slots
// =============================================================================

#[async_trait]
impl TimeSlotRepository for RestRepository {
    async fn get_time_slot(&self, id: TimeSlotId) -> RepositoryResult<Option<TimeSlot>> {
        self.fetch_one::<TimeSlotRow>("get_time_slot", "time_slots", Query::all().eq("id", id))
            .await
    }

    async fn list_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        self.fetch_all::<TimeSlotRow>(
            "list_time_slots",
            "time_slots",
            Query::all().order("start_time.asc,id.asc"),
        )
        .await
    }

    async fn list_base_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        self.fetch_all::<TimeSlotRow>(
            "list_base_time_slots",
            "time_slots",
            Query::all()
                .eq("is_base_slot", encode_flag(true))
                .order("start_time.asc,id.asc"),
        )
        .await
    }

    async fn create_time_slot(&self, slot: &NewTimeSlot) -> RepositoryResult<TimeSlot> {
        self.insert_one::<_, TimeSlotRow>(
            "create_time_slot",
            "time_slots",
            &TimeSlotValues::from(slot),
        )
        .await
    }

    async fn update_time_slot(
        &self,
        id: TimeSlotId,
        patch: &TimeSlotPatch,
    ) -> RepositoryResult<Option<TimeSlot>> {
        self.update_one::<_, TimeSlotRow>(
            "update_time_slot",
            "time_slots",
            id.value(),
            &TimeSlotValues::from(patch),
        )
        .await
    }

    async fn delete_time_slot(&self, id: TimeSlotId) -> RepositoryResult<bool> {
        self.delete_one("delete_time_slot", "time_slots", id.value())
            .await
    }
}

// =============================================================================
// Schedules
// =============================================================================

fn schedule_query(filter: &ScheduleFilter) -> Query {
    let mut query = Query::all();
    if let Some(weekday) = filter.weekday {
        query = query.eq("weekday", weekday);
    }
    if let Some(professional_id) = filter.professional_id {
        query = query.eq("professional_id", professional_id);
    }
    query.order("start_time.asc,id.asc")
}

#[async_trait]
impl ScheduleRepository for RestRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let response = self
            .client
            .select::<serde_json::Value>("users", &Query::all().limit(1))
            .await
            .map_err(|e| e.with_operation("health_check"))?;
        if let Err(api) = &response {
            log::warn!("PostgREST health check failed: {}", api);
        }
        Ok(response.is_ok())
    }

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        self.fetch_one::<ScheduleRow>("get_schedule", "schedules", Query::all().eq("id", id))
            .await
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        self.fetch_all::<ScheduleRow>("list_schedules", "schedules", schedule_query(filter))
            .await
    }

    async fn create_schedule(&self, schedule: &NewSchedule) -> RepositoryResult<Schedule> {
        self.insert_one::<_, ScheduleRow>(
            "create_schedule",
            "schedules",
            &ScheduleValues::from(schedule),
        )
        .await
    }

    async fn update_schedule(
        &self,
        id: ScheduleId,
        patch: &SchedulePatch,
    ) -> RepositoryResult<Option<Schedule>> {
        let mut values = ScheduleValues::from(patch);
        if values != ScheduleValues::default() {
            values.updated_at = Some(Utc::now());
        }
        self.update_one::<_, ScheduleRow>("update_schedule", "schedules", id.value(), &values)
            .await
    }

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool> {
        self.delete_one("delete_schedule", "schedules", id.value())
            .await
    }
}

#[async_trait]
impl SchemaStrategy for RestRepository {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn create_tables(&self, tables: &[TableDefinition]) -> RepositoryResult<()> {
        for table in tables {
            let args = json!({
                "table_name": table.name,
                "table_definition": table.columns,
            });
            let response = self
                .client
                .rpc(CREATE_TABLE_RPC, &args)
                .await
                .map_err(|e| e.with_operation("create_tables").with_entity(table.name))?;
            if let Err(api) = response {
                return Err(RepositoryError::query_with_context(
                    api.message.clone(),
                    api.context("create_tables", table.name),
                ));
            }
            log::info!("Table '{}' checked/created via RPC", table.name);
        }
        Ok(())
    }
}
