//! Raw-SQL repository implementation using Diesel.
//!
//! Every call is one parameterized statement run through `diesel::sql_query`
//! on an r2d2 pool. Blocking work runs on tokio's blocking pool. There is no
//! retry: a failed statement is reported to the caller (normally the fallback
//! chain) as-is.
//!
//! List reads check `information_schema.tables` first. A missing table is
//! created from its catalog definition and the read returns empty; the rows
//! (if any) are only seen on the next call.
//!
//! Partial updates use `COALESCE($n, column)` so that absent patch fields keep
//! their stored value. Nullable columns carry a separate "present" flag so an
//! explicit null clears them. Column values never reach the SQL text.
//!
//! ## Configuration
//!
//! See [`PostgresConfig::from_env`](crate::db::config::PostgresConfig::from_env).

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{Bool, Integer, Nullable, Text};
use std::time::Duration;
use tokio::task;

use crate::db::bootstrap::SchemaStrategy;
use crate::db::config::PostgresConfig;
use crate::db::models::*;
use crate::db::repository::*;
use crate::db::schema::{self, TableDefinition};
use crate::models::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const USER_COLUMNS: &str = "id, username, password";
const PROFESSIONAL_COLUMNS: &str = "id, name, initials, active";
const ACTIVITY_TYPE_COLUMNS: &str = "id, code, name, color";
const TIME_SLOT_COLUMNS: &str = "id, start_time, end_time, interval_minutes, is_base_slot";
const SCHEDULE_COLUMNS: &str =
    "id, professional_id, weekday, start_time, end_time, activity_code, location, notes, updated_at";

#[derive(QueryableByName)]
struct Presence {
    #[diesel(sql_type = Bool)]
    present: bool,
}

/// Whether `table` exists in the connection's current schema.
fn table_exists(conn: &mut PgConnection, table: &str) -> RepositoryResult<bool> {
    let row = sql_query(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1) AS present",
    )
    .bind::<Text, _>(table)
    .get_result::<Presence>(conn)?;
    Ok(row.present)
}

/// Run a list query, creating the table first if it is missing.
///
/// When the table had to be created the result is empty without running `load`.
fn list_or_create<R, F>(
    conn: &mut PgConnection,
    table: &TableDefinition,
    load: F,
) -> RepositoryResult<Vec<R::Domain>>
where
    R: IntoDomain,
    F: FnOnce(&mut PgConnection) -> QueryResult<Vec<R>>,
{
    if !table_exists(conn, table.name)? {
        log::info!("Table '{}' not found; creating it", table.name);
        sql_query(table.create_statement()).execute(conn)?;
        return Ok(Vec::new());
    }
    decode_rows(load(conn)?)
}

fn decode_optional<R: IntoDomain>(row: QueryResult<R>) -> RepositoryResult<Option<R::Domain>> {
    row.optional()?.map(IntoDomain::into_domain).transpose()
}

/// Diesel-backed repository for Postgres.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl std::fmt::Debug for PostgresRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRepository")
            .field("max_pool_size", &self.config.max_pool_size)
            .finish_non_exhaustive()
    }
}

impl PostgresRepository {
    /// Create a new repository and its connection pool.
    ///
    /// No connection is opened here. An unreachable database fails each call
    /// with `ConnectionError` (`PersistenceError` on writes) instead.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        if config.database_url.trim().is_empty() {
            return Err(RepositoryError::configuration("database URL must not be empty")
                .with_operation("create_pool"));
        }
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build_unchecked(manager);

        log::debug!(
            "Postgres pool configured (max_size={}, min_idle={})",
            config.max_pool_size,
            config.min_pool_size
        );
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Run a blocking database operation on a pooled connection.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection"),
                )
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    async fn read<T, F>(&self, operation: &str, table: &str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        self.with_conn(f)
            .await
            .map_err(|e| e.with_operation(operation).with_entity(table))
    }

    async fn write<T, F>(&self, operation: &str, table: &str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        self.with_conn(f).await.map_err(|e| {
            e.with_operation(operation)
                .with_entity(table)
                .into_persistence()
        })
    }

    async fn delete_by_id(&self, operation: &str, table: &'static str, id: i32) -> RepositoryResult<bool> {
        self.write(operation, table, move |conn| {
            let affected = sql_query(format!("DELETE FROM {} WHERE id = $1", table))
                .bind::<Integer, _>(id)
                .execute(conn)?;
            Ok(affected > 0)
        })
        .await
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        self.read("get_user", "users", move |conn| {
            decode_optional(
                sql_query(format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                    .bind::<Integer, _>(id.value())
                    .get_result::<UserRow>(conn),
            )
        })
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let username = username.to_string();
        self.read("get_user_by_username", "users", move |conn| {
            decode_optional(
                sql_query(format!(
                    "SELECT {} FROM users WHERE username = $1 LIMIT 1",
                    USER_COLUMNS
                ))
                .bind::<Text, _>(username)
                .get_result::<UserRow>(conn),
            )
        })
        .await
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.read("list_users", "users", |conn| {
            list_or_create(conn, &schema::USERS, |conn| {
                sql_query(format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
                    .load::<UserRow>(conn)
            })
        })
        .await
    }

    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let values = UserValues::from(user);
        self.write("create_user", "users", move |conn| {
            let row = sql_query(format!(
                "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING {}",
                USER_COLUMNS
            ))
            .bind::<Nullable<Text>, _>(values.username)
            .bind::<Nullable<Text>, _>(values.password)
            .get_result::<UserRow>(conn)?;
            row.into_domain()
        })
        .await
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> RepositoryResult<Option<User>> {
        let values = UserValues::from(patch);
        if values == UserValues::default() {
            return self.get_user(id).await;
        }
        self.write("update_user", "users", move |conn| {
            decode_optional(
                sql_query(format!(
                    "UPDATE users SET username = COALESCE($2, username), \
                     password = COALESCE($3, password) WHERE id = $1 RETURNING {}",
                    USER_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .bind::<Nullable<Text>, _>(values.username)
                .bind::<Nullable<Text>, _>(values.password)
                .get_result::<UserRow>(conn),
            )
        })
        .await
    }

    async fn delete_user(&self, id: UserId) -> RepositoryResult<bool> {
        self.delete_by_id("delete_user", "users", id.value()).await
    }
}

// =============================================================================
// Professionals
// =============================================================================

#[async_trait]
impl ProfessionalRepository for PostgresRepository {
    async fn get_professional(&self, id: ProfessionalId) -> RepositoryResult<Option<Professional>> {
        self.read("get_professional", "professionals", move |conn| {
            decode_optional(
                sql_query(format!(
                    "SELECT {} FROM professionals WHERE id = $1",
                    PROFESSIONAL_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .get_result::<ProfessionalRow>(conn),
            )
        })
        .await
    }

    async fn list_professionals(&self) -> RepositoryResult<Vec<Professional>> {
        self.read("list_professionals", "professionals", |conn| {
            list_or_create(conn, &schema::PROFESSIONALS, |conn| {
                sql_query(format!(
                    "SELECT {} FROM professionals ORDER BY name, id",
                    PROFESSIONAL_COLUMNS
                ))
                .load::<ProfessionalRow>(conn)
            })
        })
        .await
    }

    async fn create_professional(
        &self,
        professional: &NewProfessional,
    ) -> RepositoryResult<Professional> {
        let values = ProfessionalValues::from(professional);
        self.write("create_professional", "professionals", move |conn| {
            let row = sql_query(format!(
                "INSERT INTO professionals (name, initials, active) \
                 VALUES ($1, $2, COALESCE($3, 1)) RETURNING {}",
                PROFESSIONAL_COLUMNS
            ))
            .bind::<Nullable<Text>, _>(values.name)
            .bind::<Nullable<Text>, _>(values.initials)
            .bind::<Nullable<Integer>, _>(values.active)
            .get_result::<ProfessionalRow>(conn)?;
            row.into_domain()
        })
        .await
    }

    async fn update_professional(
        &self,
        id: ProfessionalId,
        patch: &ProfessionalPatch,
    ) -> RepositoryResult<Option<Professional>> {
        let values = ProfessionalValues::from(patch);
        if values == ProfessionalValues::default() {
            return self.get_professional(id).await;
        }
        self.write("update_professional", "professionals", move |conn| {
            decode_optional(
                sql_query(format!(
                    "UPDATE professionals SET name = COALESCE($2, name), \
                     initials = COALESCE($3, initials), active = COALESCE($4, active) \
                     WHERE id = $1 RETURNING {}",
                    PROFESSIONAL_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .bind::<Nullable<Text>, _>(values.name)
                .bind::<Nullable<Text>, _>(values.initials)
                .bind::<Nullable<Integer>, _>(values.active)
                .get_result::<ProfessionalRow>(conn),
            )
        })
        .await
    }

    async fn delete_professional(&self, id: ProfessionalId) -> RepositoryResult<bool> {
        self.delete_by_id("delete_professional", "professionals", id.value())
            .await
    }
}

// =============================================================================
// Activity types
// =============================================================================

#[async_trait]
impl ActivityTypeRepository for PostgresRepository {
    async fn get_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<Option<ActivityType>> {
        self.read("get_activity_type", "activity_types", move |conn| {
            decode_optional(
                sql_query(format!(
                    "SELECT {} FROM activity_types WHERE id = $1",
                    ACTIVITY_TYPE_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .get_result::<ActivityTypeRow>(conn),
            )
        })
        .await
    }

    async fn get_activity_type_by_code(&self, code: &str) -> RepositoryResult<Option<ActivityType>> {
        let code = code.to_string();
        self.read("get_activity_type_by_code", "activity_types", move |conn| {
            decode_optional(
                sql_query(format!(
                    "SELECT {} FROM activity_types WHERE code = $1 LIMIT 1",
                    ACTIVITY_TYPE_COLUMNS
                ))
                .bind::<Text, _>(code)
                .get_result::<ActivityTypeRow>(conn),
            )
        })
        .await
    }

    async fn list_activity_types(&self) -> RepositoryResult<Vec<ActivityType>> {
        self.read("list_activity_types", "activity_types", |conn| {
            list_or_create(conn, &schema::ACTIVITY_TYPES, |conn| {
                sql_query(format!(
                    "SELECT {} FROM activity_types ORDER BY name, id",
                    ACTIVITY_TYPE_COLUMNS
                ))
                .load::<ActivityTypeRow>(conn)
            })
        })
        .await
    }

    async fn create_activity_type(
        &self,
        activity_type: &NewActivityType,
    ) -> RepositoryResult<ActivityType> {
        let values = ActivityTypeValues::from(activity_type);
        self.write("create_activity_type", "activity_types", move |conn| {
            let row = sql_query(format!(
                "INSERT INTO activity_types (code, name, color) VALUES ($1, $2, $3) RETURNING {}",
                ACTIVITY_TYPE_COLUMNS
            ))
            .bind::<Nullable<Text>, _>(values.code)
            .bind::<Nullable<Text>, _>(values.name)
            .bind::<Nullable<Text>, _>(values.color)
            .get_result::<ActivityTypeRow>(conn)?;
            row.into_domain()
        })
        .await
    }

    async fn update_activity_type(
        &self,
        id: ActivityTypeId,
        patch: &ActivityTypePatch,
    ) -> RepositoryResult<Option<ActivityType>> {
        let values = ActivityTypeValues::from(patch);
        if values == ActivityTypeValues::default() {
            return self.get_activity_type(id).await;
        }
        self.write("update_activity_type", "activity_types", move |conn| {
            decode_optional(
                sql_query(format!(
                    "UPDATE activity_types SET code = COALESCE($2, code), \
                     name = COALESCE($3, name), color = COALESCE($4, color) \
                     WHERE id = $1 RETURNING {}",
                    ACTIVITY_TYPE_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .bind::<Nullable<Text>, _>(values.code)
                .bind::<Nullable<Text>, _>(values.name)
                .bind::<Nullable<Text>, _>(values.color)
                .get_result::<ActivityTypeRow>(conn),
            )
        })
        .await
    }

    async fn delete_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<bool> {
        self.delete_by_id("delete_activity_type", "activity_types", id.value())
            .await
    }
}

// =============================================================================
// Time slots
// =============================================================================

#[async_trait]
impl TimeSlotRepository for PostgresRepository {
    async fn get_time_slot(&self, id: TimeSlotId) -> RepositoryResult<Option<TimeSlot>> {
        self.read("get_time_slot", "time_slots", move |conn| {
            decode_optional(
                sql_query(format!(
                    "SELECT {} FROM time_slots WHERE id = $1",
                    TIME_SLOT_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .get_result::<TimeSlotRow>(conn),
            )
        })
        .await
    }

    async fn list_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        self.read("list_time_slots", "time_slots", |conn| {
            list_or_create(conn, &schema::TIME_SLOTS, |conn| {
                sql_query(format!(
                    "SELECT {} FROM time_slots ORDER BY start_time, id",
                    TIME_SLOT_COLUMNS
                ))
                .load::<TimeSlotRow>(conn)
            })
        })
        .await
    }

    async fn list_base_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>> {
        self.read("list_base_time_slots", "time_slots", |conn| {
            list_or_create(conn, &schema::TIME_SLOTS, |conn| {
                sql_query(format!(
                    "SELECT {} FROM time_slots WHERE is_base_slot <> 0 ORDER BY start_time, id",
                    TIME_SLOT_COLUMNS
                ))
                .load::<TimeSlotRow>(conn)
            })
        })
        .await
    }

    async fn create_time_slot(&self, slot: &NewTimeSlot) -> RepositoryResult<TimeSlot> {
        let values = TimeSlotValues::from(slot);
        self.write("create_time_slot", "time_slots", move |conn| {
            let row = sql_query(format!(
                "INSERT INTO time_slots (start_time, end_time, interval_minutes, is_base_slot) \
                 VALUES ($1, $2, COALESCE($3, 30), COALESCE($4, 1)) RETURNING {}",
                TIME_SLOT_COLUMNS
            ))
            .bind::<Nullable<Text>, _>(values.start_time)
            .bind::<Nullable<Text>, _>(values.end_time)
            .bind::<Nullable<Integer>, _>(values.interval_minutes)
            .bind::<Nullable<Integer>, _>(values.is_base_slot)
            .get_result::<TimeSlotRow>(conn)?;
            row.into_domain()
        })
        .await
    }

    async fn update_time_slot(
        &self,
        id: TimeSlotId,
        patch: &TimeSlotPatch,
    ) -> RepositoryResult<Option<TimeSlot>> {
        let values = TimeSlotValues::from(patch);
        if values == TimeSlotValues::default() {
            return self.get_time_slot(id).await;
        }
        self.write("update_time_slot", "time_slots", move |conn| {
            decode_optional(
                sql_query(format!(
                    "UPDATE time_slots SET start_time = COALESCE($2, start_time), \
                     end_time = COALESCE($3, end_time), \
                     interval_minutes = COALESCE($4, interval_minutes), \
                     is_base_slot = COALESCE($5, is_base_slot) \
                     WHERE id = $1 RETURNING {}",
                    TIME_SLOT_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .bind::<Nullable<Text>, _>(values.start_time)
                .bind::<Nullable<Text>, _>(values.end_time)
                .bind::<Nullable<Integer>, _>(values.interval_minutes)
                .bind::<Nullable<Integer>, _>(values.is_base_slot)
                .get_result::<TimeSlotRow>(conn),
            )
        })
        .await
    }

    async fn delete_time_slot(&self, id: TimeSlotId) -> RepositoryResult<bool> {
        self.delete_by_id("delete_time_slot", "time_slots", id.value())
            .await
    }
}

// =============================================================================
// Schedules
// =============================================================================

#[async_trait]
impl ScheduleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
        .map_err(|e| e.with_operation("health_check"))
    }

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>> {
        self.read("get_schedule", "schedules", move |conn| {
            decode_optional(
                sql_query(format!(
                    "SELECT {} FROM schedules WHERE id = $1",
                    SCHEDULE_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .get_result::<ScheduleRow>(conn),
            )
        })
        .await
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>> {
        let weekday = filter.weekday.map(|d| d.to_string());
        let professional_id = filter.professional_id.map(|id| id.value());
        self.read("list_schedules", "schedules", move |conn| {
            list_or_create(conn, &schema::SCHEDULES, |conn| {
                sql_query(format!(
                    "SELECT {} FROM schedules \
                     WHERE ($1::text IS NULL OR weekday = $1) \
                     AND ($2::integer IS NULL OR professional_id = $2) \
                     ORDER BY start_time, id",
                    SCHEDULE_COLUMNS
                ))
                .bind::<Nullable<Text>, _>(weekday)
                .bind::<Nullable<Integer>, _>(professional_id)
                .load::<ScheduleRow>(conn)
            })
        })
        .await
    }

    async fn create_schedule(&self, schedule: &NewSchedule) -> RepositoryResult<Schedule> {
        let values = ScheduleValues::from(schedule);
        self.write("create_schedule", "schedules", move |conn| {
            let row = sql_query(format!(
                "INSERT INTO schedules \
                 (professional_id, weekday, start_time, end_time, activity_code, location, notes) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
                SCHEDULE_COLUMNS
            ))
            .bind::<Nullable<Integer>, _>(values.professional_id)
            .bind::<Nullable<Text>, _>(values.weekday)
            .bind::<Nullable<Text>, _>(values.start_time)
            .bind::<Nullable<Text>, _>(values.end_time)
            .bind::<Nullable<Text>, _>(values.activity_code)
            .bind::<Nullable<Text>, _>(values.location.flatten())
            .bind::<Nullable<Text>, _>(values.notes.flatten())
            .get_result::<ScheduleRow>(conn)?;
            row.into_domain()
        })
        .await
    }

    async fn update_schedule(
        &self,
        id: ScheduleId,
        patch: &SchedulePatch,
    ) -> RepositoryResult<Option<Schedule>> {
        let values = ScheduleValues::from(patch);
        if values == ScheduleValues::default() {
            return self.get_schedule(id).await;
        }
        self.write("update_schedule", "schedules", move |conn| {
            decode_optional(
                sql_query(format!(
                    "UPDATE schedules SET \
                     professional_id = COALESCE($2, professional_id), \
                     weekday = COALESCE($3, weekday), \
                     start_time = COALESCE($4, start_time), \
                     end_time = COALESCE($5, end_time), \
                     activity_code = COALESCE($6, activity_code), \
                     location = CASE WHEN $9 THEN $7 ELSE location END, \
                     notes = CASE WHEN $10 THEN $8 ELSE notes END, \
                     updated_at = NOW() \
                     WHERE id = $1 RETURNING {}",
                    SCHEDULE_COLUMNS
                ))
                .bind::<Integer, _>(id.value())
                .bind::<Nullable<Integer>, _>(values.professional_id)
                .bind::<Nullable<Text>, _>(values.weekday)
                .bind::<Nullable<Text>, _>(values.start_time)
                .bind::<Nullable<Text>, _>(values.end_time)
                .bind::<Nullable<Text>, _>(values.activity_code)
                .bind::<Nullable<Text>, _>(values.location.clone().flatten())
                .bind::<Nullable<Text>, _>(values.notes.clone().flatten())
                .bind::<Bool, _>(values.location.is_some())
                .bind::<Bool, _>(values.notes.is_some())
                .get_result::<ScheduleRow>(conn),
            )
        })
        .await
    }

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool> {
        self.delete_by_id("delete_schedule", "schedules", id.value())
            .await
    }
}

#[async_trait]
impl SchemaStrategy for PostgresRepository {
    fn name(&self) -> &str {
        "sql"
    }

    async fn create_tables(&self, tables: &[TableDefinition]) -> RepositoryResult<()> {
        let tables = tables.to_vec();
        self.with_conn(move |conn| {
            for table in &tables {
                sql_query(table.create_statement())
                    .execute(conn)
                    .map_err(|e| RepositoryError::from(e).with_entity(table.name))?;
                log::info!("Table '{}' checked/created via SQL", table.name);
            }
            Ok(())
        })
        .await
        .map_err(|e| e.with_operation("create_tables"))
    }
}
