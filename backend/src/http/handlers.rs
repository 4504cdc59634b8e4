//! HTTP handlers for the REST API.
//!
//! Entity endpoints follow one shape, selected by method and query string:
//!
//! | Method | Query | Success | Failure |
//! |---|---|---|---|
//! | GET | none / filters | 200 list | 500 |
//! | GET | `id` | 200 row | 404 |
//! | POST | | 201 row | 400 invalid or rejected body |
//! | PUT | `id` | 200 row | 400 no id or invalid body, 404 unknown id |
//! | DELETE | `id` | 204 | 400 no id, 404 unknown id, 500 not deleted |
//!
//! Writes go through [`crate::db::services`] so bodies are validated first.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};

use super::dto::{
    parse_id, ActivityTypeQuery, HealthResponse, IdQuery, IndexResponse, ScheduleQuery,
    StatusResponse, TimeSlotQuery, SERVICE_NAME, SERVICE_VERSION,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::config::environment_name;
use crate::db::diagnose::{self as probe, DiagnoseReport};
use crate::db::repository::{
    ActivityTypeRepository, ProfessionalRepository, RepositoryResult, ScheduleRepository,
    TimeSlotRepository,
};
use crate::db::services;
use crate::models::*;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Result type for create handlers (201 + row).
pub type CreatedResult<T> = Result<(StatusCode, Json<T>), AppError>;

const PROFESSIONAL: &str = "Professional";
const ACTIVITY_TYPE: &str = "Activity type";
const TIME_SLOT: &str = "Time slot";
const SCHEDULE: &str = "Schedule";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn require_id(raw: Option<&str>) -> Result<i32, AppError> {
    parse_id(raw).ok_or_else(AppError::missing_id)
}

fn one<T: serde::Serialize>(row: Option<T>, what: &str) -> Result<Response, AppError> {
    row.map(|r| Json(r).into_response())
        .ok_or_else(|| AppError::not_found(what))
}

fn created<T>(result: RepositoryResult<T>) -> CreatedResult<T> {
    result
        .map(|row| (StatusCode::CREATED, Json(row)))
        .map_err(AppError::rejected_write)
}

fn updated<T>(result: RepositoryResult<Option<T>>, what: &str) -> HandlerResult<T> {
    result
        .map_err(AppError::rejected_write)?
        .map(Json)
        .ok_or_else(|| AppError::not_found(what))
}

fn deleted(result: RepositoryResult<bool>, what: &str) -> Result<StatusCode, AppError> {
    match result {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(AppError::internal(
            format!("Failed to delete {}", what.to_lowercase()),
            None,
        )),
        Err(e) => Err(AppError::internal(
            "Failed to process request",
            Some(e.message().to_string()),
        )),
    }
}

// =============================================================================
// Service endpoints
// =============================================================================

/// GET /api
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "online".to_string(),
        message: format!("{} API is running", SERVICE_NAME),
        timestamp: now_iso(),
        endpoints: [
            "/api/status",
            "/api/diagnose",
            "/api/professionals",
            "/api/activity-types",
            "/api/time-slots",
            "/api/schedules",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    })
}

/// GET /api/status
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".to_string(),
        timestamp: now_iso(),
        environment: environment_name(),
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}

/// GET /api/diagnose
///
/// Opens a dedicated connection; 500 only when no database URL is configured.
pub async fn diagnose(State(state): State<AppState>) -> (StatusCode, Json<DiagnoseReport>) {
    let report = probe::run(state.database_url.clone()).await;
    let status =
        StatusCode::from_u16(report.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(report))
}

/// GET /health
///
/// Reports whether the storage backend answers.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: SERVICE_VERSION.to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Professionals
// =============================================================================

/// GET /api/professionals[?id=]
pub async fn get_professionals(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Response, AppError> {
    let repo = state.repository.as_ref();
    if query.id.is_some() {
        let id = ProfessionalId::new(require_id(query.id.as_deref())?);
        return one(repo.get_professional(id).await?, PROFESSIONAL);
    }
    Ok(Json(repo.list_professionals().await?).into_response())
}

/// POST /api/professionals
pub async fn create_professional(
    State(state): State<AppState>,
    payload: Result<Json<NewProfessional>, JsonRejection>,
) -> CreatedResult<Professional> {
    let Json(new) = payload?;
    created(services::create_professional(state.repository.as_ref(), &new).await)
}

/// PUT /api/professionals?id=
pub async fn update_professional(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: Result<Json<ProfessionalPatch>, JsonRejection>,
) -> HandlerResult<Professional> {
    let id = ProfessionalId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_professional(id).await?.is_none() {
        return Err(AppError::not_found(PROFESSIONAL));
    }
    let Json(patch) = payload?;
    updated(
        services::update_professional(repo, id, &patch).await,
        PROFESSIONAL,
    )
}

/// DELETE /api/professionals?id=
pub async fn delete_professional(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    let id = ProfessionalId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_professional(id).await?.is_none() {
        return Err(AppError::not_found(PROFESSIONAL));
    }
    deleted(repo.delete_professional(id).await, PROFESSIONAL)
}

// =============================================================================
// Activity types
// =============================================================================

/// GET /api/activity-types[?id=|?code=]
pub async fn get_activity_types(
    State(state): State<AppState>,
    Query(query): Query<ActivityTypeQuery>,
) -> Result<Response, AppError> {
    let repo = state.repository.as_ref();
    if query.id.is_some() {
        let id = ActivityTypeId::new(require_id(query.id.as_deref())?);
        return one(repo.get_activity_type(id).await?, ACTIVITY_TYPE);
    }
    if let Some(code) = query.code.as_deref() {
        return one(repo.get_activity_type_by_code(code).await?, ACTIVITY_TYPE);
    }
    Ok(Json(repo.list_activity_types().await?).into_response())
}

/// POST /api/activity-types
pub async fn create_activity_type(
    State(state): State<AppState>,
    payload: Result<Json<NewActivityType>, JsonRejection>,
) -> CreatedResult<ActivityType> {
    let Json(new) = payload?;
    created(services::create_activity_type(state.repository.as_ref(), &new).await)
}

/// PUT /api/activity-types?id=
pub async fn update_activity_type(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: Result<Json<ActivityTypePatch>, JsonRejection>,
) -> HandlerResult<ActivityType> {
    let id = ActivityTypeId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_activity_type(id).await?.is_none() {
        return Err(AppError::not_found(ACTIVITY_TYPE));
    }
    let Json(patch) = payload?;
    updated(
        services::update_activity_type(repo, id, &patch).await,
        ACTIVITY_TYPE,
    )
}

/// DELETE /api/activity-types?id=
pub async fn delete_activity_type(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    let id = ActivityTypeId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_activity_type(id).await?.is_none() {
        return Err(AppError::not_found(ACTIVITY_TYPE));
    }
    deleted(repo.delete_activity_type(id).await, ACTIVITY_TYPE)
}

// =============================================================================
// Time slots
// =============================================================================

/// GET /api/time-slots[?id=|?base=true]
pub async fn get_time_slots(
    State(state): State<AppState>,
    Query(query): Query<TimeSlotQuery>,
) -> Result<Response, AppError> {
    let repo = state.repository.as_ref();
    if query.id.is_some() {
        let id = TimeSlotId::new(require_id(query.id.as_deref())?);
        return one(repo.get_time_slot(id).await?, TIME_SLOT);
    }
    let slots = if query.base_only() {
        repo.list_base_time_slots().await?
    } else {
        repo.list_time_slots().await?
    };
    Ok(Json(slots).into_response())
}

/// POST /api/time-slots
pub async fn create_time_slot(
    State(state): State<AppState>,
    payload: Result<Json<NewTimeSlot>, JsonRejection>,
) -> CreatedResult<TimeSlot> {
    let Json(new) = payload?;
    created(services::create_time_slot(state.repository.as_ref(), &new).await)
}

/// PUT /api/time-slots?id=
pub async fn update_time_slot(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: Result<Json<TimeSlotPatch>, JsonRejection>,
) -> HandlerResult<TimeSlot> {
    let id = TimeSlotId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_time_slot(id).await?.is_none() {
        return Err(AppError::not_found(TIME_SLOT));
    }
    let Json(patch) = payload?;
    updated(services::update_time_slot(repo, id, &patch).await, TIME_SLOT)
}

/// DELETE /api/time-slots?id=
pub async fn delete_time_slot(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    let id = TimeSlotId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_time_slot(id).await?.is_none() {
        return Err(AppError::not_found(TIME_SLOT));
    }
    deleted(repo.delete_time_slot(id).await, TIME_SLOT)
}

// =============================================================================
// Schedules
// =============================================================================

/// GET /api/schedules[?id=|?weekday=&professionalId=]
pub async fn get_schedules(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Response, AppError> {
    let repo = state.repository.as_ref();
    if query.id.is_some() {
        let id = ScheduleId::new(require_id(query.id.as_deref())?);
        return one(repo.get_schedule(id).await?, SCHEDULE);
    }
    let filter = query.filter()?;
    Ok(Json(repo.list_schedules(&filter).await?).into_response())
}

/// GET /api/schedules/{weekday}
pub async fn get_schedules_by_day(
    State(state): State<AppState>,
    Path(weekday): Path<String>,
) -> HandlerResult<Vec<Schedule>> {
    let weekday: Weekday = weekday.parse().map_err(AppError::invalid_data)?;
    let schedules = state
        .repository
        .list_schedules(&ScheduleFilter::by_day(weekday))
        .await?;
    Ok(Json(schedules))
}

/// POST /api/schedules
pub async fn create_schedule(
    State(state): State<AppState>,
    payload: Result<Json<NewSchedule>, JsonRejection>,
) -> CreatedResult<Schedule> {
    let Json(new) = payload?;
    created(services::create_schedule(state.repository.as_ref(), &new).await)
}

/// PUT /api/schedules?id=
pub async fn update_schedule(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: Result<Json<SchedulePatch>, JsonRejection>,
) -> HandlerResult<Schedule> {
    let id = ScheduleId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_schedule(id).await?.is_none() {
        return Err(AppError::not_found(SCHEDULE));
    }
    let Json(patch) = payload?;
    updated(services::update_schedule(repo, id, &patch).await, SCHEDULE)
}

/// DELETE /api/schedules?id=
pub async fn delete_schedule(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode, AppError> {
    let id = ScheduleId::new(require_id(query.id.as_deref())?);
    let repo = state.repository.as_ref();
    if repo.get_schedule(id).await?.is_none() {
        return Err(AppError::not_found(SCHEDULE));
    }
    deleted(repo.delete_schedule(id).await, SCHEDULE)
}
