//! Persistence-boundary row types shared by the REST and SQL adapters.
//!
//! Rows mirror the table columns exactly: snake_case names, `INTEGER` 0/1 for
//! flags, `TEXT` for times and weekday tokens. Domain conversion happens here
//! and nowhere else.
//!
//! `*Values` structs carry column values for writes. Every field is optional:
//! an insert fills them all, a partial update only the ones being changed.
//! The REST adapter serializes them with absent fields skipped; the SQL adapter
//! binds them as nullable parameters behind `COALESCE`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{
    ActivityType, ActivityTypeId, ActivityTypePatch, NewActivityType, NewProfessional,
    NewSchedule, NewTimeSlot, NewUser, Professional, ProfessionalId, ProfessionalPatch, Schedule,
    ScheduleId, SchedulePatch, TimeSlot, TimeSlotId, TimeSlotPatch, User, UserId, UserPatch,
};

/// Encode a domain flag for an `INTEGER` column.
pub fn encode_flag(flag: bool) -> i32 {
    i32::from(flag)
}

/// Decode an `INTEGER` flag column; any non-zero value is `true`.
pub fn decode_flag(value: i32) -> bool {
    value != 0
}

/// Conversion from a stored row into its domain record.
pub trait IntoDomain {
    type Domain;

    fn into_domain(self) -> RepositoryResult<Self::Domain>;
}

/// Decode a batch of rows, failing on the first undecodable one.
pub fn decode_rows<R: IntoDomain>(rows: Vec<R>) -> RepositoryResult<Vec<R::Domain>> {
    rows.into_iter().map(IntoDomain::into_domain).collect()
}

macro_rules! into_domain {
    ($row:ty => try_from $domain:ty) => {
        impl IntoDomain for $row {
            type Domain = $domain;

            fn into_domain(self) -> RepositoryResult<$domain> {
                <$domain>::try_from(self)
            }
        }
    };
    ($row:ty => $domain:ty) => {
        impl IntoDomain for $row {
            type Domain = $domain;

            fn into_domain(self) -> RepositoryResult<$domain> {
                Ok(<$domain>::from(self))
            }
        }
    };
}

into_domain!(UserRow => User);
into_domain!(ProfessionalRow => Professional);
into_domain!(ActivityTypeRow => ActivityType);
into_domain!(TimeSlotRow => try_from TimeSlot);
into_domain!(ScheduleRow => try_from Schedule);

fn decode_error(table: &str, id: i32, message: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::internal_with_context(
        format!("undecodable row: {}", message),
        ErrorContext::new("decode_row")
            .with_entity(table)
            .with_entity_id(id),
    )
}

// =============================================================================
// users
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-repo", derive(diesel::QueryableByName))]
pub struct UserRow {
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub id: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub username: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub password: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            username: row.username,
            password: row.password,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<&NewUser> for UserValues {
    fn from(user: &NewUser) -> Self {
        Self {
            username: Some(user.username.clone()),
            password: Some(user.password.clone()),
        }
    }
}

impl From<&UserPatch> for UserValues {
    fn from(patch: &UserPatch) -> Self {
        Self {
            username: patch.username.clone(),
            password: patch.password.clone(),
        }
    }
}

// =============================================================================
// professionals
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-repo", derive(diesel::QueryableByName))]
pub struct ProfessionalRow {
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub id: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub name: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub initials: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub active: i32,
}

impl From<ProfessionalRow> for Professional {
    fn from(row: ProfessionalRow) -> Self {
        Professional {
            id: ProfessionalId(row.id),
            name: row.name,
            initials: row.initials,
            active: decode_flag(row.active),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfessionalValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<i32>,
}

impl From<&NewProfessional> for ProfessionalValues {
    fn from(p: &NewProfessional) -> Self {
        Self {
            name: Some(p.name.clone()),
            initials: Some(p.initials.clone()),
            active: Some(encode_flag(p.active)),
        }
    }
}

impl From<&ProfessionalPatch> for ProfessionalValues {
    fn from(patch: &ProfessionalPatch) -> Self {
        Self {
            name: patch.name.clone(),
            initials: patch.initials.clone(),
            active: patch.active.map(encode_flag),
        }
    }
}

// =============================================================================
// activity_types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-repo", derive(diesel::QueryableByName))]
pub struct ActivityTypeRow {
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub id: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub code: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub name: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub color: String,
}

impl From<ActivityTypeRow> for ActivityType {
    fn from(row: ActivityTypeRow) -> Self {
        ActivityType {
            id: ActivityTypeId(row.id),
            code: row.code,
            name: row.name,
            color: row.color,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTypeValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&NewActivityType> for ActivityTypeValues {
    fn from(a: &NewActivityType) -> Self {
        Self {
            code: Some(a.code.clone()),
            name: Some(a.name.clone()),
            color: Some(a.color.clone()),
        }
    }
}

impl From<&ActivityTypePatch> for ActivityTypeValues {
    fn from(patch: &ActivityTypePatch) -> Self {
        Self {
            code: patch.code.clone(),
            name: patch.name.clone(),
            color: patch.color.clone(),
        }
    }
}

// =============================================================================
// time_slots
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-repo", derive(diesel::QueryableByName))]
pub struct TimeSlotRow {
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub id: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub start_time: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub end_time: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub interval_minutes: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub is_base_slot: i32,
}

impl TryFrom<TimeSlotRow> for TimeSlot {
    type Error = RepositoryError;

    fn try_from(row: TimeSlotRow) -> RepositoryResult<Self> {
        let start_time = row
            .start_time
            .parse()
            .map_err(|e| decode_error("time_slots", row.id, e))?;
        let end_time = row
            .end_time
            .parse()
            .map_err(|e| decode_error("time_slots", row.id, e))?;
        Ok(TimeSlot {
            id: TimeSlotId(row.id),
            start_time,
            end_time,
            interval: row.interval_minutes,
            is_base_slot: decode_flag(row.is_base_slot),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSlotValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_base_slot: Option<i32>,
}

impl From<&NewTimeSlot> for TimeSlotValues {
    fn from(slot: &NewTimeSlot) -> Self {
        Self {
            start_time: Some(slot.start_time.to_string()),
            end_time: Some(slot.end_time.to_string()),
            interval_minutes: Some(slot.interval),
            is_base_slot: Some(encode_flag(slot.is_base_slot)),
        }
    }
}

impl From<&TimeSlotPatch> for TimeSlotValues {
    fn from(patch: &TimeSlotPatch) -> Self {
        Self {
            start_time: patch.start_time.map(|t| t.to_string()),
            end_time: patch.end_time.map(|t| t.to_string()),
            interval_minutes: patch.interval,
            is_base_slot: patch.is_base_slot.map(encode_flag),
        }
    }
}

// =============================================================================
// schedules
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres-repo", derive(diesel::QueryableByName))]
pub struct ScheduleRow {
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub id: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Integer))]
    pub professional_id: i32,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub weekday: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub start_time: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub end_time: String,
    #[cfg_attr(feature = "postgres-repo", diesel(sql_type = diesel::sql_types::Text))]
    pub activity_code: String,
    #[cfg_attr(
        feature = "postgres-repo",
        diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)
    )]
    #[serde(default)]
    pub location: Option<String>,
    #[cfg_attr(
        feature = "postgres-repo",
        diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)
    )]
    #[serde(default)]
    pub notes: Option<String>,
    #[cfg_attr(
        feature = "postgres-repo",
        diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)
    )]
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = RepositoryError;

    fn try_from(row: ScheduleRow) -> RepositoryResult<Self> {
        let id = row.id;
        Ok(Schedule {
            id: ScheduleId(id),
            professional_id: ProfessionalId(row.professional_id),
            weekday: row
                .weekday
                .parse()
                .map_err(|e| decode_error("schedules", id, e))?,
            start_time: row
                .start_time
                .parse()
                .map_err(|e| decode_error("schedules", id, e))?,
            end_time: row
                .end_time
                .parse()
                .map_err(|e| decode_error("schedules", id, e))?,
            activity_code: row.activity_code,
            location: row.location,
            notes: row.notes,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_code: Option<String>,
    /// `Some(None)` writes NULL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    /// Only sent by clients that cannot use the database clock (REST updates).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&NewSchedule> for ScheduleValues {
    fn from(s: &NewSchedule) -> Self {
        Self {
            professional_id: Some(s.professional_id.value()),
            weekday: Some(s.weekday.to_string()),
            start_time: Some(s.start_time.to_string()),
            end_time: Some(s.end_time.to_string()),
            activity_code: Some(s.activity_code.clone()),
            location: s.location.clone().map(Some),
            notes: s.notes.clone().map(Some),
            updated_at: None,
        }
    }
}

impl From<&SchedulePatch> for ScheduleValues {
    fn from(patch: &SchedulePatch) -> Self {
        Self {
            professional_id: patch.professional_id.map(|id| id.value()),
            weekday: patch.weekday.map(|d| d.to_string()),
            start_time: patch.start_time.map(|t| t.to_string()),
            end_time: patch.end_time.map(|t| t.to_string()),
            activity_code: patch.activity_code.clone(),
            location: patch.location.clone(),
            notes: patch.notes.clone(),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Weekday;

    #[test]
    fn test_flag_round_trip_through_integer_column() {
        assert_eq!(encode_flag(true), 1);
        assert_eq!(encode_flag(false), 0);
        assert!(decode_flag(1));
        assert!(decode_flag(7));
        assert!(!decode_flag(0));
    }

    #[test]
    fn test_patch_values_skip_absent_fields() {
        let patch = ProfessionalPatch {
            active: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_value(ProfessionalValues::from(&patch)).unwrap();
        assert_eq!(json, serde_json::json!({ "active": 0 }));
    }

    #[test]
    fn test_schedule_patch_values_send_explicit_null() {
        let patch = SchedulePatch {
            location: Some(None),
            notes: Some(Some("Física".into())),
            ..Default::default()
        };
        let json = serde_json::to_value(ScheduleValues::from(&patch)).unwrap();
        assert_eq!(json, serde_json::json!({ "location": null, "notes": "Física" }));
        assert_ne!(ScheduleValues::from(&patch), ScheduleValues::default());
    }

    #[test]
    fn test_schedule_row_decodes_from_rest_json() {
        let raw = r#"{
            "id": 4,
            "professional_id": 999,
            "weekday": "quarta",
            "start_time": "13:00",
            "end_time": "14:30",
            "activity_code": "aula",
            "location": null,
            "notes": "Física",
            "updated_at": "2024-03-01T12:00:00.123456+00:00"
        }"#;
        let row: ScheduleRow = serde_json::from_str(raw).unwrap();
        let schedule = Schedule::try_from(row).unwrap();
        assert_eq!(schedule.professional_id, ProfessionalId(999));
        assert_eq!(schedule.weekday, Weekday::Quarta);
        assert_eq!(schedule.location, None);
        assert!(schedule.updated_at.is_some());
    }

    #[test]
    fn test_bad_time_in_row_is_internal_error() {
        let row = TimeSlotRow {
            id: 1,
            start_time: "8h".into(),
            end_time: "08:30".into(),
            interval_minutes: 30,
            is_base_slot: 1,
        };
        let err = TimeSlot::try_from(row).unwrap_err();
        assert!(matches!(err, RepositoryError::InternalError { .. }));
        assert_eq!(err.context().entity.as_deref(), Some("time_slots"));
    }
}
