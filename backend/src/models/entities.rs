//! Domain records for the five persisted entity kinds.
//!
//! Each entity comes in three shapes:
//! - the stored record (server-assigned id and defaults filled in),
//! - an insertable `New*` form,
//! - a partial `*Patch` form where every field is optional.
//!
//! Cross-entity references (`professional_id`, `activity_code`) are plain keys;
//! the storage layer never resolves or enforces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::time::{ClockTime, Weekday};
use super::validation::{not_blank, Validate};
use crate::define_id_type;

define_id_type!(i32, UserId);
define_id_type!(i32, ProfessionalId);
define_id_type!(i32, ActivityTypeId);
define_id_type!(i32, TimeSlotId);
define_id_type!(i32, ScheduleId);

/// Default length of a time slot, in minutes.
pub const DEFAULT_SLOT_INTERVAL: i32 = 30;

fn default_true() -> bool {
    true
}

fn default_interval() -> i32 {
    DEFAULT_SLOT_INTERVAL
}

/// Reads a nullable column in a patch: absent is `None`, `null` is `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UserPatch {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

// =============================================================================
// Professional
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    pub name: String,
    pub initials: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewProfessional {
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub initials: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl NewProfessional {
    pub fn new(name: impl Into<String>, initials: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initials: initials.into(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProfessionalPatch {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub initials: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

// =============================================================================
// Activity type
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: ActivityTypeId,
    pub code: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewActivityType {
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub code: String,
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub color: String,
}

impl NewActivityType {
    pub fn new(code: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ActivityTypePatch {
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub code: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub color: Option<String>,
}

// =============================================================================
// Time slot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub interval: i32,
    pub is_base_slot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeSlot {
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default = "default_interval")]
    #[validate(range(min = 1, message = "must be positive"))]
    pub interval: i32,
    #[serde(default = "default_true")]
    pub is_base_slot: bool,
}

impl NewTimeSlot {
    /// A base slot with the default interval.
    pub fn base(start_time: ClockTime, end_time: ClockTime) -> Self {
        Self {
            start_time,
            end_time,
            interval: DEFAULT_SLOT_INTERVAL,
            is_base_slot: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotPatch {
    #[serde(default)]
    pub start_time: Option<ClockTime>,
    #[serde(default)]
    pub end_time: Option<ClockTime>,
    #[serde(default)]
    #[validate(range(min = 1, message = "must be positive"))]
    pub interval: Option<i32>,
    #[serde(default)]
    pub is_base_slot: Option<bool>,
}

// =============================================================================
// Schedule
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: ScheduleId,
    pub professional_id: ProfessionalId,
    pub weekday: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub activity_code: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub professional_id: ProfessionalId,
    pub weekday: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub activity_code: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePatch {
    #[serde(default)]
    pub professional_id: Option<ProfessionalId>,
    #[serde(default)]
    pub weekday: Option<Weekday>,
    #[serde(default)]
    pub start_time: Option<ClockTime>,
    #[serde(default)]
    pub end_time: Option<ClockTime>,
    #[serde(default)]
    #[validate(length(min = 1, message = "must not be empty"), custom(function = "not_blank"))]
    pub activity_code: Option<String>,
    /// `null` clears the stored value.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    /// `null` clears the stored value.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

/// Filter for schedule listings. Both criteria are optional and combine with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    #[serde(default)]
    pub weekday: Option<Weekday>,
    #[serde(default)]
    pub professional_id: Option<ProfessionalId>,
}

impl ScheduleFilter {
    pub fn by_day(weekday: Weekday) -> Self {
        Self {
            weekday: Some(weekday),
            professional_id: None,
        }
    }

    pub fn by_professional(professional_id: ProfessionalId) -> Self {
        Self {
            weekday: None,
            professional_id: Some(professional_id),
        }
    }

    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.weekday.map_or(true, |day| schedule.weekday == day)
            && self
                .professional_id
                .map_or(true, |id| schedule.professional_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validation::field_messages;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_professional_defaults_active() {
        let p: NewProfessional =
            serde_json::from_str(r#"{"name":"Prof. Paulo","initials":"PP"}"#).unwrap();
        assert!(p.active);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_new_professional_requires_name() {
        let p = NewProfessional::new("", "PP");
        let err = p.validate().unwrap_err();
        assert_eq!(
            field_messages(&err),
            vec![("name".to_string(), "must not be empty".to_string())]
        );
    }

    #[test]
    fn test_activity_type_requires_code_name_color() {
        let err = NewActivityType::new(" ", "", "").validate().unwrap_err();
        let fields: Vec<String> = field_messages(&err).into_iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["code", "color", "name"]);
    }

    #[test]
    fn test_time_slot_wire_format_is_camel_case() {
        let slot: NewTimeSlot =
            serde_json::from_str(r#"{"startTime":"08:00","endTime":"08:30"}"#).unwrap();
        assert_eq!(slot.interval, DEFAULT_SLOT_INTERVAL);
        assert!(slot.is_base_slot);

        let stored = TimeSlot {
            id: TimeSlotId(3),
            start_time: t("08:00"),
            end_time: t("08:30"),
            interval: 30,
            is_base_slot: true,
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["startTime"], "08:00");
        assert_eq!(json["isBaseSlot"], true);
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn test_time_slot_rejects_non_positive_interval() {
        let mut slot = NewTimeSlot::base(t("08:00"), t("08:30"));
        slot.interval = 0;
        assert!(slot.validate().is_err());
        let patch = TimeSlotPatch {
            interval: Some(-5),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_schedule_patch_tells_null_from_absent() {
        let cleared: SchedulePatch = serde_json::from_str(r#"{"location":null}"#).unwrap();
        assert_eq!(cleared.location, Some(None));
        assert_eq!(cleared.notes, None);

        let set: SchedulePatch = serde_json::from_str(r#"{"notes":"Reposição"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("Reposição".to_string())));

        let json = serde_json::to_value(&cleared).unwrap();
        assert!(json["location"].is_null());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn test_schedule_rejects_unknown_weekday() {
        let raw = r#"{"professionalId":1,"weekday":"monday","startTime":"08:00","endTime":"09:00","activityCode":"aula"}"#;
        assert!(serde_json::from_str::<NewSchedule>(raw).is_err());
    }

    #[test]
    fn test_schedule_filter_matches() {
        let schedule = Schedule {
            id: ScheduleId(1),
            professional_id: ProfessionalId(2),
            weekday: Weekday::Segunda,
            start_time: t("08:00"),
            end_time: t("09:30"),
            activity_code: "aula".into(),
            location: None,
            notes: None,
            updated_at: None,
        };
        assert!(ScheduleFilter::default().matches(&schedule));
        assert!(ScheduleFilter::by_day(Weekday::Segunda).matches(&schedule));
        assert!(!ScheduleFilter::by_day(Weekday::Terca).matches(&schedule));
        assert!(!ScheduleFilter::by_professional(ProfessionalId(9)).matches(&schedule));
    }

    #[test]
    fn test_id_parses_from_query_text() {
        assert_eq!(" 42".parse::<ProfessionalId>().unwrap(), ProfessionalId(42));
        assert!("abc".parse::<ScheduleId>().is_err());
    }
}
