//! Data Transfer Objects for the HTTP API.
//!
//! Entity bodies are the domain types from [`crate::models`] themselves; this
//! module only holds query strings and the service-level responses.

use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::models::{ProfessionalId, ScheduleFilter, Weekday};

pub const SERVICE_NAME: &str = "Sistema de Gerenciamento de Escalas";
pub const SERVICE_VERSION: &str = "1.0.0";

/// Parse a positive numeric id from a query string value.
///
/// Absent, non-numeric and non-positive values are all "no id".
pub fn parse_id(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse::<i32>().ok())
        .filter(|id| *id > 0)
}

/// `?id=` for professionals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn id(&self) -> Option<i32> {
        parse_id(self.id.as_deref())
    }
}

/// `?id=` or `?code=` for activity types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityTypeQuery {
    pub id: Option<String>,
    pub code: Option<String>,
}

/// `?id=` or `?base=true` for time slots.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSlotQuery {
    pub id: Option<String>,
    pub base: Option<String>,
}

impl TimeSlotQuery {
    pub fn base_only(&self) -> bool {
        matches!(
            self.base.as_deref().map(str::trim),
            Some("true") | Some("1")
        )
    }
}

/// `?id=`, `?weekday=` and `?professionalId=` for schedules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub id: Option<String>,
    pub weekday: Option<String>,
    pub professional_id: Option<String>,
}

impl ScheduleQuery {
    pub fn filter(&self) -> Result<ScheduleFilter, AppError> {
        let weekday = match self.weekday.as_deref() {
            Some(raw) => Some(raw.parse::<Weekday>().map_err(AppError::invalid_data)?),
            None => None,
        };
        let professional_id = match self.professional_id.as_deref() {
            Some(raw) => Some(ProfessionalId::new(parse_id(Some(raw)).ok_or_else(|| {
                AppError::invalid_data(format!("invalid professionalId '{}'", raw))
            })?)),
            None => None,
        };
        Ok(ScheduleFilter {
            weekday,
            professional_id,
        })
    }
}

/// Response for `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub timestamp: String,
    pub environment: String,
    pub service: String,
    pub version: String,
}

/// Response for `GET /api`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub endpoints: Vec<String>,
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}
