//! Weekly schedule storage operations.
//!
//! This trait also carries the backend health check, since schedules are the
//! core table every deployment must reach.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewSchedule, Schedule, ScheduleFilter, ScheduleId, SchedulePatch};

/// Repository trait for schedule rows.
///
/// `professional_id` and `activity_code` are stored as given: a schedule for a
/// professional that does not exist is accepted, and overlapping schedules for
/// the same professional and day are permitted.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the backend is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Schedule Operations ====================

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Option<Schedule>>;

    /// List schedules matching `filter`, ordered by start time then id.
    async fn list_schedules(&self, filter: &ScheduleFilter) -> RepositoryResult<Vec<Schedule>>;

    /// Insert a schedule row. `updated_at` is set by the backend.
    async fn create_schedule(&self, schedule: &NewSchedule) -> RepositoryResult<Schedule>;

    /// Apply the present fields of `patch` and refresh `updated_at`.
    async fn update_schedule(
        &self,
        id: ScheduleId,
        patch: &SchedulePatch,
    ) -> RepositoryResult<Option<Schedule>>;

    async fn delete_schedule(&self, id: ScheduleId) -> RepositoryResult<bool>;
}
