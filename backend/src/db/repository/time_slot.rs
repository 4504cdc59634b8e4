//! Time slot storage operations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewTimeSlot, TimeSlot, TimeSlotId, TimeSlotPatch};

/// Repository trait for time slots.
///
/// Listings are ordered by start time. `start_time < end_time` is not checked
/// here; callers own that invariant.
#[async_trait]
pub trait TimeSlotRepository: Send + Sync {
    async fn get_time_slot(&self, id: TimeSlotId) -> RepositoryResult<Option<TimeSlot>>;

    /// List every slot ordered by start time.
    async fn list_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>>;

    /// List only slots flagged as base slots, ordered by start time.
    async fn list_base_time_slots(&self) -> RepositoryResult<Vec<TimeSlot>>;

    async fn create_time_slot(&self, time_slot: &NewTimeSlot) -> RepositoryResult<TimeSlot>;

    async fn update_time_slot(
        &self,
        id: TimeSlotId,
        patch: &TimeSlotPatch,
    ) -> RepositoryResult<Option<TimeSlot>>;

    async fn delete_time_slot(&self, id: TimeSlotId) -> RepositoryResult<bool>;
}
