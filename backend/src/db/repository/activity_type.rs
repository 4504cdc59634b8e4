//! Activity type storage operations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{ActivityType, ActivityTypeId, ActivityTypePatch, NewActivityType};

/// Repository trait for activity types.
///
/// `code` is the natural unique key referenced by `Schedule::activity_code`.
#[async_trait]
pub trait ActivityTypeRepository: Send + Sync {
    /// Fetch an activity type by id.
    ///
    /// # Returns
    /// * `Ok(Some(ActivityType))` - The matching row
    /// * `Ok(None)` - No row has this id
    /// * `Err(RepositoryError)` - Transport failure
    async fn get_activity_type(&self, id: ActivityTypeId)
        -> RepositoryResult<Option<ActivityType>>;

    /// Fetch an activity type by its unique code (e.g. `"aula"`).
    async fn get_activity_type_by_code(&self, code: &str)
        -> RepositoryResult<Option<ActivityType>>;

    /// List all activity types ordered by name.
    async fn list_activity_types(&self) -> RepositoryResult<Vec<ActivityType>>;

    /// Insert an activity type.
    ///
    /// # Returns
    /// * `Ok(ActivityType)` - The stored row with its assigned id
    /// * `Err(RepositoryError::PersistenceError)` - Duplicate code or backend failure
    async fn create_activity_type(
        &self,
        activity_type: &NewActivityType,
    ) -> RepositoryResult<ActivityType>;

    async fn update_activity_type(
        &self,
        id: ActivityTypeId,
        patch: &ActivityTypePatch,
    ) -> RepositoryResult<Option<ActivityType>>;

    async fn delete_activity_type(&self, id: ActivityTypeId) -> RepositoryResult<bool>;
}
