//! User storage operations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewUser, User, UserId, UserPatch};

/// Repository trait for users.
///
/// `username` is the natural unique key; the backend enforces uniqueness and
/// reports a duplicate as a `PersistenceError` on create/update.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by id. `Ok(None)` when no row matches.
    async fn get_user(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// Fetch a user by its unique username.
    async fn get_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>>;

    /// List all users ordered by username.
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;

    /// Insert a user; the backend assigns the id.
    async fn create_user(&self, user: &NewUser) -> RepositoryResult<User>;

    /// Apply the present fields of `patch`. `Ok(None)` when `id` matches nothing.
    async fn update_user(&self, id: UserId, patch: &UserPatch) -> RepositoryResult<Option<User>>;

    /// Delete a user. `Ok(false)` when nothing was removed.
    async fn delete_user(&self, id: UserId) -> RepositoryResult<bool>;
}
