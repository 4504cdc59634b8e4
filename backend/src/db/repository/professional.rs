//! Professional storage operations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{NewProfessional, Professional, ProfessionalId, ProfessionalPatch};

/// Repository trait for professionals.
///
/// Deleting a professional does not cascade to their schedules.
#[async_trait]
pub trait ProfessionalRepository: Send + Sync {
    async fn get_professional(&self, id: ProfessionalId) -> RepositoryResult<Option<Professional>>;

    /// List all professionals ordered by name, inactive ones included.
    async fn list_professionals(&self) -> RepositoryResult<Vec<Professional>>;

    async fn create_professional(
        &self,
        professional: &NewProfessional,
    ) -> RepositoryResult<Professional>;

    async fn update_professional(
        &self,
        id: ProfessionalId,
        patch: &ProfessionalPatch,
    ) -> RepositoryResult<Option<Professional>>;

    async fn delete_professional(&self, id: ProfessionalId) -> RepositoryResult<bool>;
}
