//! Validated write operations.
//!
//! Adapters trust their input; every create/update coming from outside the
//! crate goes through here first so that malformed records are rejected with
//! a `ValidationError` before any round trip.

use super::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::*;

macro_rules! validated_writes {
    ($( $create:ident / $update:ident : $new:ty, $patch:ty => $entity:ty, $id:ty );* $(;)?) => {
        $(
            pub async fn $create<R: FullRepository + ?Sized>(
                repo: &R,
                new: &$new,
            ) -> RepositoryResult<$entity> {
                new.validate()
                    .map_err(|e| RepositoryError::from(e).with_operation(stringify!($create)))?;
                repo.$create(new).await
            }

            pub async fn $update<R: FullRepository + ?Sized>(
                repo: &R,
                id: $id,
                patch: &$patch,
            ) -> RepositoryResult<Option<$entity>> {
                patch
                    .validate()
                    .map_err(|e| RepositoryError::from(e).with_operation(stringify!($update)))?;
                repo.$update(id, patch).await
            }
        )*
    };
}

validated_writes! {
    create_user / update_user: NewUser, UserPatch => User, UserId;
    create_professional / update_professional: NewProfessional, ProfessionalPatch => Professional, ProfessionalId;
    create_activity_type / update_activity_type: NewActivityType, ActivityTypePatch => ActivityType, ActivityTypeId;
    create_time_slot / update_time_slot: NewTimeSlot, TimeSlotPatch => TimeSlot, TimeSlotId;
    create_schedule / update_schedule: NewSchedule, SchedulePatch => Schedule, ScheduleId;
}

#[cfg(all(test, feature = "local-repo"))]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::ProfessionalRepository;

    #[tokio::test]
    async fn test_invalid_create_never_reaches_storage() {
        let repo = LocalRepository::new();
        let err = create_professional(&repo, &NewProfessional::new("  ", "PP"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(err.context().operation.as_deref(), Some("create_professional"));
        assert!(repo.list_professionals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_valid_patch_is_applied() {
        let repo = LocalRepository::new();
        let created = create_professional(&repo, &NewProfessional::new("Prof. Paulo", "PP"))
            .await
            .unwrap();
        let patch = ProfessionalPatch {
            active: Some(false),
            ..Default::default()
        };
        let updated = update_professional(&repo, created.id, &patch)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.active);
    }

    #[tokio::test]
    async fn test_blank_patch_field_is_rejected() {
        let repo = LocalRepository::new();
        let patch = TimeSlotPatch {
            interval: Some(0),
            ..Default::default()
        };
        let err = update_time_slot(&repo, TimeSlotId::new(1), &patch)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("interval"));
    }
}
