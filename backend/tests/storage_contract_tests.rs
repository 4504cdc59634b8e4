//! Repository contract exercised against the in-memory adapter.
//!
//! Every adapter must satisfy these; the local one runs without a backend.

mod support;

use escala::db::repositories::LocalRepository;
use escala::db::repository::*;
use escala::models::*;
use support::t;

fn sample_schedule(professional_id: i32) -> NewSchedule {
    NewSchedule {
        professional_id: ProfessionalId::new(professional_id),
        weekday: Weekday::Segunda,
        start_time: t("08:00"),
        end_time: t("09:30"),
        activity_code: "aula".to_string(),
        location: Some("Sala 101".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn test_empty_tables_list_as_empty() {
    let repo = LocalRepository::new();
    assert!(repo.list_users().await.unwrap().is_empty());
    assert!(repo.list_professionals().await.unwrap().is_empty());
    assert!(repo.list_activity_types().await.unwrap().is_empty());
    assert!(repo.list_time_slots().await.unwrap().is_empty());
    assert!(repo.list_base_time_slots().await.unwrap().is_empty());
    assert!(repo
        .list_schedules(&ScheduleFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_created_rows_read_back() {
    let repo = LocalRepository::new();

    let user = repo
        .create_user(&NewUser {
            username: "coord".into(),
            password: "hash".into(),
        })
        .await
        .unwrap();
    assert_eq!(repo.get_user(user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(
        repo.get_user_by_username("coord").await.unwrap(),
        Some(user)
    );

    let professional = repo
        .create_professional(&NewProfessional::new("Profa. Ana Maria", "AM"))
        .await
        .unwrap();
    assert!(professional.active);
    assert_eq!(
        repo.get_professional(professional.id).await.unwrap(),
        Some(professional)
    );

    let activity = repo
        .create_activity_type(&NewActivityType::new("aula", "Aula", "#3b82f6"))
        .await
        .unwrap();
    assert_eq!(
        repo.get_activity_type_by_code("aula").await.unwrap(),
        Some(activity)
    );

    let slot = repo
        .create_time_slot(&NewTimeSlot::base(t("08:00"), t("08:30")))
        .await
        .unwrap();
    assert_eq!(slot.interval, DEFAULT_SLOT_INTERVAL);
    assert_eq!(repo.get_time_slot(slot.id).await.unwrap(), Some(slot));

    let schedule = repo.create_schedule(&sample_schedule(1)).await.unwrap();
    assert!(schedule.updated_at.is_some());
    let stored = repo.get_schedule(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.location.as_deref(), Some("Sala 101"));
    assert_eq!(stored.notes, None);
    assert_eq!(stored.start_time, t("08:00"));
}

#[tokio::test]
async fn test_schedule_for_unknown_professional_is_accepted() {
    let repo = LocalRepository::new();
    let schedule = repo.create_schedule(&sample_schedule(999)).await.unwrap();
    assert_eq!(schedule.professional_id, ProfessionalId::new(999));
    assert_eq!(
        repo.list_schedules(&ScheduleFilter::by_professional(ProfessionalId::new(999)))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_overlapping_schedules_are_permitted() {
    let repo = LocalRepository::new();
    repo.create_schedule(&sample_schedule(1)).await.unwrap();
    repo.create_schedule(&sample_schedule(1)).await.unwrap();
    assert_eq!(
        repo.list_schedules(&ScheduleFilter::by_day(Weekday::Segunda))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_delete_then_get_is_absent() {
    let repo = LocalRepository::new();
    let professional = repo
        .create_professional(&NewProfessional::new("Prof. Carlos", "CL"))
        .await
        .unwrap();

    assert!(repo.delete_professional(professional.id).await.unwrap());
    assert_eq!(repo.get_professional(professional.id).await.unwrap(), None);
    assert!(!repo.delete_professional(professional.id).await.unwrap());
}

#[tokio::test]
async fn test_update_unknown_id_creates_nothing() {
    let repo = LocalRepository::new();
    let patch = ActivityTypePatch {
        name: Some("Reunião".into()),
        ..Default::default()
    };
    let result = repo
        .update_activity_type(ActivityTypeId::new(42), &patch)
        .await
        .unwrap();
    assert_eq!(result, None);
    assert!(repo.list_activity_types().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_applies_present_fields_only() {
    let repo = LocalRepository::new();
    let slot = repo
        .create_time_slot(&NewTimeSlot::base(t("13:00"), t("13:30")))
        .await
        .unwrap();

    let patch = TimeSlotPatch {
        is_base_slot: Some(false),
        ..Default::default()
    };
    let updated = repo
        .update_time_slot(slot.id, &patch)
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.is_base_slot);
    assert_eq!(updated.start_time, slot.start_time);
    assert_eq!(updated.interval, slot.interval);
    assert!(repo.list_base_time_slots().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_schedule_update_refreshes_timestamp() {
    let repo = LocalRepository::new();
    let schedule = repo.create_schedule(&sample_schedule(1)).await.unwrap();
    let patch = SchedulePatch {
        notes: Some(Some("Reposição".into())),
        ..Default::default()
    };
    let updated = repo
        .update_schedule(schedule.id, &patch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("Reposição"));
    assert!(updated.updated_at >= schedule.updated_at);
}

#[tokio::test]
async fn test_schedule_update_can_clear_nullable_columns() {
    let repo = LocalRepository::new();
    let mut new = sample_schedule(1);
    new.notes = Some("Turma A".into());
    let schedule = repo.create_schedule(&new).await.unwrap();

    let patch: SchedulePatch = serde_json::from_str(r#"{"location": null}"#).unwrap();
    let updated = repo
        .update_schedule(schedule.id, &patch)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.location, None);
    assert_eq!(updated.notes.as_deref(), Some("Turma A"));
    assert_eq!(repo.get_schedule(schedule.id).await.unwrap().unwrap().location, None);
}

#[tokio::test]
async fn test_listing_order() {
    let repo = LocalRepository::new();
    for (name, initials) in [("Profa. Maria", "MM"), ("Prof. Carlos", "CL"), ("Prof. João", "JM")] {
        repo.create_professional(&NewProfessional::new(name, initials))
            .await
            .unwrap();
    }
    let names: Vec<String> = repo
        .list_professionals()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Prof. Carlos", "Prof. João", "Profa. Maria"]);

    for (start, end) in [("13:00", "13:30"), ("08:00", "08:30"), ("10:00", "10:30")] {
        repo.create_time_slot(&NewTimeSlot::base(t(start), t(end)))
            .await
            .unwrap();
    }
    let starts: Vec<String> = repo
        .list_time_slots()
        .await
        .unwrap()
        .iter()
        .map(|s| s.start_time.to_string())
        .collect();
    assert_eq!(starts, vec!["08:00", "10:00", "13:00"]);
}

#[tokio::test]
async fn test_unique_keys_are_enforced() {
    let repo = LocalRepository::new();
    repo.create_activity_type(&NewActivityType::new("aula", "Aula", "#3b82f6"))
        .await
        .unwrap();
    let err = repo
        .create_activity_type(&NewActivityType::new("aula", "Outra", "#000000"))
        .await
        .unwrap_err();
    assert!(err.is_persistence());
    assert!(err.message().contains("activity_types_code_key"));
}

#[tokio::test]
async fn test_unhealthy_backend_errors() {
    let repo = LocalRepository::new();
    repo.set_healthy(false);
    assert!(!repo.health_check().await.unwrap());
    assert!(matches!(
        repo.list_professionals().await,
        Err(RepositoryError::ConnectionError { .. })
    ));
    let err = repo
        .create_professional(&NewProfessional::new("Prof. Paulo", "PP"))
        .await
        .unwrap_err();
    assert!(err.is_persistence());
}
