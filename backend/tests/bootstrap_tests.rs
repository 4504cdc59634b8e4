//! Bootstrap state machine and seeding against the in-memory adapter.

mod support;

use std::sync::Arc;

use escala::db::bootstrap::{BootstrapState, Bootstrapper, SeedEntity, SeedStatus};
use escala::db::repositories::LocalRepository;
use escala::db::repository::*;
use escala::db::schema::ALL_TABLES;
use escala::models::defaults::{DEFAULT_ACTIVITY_TYPES, DEFAULT_PROFESSIONALS, DEFAULT_SCHEDULES};
use escala::models::*;
use support::{t, ScriptedSchema};

fn local_bootstrapper(repo: &LocalRepository) -> Bootstrapper {
    Bootstrapper::new(Arc::new(repo.clone()), vec![Arc::new(repo.clone())])
}

#[tokio::test]
async fn test_bootstrap_from_empty_seeds_catalog() {
    let repo = LocalRepository::new();
    let report = local_bootstrapper(&repo).run().await;

    assert_eq!(report.state, BootstrapState::Ready);
    assert_eq!(report.strategy_used.as_deref(), Some("local"));
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(repo.created_tables().len(), ALL_TABLES.len());

    let codes: Vec<String> = repo
        .list_activity_types()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.code)
        .collect();
    assert_eq!(codes.len(), DEFAULT_ACTIVITY_TYPES.len());
    for (code, _, _) in DEFAULT_ACTIVITY_TYPES.iter() {
        assert!(codes.iter().any(|c| c == code), "missing {}", code);
    }

    let slots = repo.list_time_slots().await.unwrap();
    assert_eq!(slots.len(), 16);
    assert_eq!(slots.first().unwrap().start_time, t("08:00"));
    assert_eq!(slots.last().unwrap().end_time, t("17:00"));
    assert!(slots
        .iter()
        .all(|s| s.interval == 30 && s.is_base_slot && s.start_time < s.end_time));
    assert!(!slots.iter().any(|s| s.start_time == t("12:00")));

    assert_eq!(
        repo.list_professionals().await.unwrap().len(),
        DEFAULT_PROFESSIONALS.len()
    );
    assert_eq!(
        repo.list_schedules(&ScheduleFilter::default())
            .await
            .unwrap()
            .len(),
        DEFAULT_SCHEDULES.len()
    );
}

#[tokio::test]
async fn test_seeded_activity_lookup_by_code() {
    let repo = LocalRepository::new();
    local_bootstrapper(&repo).run().await;

    let aula = repo.get_activity_type_by_code("aula").await.unwrap().unwrap();
    assert!(!aula.name.is_empty());
    assert!(!aula.color.is_empty());
}

#[tokio::test]
async fn test_seeded_schedules_reference_seeded_professionals() {
    let repo = LocalRepository::new();
    local_bootstrapper(&repo).run().await;

    let professionals = repo.list_professionals().await.unwrap();
    let paulo = professionals.iter().find(|p| p.initials == "PP").unwrap();
    let monday = repo
        .list_schedules(&ScheduleFilter {
            weekday: Some(Weekday::Segunda),
            professional_id: Some(paulo.id),
        })
        .await
        .unwrap();
    assert_eq!(monday.len(), 2);
    assert_eq!(monday[0].start_time, t("08:00"));
    assert_eq!(monday[1].activity_code, "reuniao");
}

#[tokio::test]
async fn test_bootstrap_twice_keeps_row_counts() {
    let repo = LocalRepository::new();
    let bootstrapper = local_bootstrapper(&repo);

    bootstrapper.run().await;
    let first = repo.row_counts();

    let second_report = bootstrapper.run().await;
    assert_eq!(repo.row_counts(), first);
    assert_eq!(second_report.state, BootstrapState::Ready);
    assert_eq!(second_report.inserted(), 0);
    assert_eq!(
        second_report.outcome(SeedEntity::TimeSlots),
        Some(&SeedStatus::AlreadyPopulated { existing: 16 })
    );
}

#[tokio::test]
async fn test_populated_tables_are_left_alone() {
    let repo = LocalRepository::new();
    repo.create_activity_type(&NewActivityType::new("custom", "Custom", "#123456"))
        .await
        .unwrap();

    let report = local_bootstrapper(&repo).run().await;
    assert_eq!(
        report.outcome(SeedEntity::ActivityTypes),
        Some(&SeedStatus::AlreadyPopulated { existing: 1 })
    );
    assert_eq!(repo.list_activity_types().await.unwrap().len(), 1);
    assert_eq!(repo.list_time_slots().await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_second_strategy_used_when_first_fails() {
    let repo = LocalRepository::new();
    let rpc = ScriptedSchema::failing("rpc");
    let sql = ScriptedSchema::ok("sql");

    let report = Bootstrapper::new(Arc::new(repo.clone()), vec![rpc.clone(), sql.clone()])
        .run()
        .await;

    assert_eq!(report.state, BootstrapState::Ready);
    assert_eq!(report.strategy_used.as_deref(), Some("sql"));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("rpc:"));
    assert_eq!(rpc.calls().len(), 1);
    assert_eq!(
        sql.calls(),
        vec![ALL_TABLES.iter().map(|t| t.name).collect::<Vec<_>>()]
    );
    assert_eq!(repo.list_time_slots().await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_all_strategies_failing_ends_in_failed() {
    let repo = LocalRepository::new();
    let report = Bootstrapper::new(
        Arc::new(repo.clone()),
        vec![ScriptedSchema::failing("rpc"), ScriptedSchema::failing("sql")],
    )
    .run()
    .await;

    assert_eq!(report.state, BootstrapState::Failed);
    assert!(!report.is_ready());
    assert_eq!(report.strategy_used, None);
    assert_eq!(report.errors.len(), 2);
    assert!(report.seeded.is_empty());
    assert!(repo.list_activity_types().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_strategy_is_a_failure() {
    let repo = LocalRepository::new();
    let report = Bootstrapper::new(Arc::new(repo), Vec::new()).run().await;
    assert_eq!(report.state, BootstrapState::Failed);
    assert_eq!(report.errors, vec!["no schema strategy configured"]);
}

#[tokio::test]
async fn test_seed_failures_are_recorded_and_seeding_continues() {
    let repo = LocalRepository::new();
    repo.set_healthy(false);

    let report = Bootstrapper::new(Arc::new(repo.clone()), vec![ScriptedSchema::ok("sql")])
        .run()
        .await;

    assert_eq!(report.state, BootstrapState::Ready);
    assert_eq!(report.seeded.len(), 4);
    assert_eq!(report.errors.len(), 4);
    assert!(report
        .seeded
        .iter()
        .all(|o| matches!(o.status, SeedStatus::Failed { inserted: 0, .. })));
    assert_eq!(report.inserted(), 0);
}

#[tokio::test]
async fn test_unresolved_schedule_initials_are_skipped() {
    let repo = LocalRepository::new();
    // Professionals already present, but none with seed initials.
    repo.create_professional(&NewProfessional::new("Someone Else", "SE"))
        .await
        .unwrap();

    let report = local_bootstrapper(&repo).run().await;
    assert_eq!(
        report.outcome(SeedEntity::Schedules),
        Some(&SeedStatus::Seeded {
            inserted: 0,
            skipped: DEFAULT_SCHEDULES.len(),
        })
    );
    assert!(repo
        .list_schedules(&ScheduleFilter::default())
        .await
        .unwrap()
        .is_empty());
}
