//! Adapter chain behaviour with in-memory adapters standing in for the
//! REST and SQL backends.

use std::sync::Arc;

use escala::db::fallback::{FallbackPolicy, FallbackRepository, NamedAdapter};
use escala::db::repositories::LocalRepository;
use escala::db::repository::*;
use escala::models::*;

struct Chain {
    rest: LocalRepository,
    sql: LocalRepository,
    chain: FallbackRepository,
}

fn chain(policy: FallbackPolicy) -> Chain {
    let rest = LocalRepository::new();
    let sql = LocalRepository::new();
    let chain = FallbackRepository::new(
        vec![
            NamedAdapter::new("rest", Arc::new(rest.clone())),
            NamedAdapter::new("postgres", Arc::new(sql.clone())),
        ],
        policy,
    )
    .unwrap();
    Chain { rest, sql, chain }
}

#[tokio::test]
async fn test_reads_fall_through_to_second_adapter() {
    let c = chain(FallbackPolicy::FirstSuccess);
    let stored = c
        .sql
        .create_activity_type(&NewActivityType::new("aula", "Aula", "#3b82f6"))
        .await
        .unwrap();
    c.rest.set_healthy(false);

    assert_eq!(c.chain.list_activity_types().await.unwrap(), vec![stored.clone()]);
    assert_eq!(
        c.chain.get_activity_type_by_code("aula").await.unwrap(),
        Some(stored)
    );
    assert!(c.chain.health_check().await.unwrap());
}

#[tokio::test]
async fn test_reads_degrade_to_empty_when_all_fail() {
    let c = chain(FallbackPolicy::FirstSuccess);
    c.rest.set_healthy(false);
    c.sql.set_healthy(false);

    assert!(c.chain.list_professionals().await.unwrap().is_empty());
    assert!(c
        .chain
        .list_schedules(&ScheduleFilter::by_day(Weekday::Sexta))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        c.chain.get_professional(ProfessionalId::new(1)).await.unwrap(),
        None
    );
    assert_eq!(c.chain.get_user_by_username("coord").await.unwrap(), None);
    assert!(!c.chain.health_check().await.unwrap());
}

#[tokio::test]
async fn test_writes_surface_error_when_all_fail() {
    let c = chain(FallbackPolicy::FirstSuccess);
    c.rest.set_healthy(false);
    c.sql.set_healthy(false);

    let err = c
        .chain
        .create_professional(&NewProfessional::new("Prof. Paulo", "PP"))
        .await
        .unwrap_err();
    assert!(err.is_persistence());
    assert_eq!(err.message(), "Database is not healthy");
}

#[tokio::test]
async fn test_write_goes_to_second_adapter_when_first_fails() {
    let c = chain(FallbackPolicy::FirstSuccess);
    c.rest.set_healthy(false);

    let created = c
        .chain
        .create_time_slot(&NewTimeSlot::base(
            "08:00".parse().unwrap(),
            "08:30".parse().unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(c.sql.get_time_slot(created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn test_constraint_violation_on_primary_falls_through() {
    // A rejected write on the first adapter is still a failure there, so the
    // chain tries the next adapter.
    let c = chain(FallbackPolicy::FirstSuccess);
    let new_user = NewUser {
        username: "coord".into(),
        password: "x".into(),
    };
    c.rest.create_user(&new_user).await.unwrap();

    c.chain.create_user(&new_user).await.unwrap();
    assert_eq!(c.sql.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_and_update_absent_rows() {
    let c = chain(FallbackPolicy::FirstSuccess);
    assert!(!c.chain.delete_schedule(ScheduleId::new(5)).await.unwrap());
    assert_eq!(
        c.chain
            .update_schedule(ScheduleId::new(5), &SchedulePatch::default())
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_primary_only_ignores_second_adapter() {
    let c = chain(FallbackPolicy::PrimaryOnly);
    c.sql
        .create_professional(&NewProfessional::new("Prof. Paulo", "PP"))
        .await
        .unwrap();

    assert!(c.chain.list_professionals().await.unwrap().is_empty());

    c.rest.set_healthy(false);
    assert!(matches!(
        c.chain.list_professionals().await,
        Err(RepositoryError::ConnectionError { .. })
    ));
    assert!(c
        .chain
        .create_professional(&NewProfessional::new("Prof. Carlos", "CL"))
        .await
        .is_err());
    assert_eq!(c.chain.adapter_names(), vec!["rest", "postgres"]);
}
