//! Integration tests for client accounts and session credits.

use chrono::{Duration, Utc};
use uuid::Uuid;

use coach_core::CoachError;
use coach_core::session::{self, NewClient, SessionTally};
use coach_db::models::ClientStatus;
use coach_db::queries::clients::{ClientQuery, ClientSort, StatusFilter};
use coach_test_utils::{
    create_test_db, drop_test_db, insert_client, insert_client_expiring, insert_trainer,
    set_completed_sessions,
};

#[tokio::test]
async fn last_credit_then_conflict() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;
    set_completed_sessions(&pool, client.id, 9).await;

    let tally = session::mark_session_complete(&pool, trainer.id, client.id)
        .await
        .unwrap();
    assert_eq!(tally, SessionTally { completed: 10, total: 10 });

    let err = session::mark_session_complete(&pool, trainer.id, client.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::Conflict(_)));
    assert_eq!(err.to_string(), "All sessions completed");

    let summary = session::get_client(&pool, trainer.id, client.id).await.unwrap();
    assert_eq!(summary.user.completed_sessions, 10);
    assert_eq!(summary.remaining_sessions, 0);
    assert_eq!(summary.status, ClientStatus::Inactive);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn other_trainers_client_is_not_found() {
    let (pool, db_name) = create_test_db().await;
    let owner = insert_trainer(&pool, "Owner").await;
    let other = insert_trainer(&pool, "Other").await;
    let client = insert_client(&pool, owner.id, "C", 10).await;

    let err = session::mark_session_complete(&pool, other.id, client.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::NotFound(_)));

    let err = session::mark_session_complete(&pool, owner.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::NotFound(_)));

    assert!(matches!(
        session::get_client(&pool, other.id, client.id).await,
        Err(CoachError::NotFound(_))
    ));
    let summary = session::get_client(&pool, owner.id, client.id).await.unwrap();
    assert_eq!(summary.user.completed_sessions, 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn concurrent_increments_stop_at_total() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 5).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let (trainer_id, client_id) = (trainer.id, client.id);
        handles.push(tokio::spawn(async move {
            session::mark_session_complete(&pool, trainer_id, client_id).await
        }));
    }

    let mut succeeded = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(tally) => {
                assert!(tally.completed <= tally.total);
                succeeded += 1;
            }
            Err(CoachError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 5);
    assert_eq!(conflicts, 3);

    let summary = session::get_client(&pool, trainer.id, client.id).await.unwrap();
    assert_eq!(summary.user.completed_sessions, 5);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn add_client_creates_owned_account() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;

    let summary = session::add_client(
        &pool,
        trainer.id,
        &NewClient {
            name: " Ann ".into(),
            email: "ann@example.test".into(),
            sessions: Some(12),
            validity_days: Some(30),
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.user.name, "Ann");
    assert_eq!(summary.user.trainer_id, Some(trainer.id));
    assert_eq!(summary.user.total_sessions, 12);
    assert_eq!(summary.remaining_sessions, 12);
    assert_eq!(summary.status, ClientStatus::Active);
    let expiry = summary.user.validity_expires_at.unwrap();
    assert!(expiry > Utc::now() + Duration::days(29));
    assert!(expiry <= Utc::now() + Duration::days(30));

    let fetched = session::get_client(&pool, trainer.id, summary.user.id)
        .await
        .unwrap();
    assert_eq!(fetched.user.email, "ann@example.test");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn add_client_validation_and_duplicates() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;

    let new = |name: &str, email: &str| NewClient {
        name: name.into(),
        email: email.into(),
        ..NewClient::default()
    };

    for (input, message) in [
        (new("", "a@x.io"), "Name and email are required"),
        (new("Ann", "  "), "Name and email are required"),
        (new("Ann", "not-an-email"), "Invalid email address"),
    ] {
        let err = session::add_client(&pool, trainer.id, &input).await.unwrap_err();
        assert!(matches!(err, CoachError::Validation(_)));
        assert_eq!(err.to_string(), message);
    }

    let negative = NewClient {
        sessions: Some(-1),
        ..new("Ann", "a@x.io")
    };
    assert!(matches!(
        session::add_client(&pool, trainer.id, &negative).await,
        Err(CoachError::Validation(_))
    ));
    let zero_days = NewClient {
        validity_days: Some(0),
        ..new("Ann", "a@x.io")
    };
    assert!(matches!(
        session::add_client(&pool, trainer.id, &zero_days).await,
        Err(CoachError::Validation(_))
    ));

    let first = session::add_client(&pool, trainer.id, &new("Ann", "dup@x.io"))
        .await
        .unwrap();
    assert_eq!(first.user.total_sessions, 0);
    assert_eq!(first.user.validity_expires_at, None);

    let err = session::add_client(&pool, trainer.id, &new("Other Ann", "dup@x.io"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::Conflict(_)));
    assert_eq!(err.to_string(), "User with this email already exists");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_clients_filters_and_derives_status() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let other = insert_trainer(&pool, "Other").await;

    let active = insert_client(&pool, trainer.id, "Active Alice", 10).await;
    let spent = insert_client(&pool, trainer.id, "Spent Sam", 3).await;
    set_completed_sessions(&pool, spent.id, 3).await;
    let expired = insert_client_expiring(
        &pool,
        trainer.id,
        "Expired Eve",
        10,
        Some(Utc::now() - Duration::days(1)),
    )
    .await;
    insert_client(&pool, other.id, "Someone Else", 10).await;

    let listed = session::list_clients(&pool, trainer.id, &ClientQuery::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|c| c.user.id).collect();
    assert_eq!(ids, vec![active.id]);
    assert_eq!(listed[0].status, ClientStatus::Active);

    let inactive = session::list_clients(
        &pool,
        trainer.id,
        &ClientQuery {
            filter: StatusFilter::Inactive,
            ..ClientQuery::default()
        },
    )
    .await
    .unwrap();
    let mut ids: Vec<Uuid> = inactive.iter().map(|c| c.user.id).collect();
    ids.sort();
    let mut expected = vec![spent.id, expired.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(inactive.iter().all(|c| c.status == ClientStatus::Inactive));

    let searched = session::list_clients(
        &pool,
        trainer.id,
        &ClientQuery {
            search: Some("eve".into()),
            filter: StatusFilter::All,
            sort: ClientSort::Recent,
        },
    )
    .await
    .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].user.id, expired.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}
