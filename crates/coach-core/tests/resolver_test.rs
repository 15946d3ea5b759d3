//! Integration tests for date resolution.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use coach_core::blob::LocalBlobStore;
use coach_core::completion::{self, Actor};
use coach_core::plan::{self, VersionDraft};
use coach_core::{CoachError, Diet, Workout};
use coach_db::models::{DayName, NewExercise, NewMeal};
use coach_db::queries::versions::{self, NewVersion};
use coach_db::queries::{ItemOwner, WORKOUT_TABLES, exercises};
use coach_test_utils::{create_test_db, drop_test_db, insert_client, insert_trainer};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn exercise(name: &str, day: DayName) -> NewExercise {
    NewExercise {
        day_name: Some(day),
        name: name.into(),
        ..NewExercise::default()
    }
}

/// Insert a workout version with an explicit range, bypassing the write path.
async fn seed_version(
    pool: &PgPool,
    client_id: Uuid,
    title: &str,
    from: NaiveDate,
    till: Option<NaiveDate>,
    items: &[NewExercise],
) -> Uuid {
    let mut conn = pool.acquire().await.unwrap();
    let version = versions::insert_version(
        &mut conn,
        &WORKOUT_TABLES,
        &NewVersion {
            client_id,
            created_by_trainer_id: None,
            title,
            description: None,
            followed_from: from,
            followed_till: till,
        },
    )
    .await
    .unwrap();
    let location = WORKOUT_TABLES.locate(ItemOwner::Version(version.id));
    for (i, item) in items.iter().enumerate() {
        exercises::insert_exercise(&mut conn, location, i as i32, item)
            .await
            .unwrap();
    }
    version.id
}

// 2025-06-02 is a Monday.

#[tokio::test]
async fn resolves_weekday_items_in_order() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;

    let version_id = seed_version(
        &pool,
        client.id,
        "Split",
        date(2025, 6, 1),
        None,
        &[
            exercise("Bench", DayName::Monday),
            exercise("Squat", DayName::Tuesday),
            exercise("Row", DayName::Monday),
            exercise("Curl", DayName::Monday),
        ],
    )
    .await;

    let monday = plan::resolve_for_date::<Workout, _>(&pool, client.id, date(2025, 6, 2))
        .await
        .unwrap();
    let names: Vec<_> = monday.iter().map(|r| r.item.name.as_str()).collect();
    assert_eq!(names, vec!["Bench", "Row", "Curl"]);
    assert!(monday.iter().all(|r| r.plan_version_id == version_id));
    assert!(monday.iter().all(|r| !r.is_completed && r.completion_id.is_none()));

    let wednesday = plan::resolve_for_date::<Workout, _>(&pool, client.id, date(2025, 6, 4))
        .await
        .unwrap();
    assert!(wednesday.is_empty());

    // Before the version starts: nothing, not an error.
    let before = plan::resolve_for_date::<Workout, _>(&pool, client.id, date(2025, 5, 26))
        .await
        .unwrap();
    assert!(before.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn range_straddles_version_boundary() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;

    let every_day = |prefix: &str| -> Vec<NewExercise> {
        DayName::ALL
            .iter()
            .map(|d| exercise(&format!("{prefix} {d}"), *d))
            .collect()
    };
    let plan_a = seed_version(
        &pool,
        client.id,
        "A",
        date(2025, 5, 1),
        Some(date(2025, 6, 2)),
        &every_day("A"),
    )
    .await;
    let plan_b = seed_version(&pool, client.id, "B", date(2025, 6, 3), None, &every_day("B")).await;

    let groups = plan::resolve_for_range::<Workout, _>(
        &pool,
        client.id,
        date(2025, 6, 2),
        date(2025, 6, 4),
    )
    .await
    .unwrap();

    let dates: Vec<_> = groups.iter().map(|g| g.date).collect();
    assert_eq!(dates, vec![date(2025, 6, 4), date(2025, 6, 3), date(2025, 6, 2)]);

    assert_eq!(groups[0].items[0].item.name, "B Wednesday");
    assert_eq!(groups[0].items[0].plan_version_id, plan_b);
    assert_eq!(groups[1].items[0].item.name, "B Tuesday");
    assert_eq!(groups[2].items[0].item.name, "A Monday");
    assert_eq!(groups[2].items[0].plan_version_id, plan_a);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn range_omits_days_without_scheduled_items() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;

    seed_version(
        &pool,
        client.id,
        "MWF",
        date(2025, 6, 4),
        None,
        &[
            exercise("Squat", DayName::Monday),
            exercise("Row", DayName::Wednesday),
            exercise("Press", DayName::Friday),
        ],
    )
    .await;

    // Mon 2 and Tue 3 precede the version; Thu 5 and Sat 7 have nothing.
    let groups = plan::resolve_for_range::<Workout, _>(
        &pool,
        client.id,
        date(2025, 6, 2),
        date(2025, 6, 9),
    )
    .await
    .unwrap();

    let dates: Vec<_> = groups.iter().map(|g| g.date).collect();
    assert_eq!(dates, vec![date(2025, 6, 9), date(2025, 6, 6), date(2025, 6, 4)]);
    assert!(groups.iter().all(|g| !g.items.is_empty()));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn overlapping_closed_versions_resolve_to_latest_start() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;

    seed_version(
        &pool,
        client.id,
        "Long",
        date(2025, 6, 1),
        Some(date(2025, 6, 30)),
        &[exercise("Long Monday", DayName::Monday)],
    )
    .await;
    seed_version(
        &pool,
        client.id,
        "Short",
        date(2025, 6, 8),
        Some(date(2025, 6, 14)),
        &[exercise("Short Monday", DayName::Monday)],
    )
    .await;

    let first = plan::resolve_for_date::<Workout, _>(&pool, client.id, date(2025, 6, 2))
        .await
        .unwrap();
    assert_eq!(first[0].item.name, "Long Monday");
    let second = plan::resolve_for_date::<Workout, _>(&pool, client.id, date(2025, 6, 9))
        .await
        .unwrap();
    assert_eq!(second[0].item.name, "Short Monday");
    let third = plan::resolve_for_date::<Workout, _>(&pool, client.id, date(2025, 6, 16))
        .await
        .unwrap();
    assert_eq!(third[0].item.name, "Long Monday");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn completions_join_per_date() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;
    let tmp = tempfile::tempdir().unwrap();
    let blobs = LocalBlobStore::new(tmp.path());

    seed_version(
        &pool,
        client.id,
        "Split",
        date(2025, 6, 1),
        None,
        &[exercise("Bench", DayName::Monday), exercise("Row", DayName::Monday)],
    )
    .await;
    let monday = date(2025, 6, 2);
    let next_monday = date(2025, 6, 9);
    let items = plan::resolve_for_date::<Workout, _>(&pool, client.id, monday)
        .await
        .unwrap();
    let bench = items[0].item.id;

    let mark = completion::mark_complete::<Workout, _>(
        &pool,
        &blobs,
        client.id,
        bench,
        monday,
        None,
        Actor::Client,
    )
    .await
    .unwrap();

    let groups = plan::resolve_for_range::<Workout, _>(&pool, client.id, monday, next_monday)
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    let (later, earlier) = (&groups[0], &groups[1]);
    assert_eq!(earlier.date, monday);
    assert!(earlier.items[0].is_completed);
    assert_eq!(earlier.items[0].completion_id, Some(mark.completion_id));
    assert!(!earlier.items[1].is_completed);
    assert_eq!(later.date, next_monday);
    assert!(later.items.iter().all(|r| !r.is_completed));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn dayless_meals_resolve_every_day() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 10).await;

    plan::create_version_on::<Diet, _>(
        &pool,
        &VersionDraft {
            client_id: client.id,
            trainer_id: trainer.id,
            title: "Diet".into(),
            description: None,
            items: vec![
                NewMeal {
                    name: "Daily oats".into(),
                    ..NewMeal::default()
                },
                NewMeal {
                    day_name: Some(DayName::Sunday),
                    name: "Sunday roast".into(),
                    ..NewMeal::default()
                },
            ],
            make_active: true,
        },
        date(2025, 6, 1),
    )
    .await
    .unwrap();

    let groups = plan::resolve_for_range::<Diet, _>(
        &pool,
        client.id,
        date(2025, 6, 2),
        date(2025, 6, 8),
    )
    .await
    .unwrap();
    assert_eq!(groups.len(), 7);
    // 2025-06-08 is a Sunday and comes first.
    let sunday: Vec<_> = groups[0].items.iter().map(|r| r.item.name.as_str()).collect();
    assert_eq!(sunday, vec!["Daily oats", "Sunday roast"]);
    assert!(groups[1..].iter().all(|g| g.items.len() == 1));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn invalid_ranges_are_rejected() {
    let (pool, db_name) = create_test_db().await;
    let client_id = Uuid::new_v4();

    let err = plan::resolve_for_range::<Workout, _>(
        &pool,
        client_id,
        date(2025, 6, 4),
        date(2025, 6, 2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoachError::Validation(_)));

    let err = plan::resolve_for_range::<Workout, _>(
        &pool,
        client_id,
        date(2024, 1, 1),
        date(2025, 6, 2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoachError::Validation(_)));

    pool.close().await;
    drop_test_db(&db_name).await;
}
