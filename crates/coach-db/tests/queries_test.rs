//! Query-level tests for clients, plan versions and templates.

use chrono::{Duration, NaiveDate, Utc};

use coach_db::models::{DayName, Meal, NewMeal};
use coach_db::queries::clients::{self, ClientQuery, ClientSort, StatusFilter};
use coach_db::queries::versions::{self, NewVersion};
use coach_db::queries::{self, DIET_TABLES, ItemOwner, meals, templates};
use coach_test_utils::{
    create_test_db, drop_test_db, insert_client, insert_client_expiring, insert_trainer,
    set_completed_sessions,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn client_lookup_is_scoped_to_trainer() {
    let (pool, db_name) = create_test_db().await;
    let t1 = insert_trainer(&pool, "T1").await;
    let t2 = insert_trainer(&pool, "T2").await;
    let client = insert_client(&pool, t1.id, "Ann", 3).await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(
        clients::get_client_for_trainer(&mut conn, t1.id, client.id)
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        clients::get_client_for_trainer(&mut conn, t2.id, client.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        !clients::lock_client_for_trainer(&mut conn, t2.id, client.id)
            .await
            .unwrap()
    );
    assert!(clients::email_exists(&mut conn, &client.email).await.unwrap());
    assert!(!clients::email_exists(&mut conn, "nobody@example.test").await.unwrap());

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn increment_stops_at_total() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 2).await;

    let mut conn = pool.acquire().await.unwrap();
    let first = clients::increment_completed_sessions(&mut conn, trainer.id, client.id)
        .await
        .unwrap();
    assert_eq!(first, Some((1, 2)));
    let second = clients::increment_completed_sessions(&mut conn, trainer.id, client.id)
        .await
        .unwrap();
    assert_eq!(second, Some((2, 2)));
    let third = clients::increment_completed_sessions(&mut conn, trainer.id, client.id)
        .await
        .unwrap();
    assert_eq!(third, None);

    let user = clients::get_user(&mut conn, client.id).await.unwrap().unwrap();
    assert_eq!(user.completed_sessions, 2);

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_clients_filters_and_searches() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let other = insert_trainer(&pool, "Other").await;

    let active = insert_client(&pool, trainer.id, "Alice Active", 5).await;
    let used_up = insert_client(&pool, trainer.id, "Bob Used", 2).await;
    set_completed_sessions(&pool, used_up.id, 2).await;
    let expired = insert_client_expiring(
        &pool,
        trainer.id,
        "Carol Expired",
        5,
        Some(Utc::now() - Duration::days(1)),
    )
    .await;
    insert_client(&pool, other.id, "Alice Elsewhere", 5).await;

    let mut conn = pool.acquire().await.unwrap();

    let default = clients::list_clients(&mut conn, trainer.id, &ClientQuery::default())
        .await
        .unwrap();
    assert_eq!(default.len(), 1);
    assert_eq!(default[0].id, active.id);

    let inactive = clients::list_clients(
        &mut conn,
        trainer.id,
        &ClientQuery {
            filter: StatusFilter::Inactive,
            ..ClientQuery::default()
        },
    )
    .await
    .unwrap();
    let mut ids: Vec<_> = inactive.iter().map(|u| u.id).collect();
    ids.sort();
    let mut expected = vec![used_up.id, expired.id];
    expected.sort();
    assert_eq!(ids, expected);

    let searched = clients::list_clients(
        &mut conn,
        trainer.id,
        &ClientQuery {
            search: Some("alice".into()),
            filter: StatusFilter::All,
            sort: ClientSort::Recent,
        },
    )
    .await
    .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].id, active.id);

    let by_status = clients::list_clients(
        &mut conn,
        trainer.id,
        &ClientQuery {
            search: None,
            filter: StatusFilter::All,
            sort: ClientSort::Active,
        },
    )
    .await
    .unwrap();
    assert_eq!(by_status.len(), 3);
    assert_eq!(by_status[0].id, active.id);

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn overlapping_versions_ordered_for_resolution() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 5).await;
    let mut conn = pool.acquire().await.unwrap();

    let closed = |title: &'static str, from, till| NewVersion {
        client_id: client.id,
        created_by_trainer_id: Some(trainer.id),
        title,
        description: None,
        followed_from: from,
        followed_till: Some(till),
    };
    versions::insert_version(&mut conn, &DIET_TABLES, &closed("A", date(2025, 6, 1), date(2025, 6, 9)))
        .await
        .unwrap();
    versions::insert_version(&mut conn, &DIET_TABLES, &closed("B", date(2025, 6, 5), date(2025, 6, 20)))
        .await
        .unwrap();
    versions::insert_version(&mut conn, &DIET_TABLES, &closed("C", date(2025, 6, 5), date(2025, 6, 7)))
        .await
        .unwrap();

    let rows = versions::list_versions_overlapping(
        &mut conn,
        &DIET_TABLES,
        client.id,
        date(2025, 6, 6),
        date(2025, 6, 6),
    )
    .await
    .unwrap();
    let titles: Vec<_> = rows.iter().map(|v| v.title.as_str()).collect();
    // Same followed_from: the later insert wins.
    assert_eq!(titles, vec!["C", "B", "A"]);

    let outside = versions::list_versions_overlapping(
        &mut conn,
        &DIET_TABLES,
        client.id,
        date(2025, 7, 1),
        date(2025, 7, 31),
    )
    .await
    .unwrap();
    assert!(outside.is_empty());

    let history = versions::list_version_summaries(&mut conn, &DIET_TABLES, client.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|v| !v.is_current));

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn close_open_versions_leaves_none_open() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let client = insert_client(&pool, trainer.id, "C", 5).await;
    let mut conn = pool.acquire().await.unwrap();

    versions::insert_version(
        &mut conn,
        &DIET_TABLES,
        &NewVersion {
            client_id: client.id,
            created_by_trainer_id: None,
            title: "Open",
            description: None,
            followed_from: date(2025, 6, 1),
            followed_till: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(
        versions::count_open_versions(&mut conn, &DIET_TABLES, client.id)
            .await
            .unwrap(),
        1
    );

    let closed = versions::close_open_versions(&mut conn, &DIET_TABLES, client.id, date(2025, 6, 10))
        .await
        .unwrap();
    assert_eq!(closed, 1);
    assert!(
        versions::get_open_version(&mut conn, &DIET_TABLES, client.id)
            .await
            .unwrap()
            .is_none()
    );

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn template_items_and_counts() {
    let (pool, db_name) = create_test_db().await;
    let trainer = insert_trainer(&pool, "T").await;
    let other = insert_trainer(&pool, "Other").await;
    let mut conn = pool.acquire().await.unwrap();

    let template = templates::insert_template(&mut conn, &DIET_TABLES, trainer.id, "Cut", None)
        .await
        .unwrap();
    let location = DIET_TABLES.locate(ItemOwner::Template(template.id));
    for (i, name) in ["Oats", "Chicken"].iter().enumerate() {
        meals::insert_meal(
            &mut conn,
            location,
            i as i32,
            &NewMeal {
                day_name: Some(DayName::Monday),
                name: (*name).into(),
                protein_g: Some(10.126),
                ..NewMeal::default()
            },
        )
        .await
        .unwrap();
    }

    let items: Vec<Meal> = queries::list_items(&mut conn, location).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Oats");
    assert_eq!(items[0].protein_g, 10.13);
    assert_eq!(items[1].calories_kcal, 0.0);

    let listed = templates::list_templates(&mut conn, &DIET_TABLES, trainer.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].item_count, 2);

    assert!(
        templates::get_template(&mut conn, &DIET_TABLES, other.id, template.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        !templates::delete_template(&mut conn, &DIET_TABLES, other.id, template.id)
            .await
            .unwrap()
    );
    assert!(
        templates::delete_template(&mut conn, &DIET_TABLES, trainer.id, template.id)
            .await
            .unwrap()
    );
    let gone: Vec<Meal> = queries::list_items(&mut conn, location).await.unwrap();
    assert!(gone.is_empty());

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}
