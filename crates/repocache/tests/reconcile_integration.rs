//! Integration tests for reconciling listing batches into the store.
//!
//! These tests require the `sqlite` and `migrate` features to be enabled
//! and use an in-memory SQLite database.

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::{DateTime, Duration, TimeZone, Utc};
use repocache::accounts::{self, NewAccount};
use repocache::connect_and_migrate;
use repocache::entity::platform::Platform;
use repocache::entity::repository::{self as repository_entity, Entity as Repository};
use repocache::repository::{self, find_by_remote_id, find_by_slug, get_owner};
use repocache::{RemoteRepo, upsert_repos};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};

/// Create an in-memory SQLite database with migrations applied.
async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
}

fn remote(slug: &str, remote_id: &str, last_update: DateTime<Utc>) -> RemoteRepo {
    RemoteRepo {
        platform: Platform::GitHub,
        slug: slug.to_string(),
        remote_id: remote_id.to_string(),
        owner_id: Some("u1".to_string()),
        name: slug.rsplit('/').next().unwrap_or(slug).to_string(),
        description: Some(format!("Test repo {slug}")),
        is_fork: Some(false),
        stars_count: Some(7),
        last_update: Some(last_update),
        extra_info: serde_json::json!({"language": "Rust", "homepage": null}),
    }
}

async fn all_rows(db: &DatabaseConnection) -> Vec<repository_entity::Model> {
    Repository::find()
        .order_by_asc(repository_entity::Column::Id)
        .all(db)
        .await
        .unwrap()
}

// ─── Basic Reconcile ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_record_is_inserted_with_participant_and_fetch_time() {
    let db = setup_test_db().await;

    let saved = upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 42, at(2))
        .await
        .unwrap();

    assert_eq!(saved.len(), 1);
    let row = &saved[0];
    assert_eq!(row.platform, Platform::GitHub);
    assert_eq!(row.remote_id, "1");
    assert_eq!(row.slug, "alice/x");
    assert_eq!(row.participant, Some(42));
    assert_eq!(row.owner_id, "u1");
    assert_eq!(row.last_update, at(1).fixed_offset());
    assert_eq!(row.info_fetched_at, at(2).fixed_offset());
    assert_eq!(
        row.extra_info_json().unwrap(),
        serde_json::json!({"language": "Rust"})
    );

    assert_eq!(all_rows(&db).await, saved);
}

#[tokio::test]
async fn test_empty_batch_returns_nothing() {
    let db = setup_test_db().await;

    let saved = upsert_repos(&db, Vec::new(), 42, at(2)).await.unwrap();
    assert!(saved.is_empty());
    assert_eq!(Repository::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_existing_identity_is_replaced_and_keeps_its_id() {
    let db = setup_test_db().await;

    let first = upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 42, at(2))
        .await
        .unwrap();

    let mut renamed = remote("alice/renamed", "1", at(3));
    renamed.description = None;
    renamed.stars_count = None;
    let second = upsert_repos(&db, vec![renamed], 42, at(4)).await.unwrap();

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].slug, "alice/renamed");
    assert_eq!(second[0].name, "renamed");
    assert_eq!(second[0].description, None);
    assert_eq!(second[0].stars_count, None);
    assert_eq!(second[0].last_update, at(3).fixed_offset());
    assert_eq!(second[0].info_fetched_at, at(4).fixed_offset());

    assert_eq!(Repository::find().count(&db).await.unwrap(), 1);
    assert!(find_by_slug(&db, Platform::GitHub, "alice/x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_participant_is_overwritten_on_upsert() {
    let db = setup_test_db().await;

    upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 42, at(2))
        .await
        .unwrap();
    let saved = upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 7, at(3))
        .await
        .unwrap();

    assert_eq!(saved[0].participant, Some(7));
    assert_eq!(
        repository::count_by_participant(&db, 42, Platform::GitHub)
            .await
            .unwrap(),
        0
    );
}

// ─── Slug Collisions ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_identity_takes_over_slug() {
    let db = setup_test_db().await;

    upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 42, at(2))
        .await
        .unwrap();
    let saved = upsert_repos(&db, vec![remote("alice/x", "2", at(3))], 42, at(4))
        .await
        .unwrap();

    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].remote_id, "2");
    assert_eq!(saved[0].slug, "alice/x");

    let rows = all_rows(&db).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].remote_id, "2");
    assert!(
        find_by_remote_id(&db, Platform::GitHub, "1")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_slug_swap_within_one_batch_keeps_slugs_unique() {
    let db = setup_test_db().await;

    upsert_repos(
        &db,
        vec![remote("alice/a", "1", at(1)), remote("alice/b", "2", at(1))],
        42,
        at(2),
    )
    .await
    .unwrap();

    // Each record claims the other's slug. The first claim displaces row 2,
    // which the second record then re-creates.
    let saved = upsert_repos(
        &db,
        vec![remote("alice/b", "1", at(3)), remote("alice/a", "2", at(3))],
        42,
        at(4),
    )
    .await
    .unwrap();
    assert_eq!(saved.len(), 2);

    let rows = all_rows(&db).await;
    assert_eq!(rows.len(), 2);
    let one = find_by_remote_id(&db, Platform::GitHub, "1").await.unwrap().unwrap();
    let two = find_by_remote_id(&db, Platform::GitHub, "2").await.unwrap().unwrap();
    assert_eq!(one.slug, "alice/b");
    assert_eq!(two.slug, "alice/a");
}

#[tokio::test]
async fn test_same_slug_on_another_platform_is_untouched() {
    let db = setup_test_db().await;

    let mut on_gitlab = remote("alice/x", "1", at(1));
    on_gitlab.platform = Platform::GitLab;
    upsert_repos(&db, vec![on_gitlab], 42, at(2)).await.unwrap();
    upsert_repos(&db, vec![remote("alice/x", "9", at(1))], 42, at(2))
        .await
        .unwrap();

    assert_eq!(Repository::find().count(&db).await.unwrap(), 2);
    assert!(
        find_by_slug(&db, Platform::GitLab, "alice/x")
            .await
            .unwrap()
            .is_some()
    );
}

// ─── Completeness Filter ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_incomplete_records_leave_store_unchanged() {
    let db = setup_test_db().await;

    upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 42, at(2))
        .await
        .unwrap();
    let before = all_rows(&db).await;

    let mut no_update = remote("alice/y", "3", at(1));
    no_update.last_update = None;
    let mut no_owner = remote("alice/x", "1", at(5));
    no_owner.owner_id = None;
    let mut empty_owner = remote("alice/z", "4", at(5));
    empty_owner.owner_id = Some(String::new());

    let saved = upsert_repos(&db, vec![no_update, no_owner, empty_owner], 42, at(6))
        .await
        .unwrap();

    assert!(saved.is_empty());
    assert_eq!(all_rows(&db).await, before);
}

#[tokio::test]
async fn test_incomplete_records_are_skipped_inside_a_mixed_batch() {
    let db = setup_test_db().await;

    let mut incomplete = remote("alice/y", "3", at(1));
    incomplete.last_update = None;

    let saved = upsert_repos(
        &db,
        vec![remote("alice/x", "1", at(1)), incomplete, remote("alice/z", "5", at(1))],
        42,
        at(2),
    )
    .await
    .unwrap();

    let slugs: Vec<_> = saved.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["alice/x", "alice/z"]);
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let db = setup_test_db().await;
    let batch = vec![
        remote("alice/a", "1", at(1)),
        remote("alice/b", "2", at(1)),
        remote("alice/c", "3", at(1)),
    ];

    let first = upsert_repos(&db, batch.clone(), 42, at(2)).await.unwrap();
    let after_first = all_rows(&db).await;
    let second = upsert_repos(&db, batch.clone(), 42, at(2)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(all_rows(&db).await, after_first);

    let third = upsert_repos(&db, batch, 42, at(2) + Duration::hours(1))
        .await
        .unwrap();
    for (before, after) in first.iter().zip(&third) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.slug, after.slug);
        assert_eq!(after.info_fetched_at, (at(2) + Duration::hours(1)).fixed_offset());
    }
}

// ─── Owner Lookup ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_owner_resolves_linked_account() {
    let db = setup_test_db().await;

    let saved = upsert_repos(&db, vec![remote("alice/x", "1", at(1))], 42, at(2))
        .await
        .unwrap();
    assert!(get_owner(&db, &saved[0]).await.unwrap().is_none());

    let account = accounts::link_account(
        &db,
        NewAccount {
            participant: 42,
            platform: Platform::GitHub,
            user_id: "u1".to_string(),
            user_name: Some("alice".to_string()),
            display_name: Some("Alice".to_string()),
        },
    )
    .await
    .unwrap();

    let owner = get_owner(&db, &saved[0]).await.unwrap().unwrap();
    assert_eq!(owner, account);
    assert_eq!(owner.profile_url().as_deref(), Some("https://github.com/alice"));
    assert_eq!(saved[0].url(), "https://github.com/alice/x");
}
