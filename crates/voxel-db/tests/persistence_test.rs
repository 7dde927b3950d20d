//! Postgres integration tests for the registry, instance index, and change
//! feed.
//!
//! These require a running Postgres (see `test_fixtures`); run with
//! `cargo test -p voxel-db -- --ignored`.

use voxel_db::test_fixtures::TestDatabase;
use voxel_db::{
    AttributeValueType, ChangeFeedAction, ChangeFeedRepository, CreateExtendedAttribute, Error,
    ExtendedAttributeRepository, InstanceIndexRepository, PgChangeFeedRepository,
    PgExtendedAttributeRepository, PgInstanceRepository, QueryTagLevel, TagStatus,
};

fn attr(tag: &str) -> CreateExtendedAttribute {
    CreateExtendedAttribute {
        tag: tag.parse().unwrap(),
        value_type: AttributeValueType::String,
        level: QueryTagLevel::Study,
    }
}

#[tokio::test]
#[ignore]
async fn registering_two_tags_assigns_unique_keys_in_adding_state() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let repo = PgExtendedAttributeRepository::new(db.pool.clone());

    let defs = repo
        .register(vec![attr("00110001"), attr("00110002")], 128, false)
        .await
        .unwrap();

    assert_eq!(defs.len(), 2);
    assert_ne!(defs[0].key, defs[1].key);
    assert!(defs.iter().all(|d| d.status == TagStatus::Adding));

    // Immediately re-registering one of them conflicts.
    let err = repo
        .register(vec![attr("00110001")], 128, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(ref t) if t == "00110001"));

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn exceeding_max_count_persists_nothing() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let repo = PgExtendedAttributeRepository::new(db.pool.clone());

    repo.register(vec![attr("00110001")], 128, false)
        .await
        .unwrap();

    let err = repo
        .register(vec![attr("00110002"), attr("00110003")], 2, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TooManyAttributes { requested: 2, max: 2 }));

    // Atomicity: neither of the rejected definitions was persisted.
    let all = repo.list().await.unwrap();
    assert_eq!(all.len(), 1);

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn status_transitions_are_forward_only() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let repo = PgExtendedAttributeRepository::new(db.pool.clone());

    let defs = repo
        .register(vec![attr("00110001")], 128, false)
        .await
        .unwrap();
    let key = defs[0].key;

    // Deleting before Ready is rejected.
    assert!(repo.mark_deleting(&[key]).await.is_err());

    repo.mark_ready(&[key]).await.unwrap();
    // Ready twice is rejected (the row is no longer Adding).
    assert!(repo.mark_ready(&[key]).await.is_err());

    repo.mark_deleting(&[key]).await.unwrap();
    let def = repo.get_by_keys(&[key]).await.unwrap().remove(0);
    assert_eq!(def.status, TagStatus::Deleting);

    // A Deleting tag no longer blocks re-registration of the same path.
    repo.register(vec![attr("00110001")], 128, false)
        .await
        .unwrap();

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn watermarks_are_strictly_increasing_and_never_reused() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let instances = PgInstanceRepository::new(db.pool.clone());
    let feed = PgChangeFeedRepository::new(db.pool.clone());

    let w1 = instances
        .create_instance(None, "1.2", "1.2.3", "1.2.3.1")
        .await
        .unwrap();
    let w2 = instances
        .create_instance(None, "1.2", "1.2.3", "1.2.3.2")
        .await
        .unwrap();
    // Replace the first instance, then delete it.
    let w3 = instances
        .create_instance(None, "1.2", "1.2.3", "1.2.3.1")
        .await
        .unwrap();
    let w4 = instances
        .delete_instance(None, "1.2", "1.2.3", "1.2.3.1")
        .await
        .unwrap();

    assert!(w1 < w2 && w2 < w3 && w3 < w4);

    let entries = feed.read(None, 0, 10).await.unwrap();
    let watermarks: Vec<i64> = entries.iter().map(|e| e.watermark).collect();
    assert_eq!(watermarks, vec![w1, w2, w3, w4]);
    assert_eq!(entries[2].action, ChangeFeedAction::Update);
    assert_eq!(entries[3].action, ChangeFeedAction::Delete);

    // Resumable cursor: reading past w2 yields only the later entries.
    let tail = feed.read(None, w2, 10).await.unwrap();
    assert_eq!(
        tail.iter().map(|e| e.watermark).collect::<Vec<_>>(),
        vec![w3, w4]
    );

    let latest = feed.latest(None).await.unwrap().unwrap();
    assert_eq!(latest.watermark, w4);

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn concurrent_registration_of_same_tag_commits_once() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let repo = PgExtendedAttributeRepository::new(db.pool.clone());

    let (a, b) = tokio::join!(
        repo.register(vec![attr("00110001")], 128, false),
        repo.register(vec![attr("00110001")], 128, false),
    );

    // Exactly one writer wins; the loser sees the conflict, not success.
    assert_eq!(a.is_ok() as usize + b.is_ok() as usize, 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(loser.is_conflict());
    assert_eq!(repo.list().await.unwrap().len(), 1);

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn concurrent_registrations_respect_live_count_cap() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let repo = PgExtendedAttributeRepository::new(db.pool.clone());

    let (a, b) = tokio::join!(
        repo.register(vec![attr("00110001")], 1, false),
        repo.register(vec![attr("00110002")], 1, false),
    );

    assert_eq!(a.is_ok() as usize + b.is_ok() as usize, 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, Error::TooManyAttributes { .. }));
    assert_eq!(repo.list().await.unwrap().len(), 1);

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn concurrent_writers_keep_exactly_one_current_version() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let instances = PgInstanceRepository::new(db.pool.clone());

    // Both target a triple that has no row yet.
    let (a, b) = tokio::join!(
        instances.create_instance(None, "1.2", "1.2.3", "1.2.3.9"),
        instances.create_instance(None, "1.2", "1.2.3", "1.2.3.9"),
    );
    let (wa, wb) = (a.unwrap(), b.unwrap());
    assert_ne!(wa, wb);

    let current = instances.resolve_series(None, "1.2", "1.2.3").await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].version, wa.max(wb));

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn concurrent_creates_draw_distinct_ordered_watermarks() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let instances = PgInstanceRepository::new(db.pool.clone());
    let feed = PgChangeFeedRepository::new(db.pool.clone());

    let (a, b, c, d) = tokio::join!(
        instances.create_instance(None, "1.2", "1.2.3", "1.2.3.1"),
        instances.create_instance(None, "1.2", "1.2.3", "1.2.3.2"),
        instances.create_instance(None, "1.2", "1.2.4", "1.2.4.1"),
        instances.create_instance(None, "1.3", "1.3.1", "1.3.1.1"),
    );
    let mut watermarks = vec![a.unwrap(), b.unwrap(), c.unwrap(), d.unwrap()];
    watermarks.sort_unstable();
    watermarks.dedup();
    assert_eq!(watermarks.len(), 4);

    // The feed replays the same set in ascending watermark order.
    let entries = feed.read(None, 0, 10).await.unwrap();
    let feed_watermarks: Vec<i64> = entries.iter().map(|e| e.watermark).collect();
    assert_eq!(feed_watermarks, watermarks);

    db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn current_resolution_follows_replace_semantics() {
    let db = TestDatabase::new().await;
    db.cleanup().await;
    let instances = PgInstanceRepository::new(db.pool.clone());

    instances
        .create_instance(Some("clinic-a"), "1.2", "1.2.3", "1.2.3.1")
        .await
        .unwrap();
    let replaced = instances
        .create_instance(Some("clinic-a"), "1.2", "1.2.3", "1.2.3.1")
        .await
        .unwrap();
    instances
        .create_instance(Some("clinic-a"), "1.2", "1.2.4", "1.2.4.1")
        .await
        .unwrap();

    let study = instances
        .resolve_study(Some("clinic-a"), "1.2")
        .await
        .unwrap();
    assert_eq!(study.len(), 2);
    assert_eq!(study[0].version, replaced);

    let series = instances
        .resolve_series(Some("clinic-a"), "1.2", "1.2.3")
        .await
        .unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].sop_uid, "1.2.3.1");

    // Partition scoping: a different tenant sees nothing.
    let other = instances.resolve_study(Some("clinic-b"), "1.2").await.unwrap();
    assert!(other.is_empty());

    db.cleanup().await;
}
