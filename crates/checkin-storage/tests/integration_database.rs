//! Integration tests for the database bootstrap and the CRUD wrapper
//!
//! Run with: cargo test --package checkin-storage --test integration_database

use checkin_core::constants::SCAN_EVENTS_TABLE;
use checkin_core::{CheckTime, Direction, TagId, UserId};
use checkin_storage::repositories::{
    ScanEventRepository, SqliteScanEventRepository, SqliteUserRepository, UserRepository,
};
use checkin_storage::{
    BindParameter, Database, DatabaseConfig, ExecOptions, NewScanEvent, StorageError, daily_meters,
    rank_of,
};
use std::sync::Arc;
use tokio::sync::Barrier;

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    assert!(db.is_successful());
    db.close().await;
}

#[tokio::test]
async fn test_file_database_with_allow_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("checkin.db");
    let config = DatabaseConfig::new(path.to_string_lossy())
        .min_connections(0)
        .allow_tables(["users", "scan_events"]);

    let database = Database::new(config).await.unwrap();
    assert!(path.exists());

    let db = database.db();
    assert!(db.select("users", "*", "", &[]).await.is_ok());
    let err = db.select("sqlite_master", "*", "", &[]).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidIdentifier { .. }));

    database.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let database = Database::in_memory().await.unwrap();

    database.migrate().await.unwrap();
    database.migrate().await.unwrap();

    let rows = database
        .db()
        .select("users", "user_id, user_name", "", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_i64("user_id").unwrap(), 1);

    database.close().await;
}

#[tokio::test]
async fn test_concurrent_handles_keep_their_own_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let database = Database::new(DatabaseConfig::new(path.to_string_lossy()).min_connections(0))
        .await
        .unwrap();

    const NUM_CONCURRENT_TASKS: usize = 8;
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));
    let mut handles = vec![];

    for i in 0..NUM_CONCURRENT_TASKS {
        let db = database.db();
        let barrier = barrier.clone();

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let params = vec![
                BindParameter::text("tag_id", format!("TAG-{i}")),
                BindParameter::int("check_time", 260314090000 + i as i64),
                BindParameter::text("leaving", "0"),
                BindParameter::int("user_id", 0),
            ];
            let handle = db.insert(SCAN_EVENTS_TABLE, &params).await.unwrap().unwrap();
            (handle.last_insert_id(), db.last_insert_id())
        }));
    }

    let results: Vec<_> = futures::future::join_all(handles).await;
    let mut ids: Vec<i64> = results
        .into_iter()
        .map(|r| {
            let (from_handle, from_session) = r.unwrap();
            assert_eq!(from_handle.to_string(), from_session);
            from_handle
        })
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=NUM_CONCURRENT_TASKS as i64).collect::<Vec<_>>());

    database.close().await;
}

#[tokio::test]
async fn test_simulated_handle_leaves_table_untouched() {
    let database = Database::in_memory().await.unwrap();
    let db = database.db().with_options(ExecOptions::simulated());

    db.insert(
        SCAN_EVENTS_TABLE,
        &[
            BindParameter::text("tag_id", "04A1B2C3"),
            BindParameter::int("check_time", 260314090000),
            BindParameter::text("leaving", "0"),
        ],
    )
    .await
    .unwrap();
    db.truncate("users").await.unwrap();

    let live = database.db();
    assert!(live.select(SCAN_EVENTS_TABLE, "*", "", &[]).await.unwrap().is_empty());
    assert_eq!(live.select("users", "*", "", &[]).await.unwrap().len(), 1);
    assert_eq!(db.take_echo().len(), 2);
}

#[tokio::test]
async fn test_scans_to_ranking() {
    let database = Database::in_memory().await.unwrap();
    let users = SqliteUserRepository::new(database.db());
    let scans = SqliteScanEventRepository::new(database.db());

    let aiko = users.create(&TagId::new("TAG-AIKO").unwrap(), "Aiko").await.unwrap();
    let ben = users.create(&TagId::new("TAG-BEN").unwrap(), "Ben").await.unwrap();

    let record = |user: UserId, tag: &str, raw: i64, direction| NewScanEvent {
        tag_id: TagId::new(tag).unwrap(),
        check_time: CheckTime::from_raw(raw),
        direction,
        user_id: user,
    };

    for event in [
        record(aiko, "TAG-AIKO", 260314090000, Direction::Entry),
        record(aiko, "TAG-AIKO", 260314091000, Direction::Exit),
        record(ben, "TAG-BEN", 260314090000, Direction::Entry),
        record(ben, "TAG-BEN", 260314091000, Direction::Exit),
        record(ben, "TAG-BEN", 260314092000, Direction::Entry),
        record(ben, "TAG-BEN", 260314093000, Direction::Exit),
    ] {
        scans.create(&event).await.unwrap();
    }

    let own = scans.find_by_user(aiko).await.unwrap();
    assert_eq!(daily_meters(&own, 10)[&20260314].meters, 10);

    let since = chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let window = scans
        .find_for_ranking(since, checkin_storage::TimeColumn::CheckTime)
        .await
        .unwrap();
    assert_eq!(rank_of(&window, ben, 10).unwrap().rank, 1);
    assert_eq!(rank_of(&window, aiko, 10).unwrap().rank, 2);
}
