#![allow(async_fn_in_trait)]

use crate::db::Db;
use crate::error::{StorageError, StorageResult};
use crate::models::{NewScanEvent, ScanEvent};
use crate::params::BindParameter;
use checkin_core::constants::{RECORD_TIME_FORMAT, SCAN_EVENTS_TABLE};
use checkin_core::{CheckTime, UserId};
use chrono::NaiveDateTime;

const EVENT_COLUMNS: &str = "id, tag_id, check_time, leaving, user_id, record_time";

/// Timestamp that drives the ranking window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeColumn {
    /// Time reported by the reader
    #[default]
    CheckTime,
    /// Time the row was written
    RecordTime,
}

impl TimeColumn {
    pub fn from_record_time_flag(use_record_time: bool) -> Self {
        if use_record_time {
            TimeColumn::RecordTime
        } else {
            TimeColumn::CheckTime
        }
    }

    fn column(self) -> &'static str {
        match self {
            TimeColumn::CheckTime => "check_time",
            TimeColumn::RecordTime => "record_time",
        }
    }

    /// `since` in the column's storage format
    fn bound_since(self, since: NaiveDateTime) -> BindParameter {
        match self {
            TimeColumn::CheckTime => {
                BindParameter::int("since", CheckTime::from_datetime(since).raw())
            }
            TimeColumn::RecordTime => {
                BindParameter::text("since", since.format(RECORD_TIME_FORMAT).to_string())
            }
        }
    }
}

/// Repository trait for recorded scans
pub trait ScanEventRepository: Send + Sync {
    /// Record a scan and return its id
    async fn create(&self, event: &NewScanEvent) -> StorageResult<i64>;

    /// Every scan of a user, oldest first
    async fn find_by_user(&self, user_id: UserId) -> StorageResult<Vec<ScanEvent>>;

    /// Scans inside the ranking window, oldest first
    ///
    /// The reserved system user is left out.
    async fn find_for_ranking(
        &self,
        since: NaiveDateTime,
        column: TimeColumn,
    ) -> StorageResult<Vec<ScanEvent>>;
}

/// ScanEventRepository over the generic [`Db`] helpers
pub struct SqliteScanEventRepository {
    db: Db,
}

impl SqliteScanEventRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl ScanEventRepository for SqliteScanEventRepository {
    async fn create(&self, event: &NewScanEvent) -> StorageResult<i64> {
        let handle = self
            .db
            .insert(SCAN_EVENTS_TABLE, &event.to_params())
            .await?
            .ok_or_else(|| StorageError::Simulated(format!("insert into {SCAN_EVENTS_TABLE}")))?;

        Ok(handle.last_insert_id())
    }

    async fn find_by_user(&self, user_id: UserId) -> StorageResult<Vec<ScanEvent>> {
        let rows = self
            .db
            .select(
                SCAN_EVENTS_TABLE,
                EVENT_COLUMNS,
                "user_id = :user_id ORDER BY check_time ASC, id ASC",
                &[BindParameter::int("user_id", user_id.get())],
            )
            .await?;

        rows.iter().map(ScanEvent::try_from).collect()
    }

    async fn find_for_ranking(
        &self,
        since: NaiveDateTime,
        column: TimeColumn,
    ) -> StorageResult<Vec<ScanEvent>> {
        let name = column.column();
        let rows = self
            .db
            .select(
                SCAN_EVENTS_TABLE,
                EVENT_COLUMNS,
                &format!("user_id != :system AND {name} >= :since ORDER BY {name} ASC, id ASC"),
                &[
                    BindParameter::int("system", UserId::SYSTEM.get()),
                    column.bound_since(since),
                ],
            )
            .await?;

        rows.iter().map(ScanEvent::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use checkin_core::{Direction, TagId};
    use chrono::{Local, NaiveDate, TimeDelta};

    fn scan(user: i64, raw: i64, direction: Direction) -> NewScanEvent {
        NewScanEvent {
            tag_id: TagId::new(&format!("TAG-{user}")).unwrap(),
            check_time: CheckTime::from_raw(raw),
            direction,
            user_id: UserId::new(user),
        }
    }

    async fn repo() -> SqliteScanEventRepository {
        let database = Database::in_memory().await.unwrap();
        SqliteScanEventRepository::new(database.db())
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_ids() {
        let repo = repo().await;
        let first = repo
            .create(&scan(2, 260314090000, Direction::Entry))
            .await
            .unwrap();
        let second = repo
            .create(&scan(2, 260314091000, Direction::Exit))
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_find_by_user_is_ordered() {
        let repo = repo().await;
        repo.create(&scan(2, 260314091000, Direction::Exit)).await.unwrap();
        repo.create(&scan(2, 260314090000, Direction::Entry)).await.unwrap();
        repo.create(&scan(3, 260314090500, Direction::Entry)).await.unwrap();

        let events = repo.find_by_user(UserId::new(2)).await.unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.check_time.raw()).collect();
        assert_eq!(times, vec![260314090000, 260314091000]);
        assert_eq!(events[0].direction().unwrap(), Direction::Entry);
    }

    #[tokio::test]
    async fn test_ranking_window_by_check_time() {
        let repo = repo().await;
        repo.create(&scan(2, 260228235959, Direction::Entry)).await.unwrap();
        repo.create(&scan(2, 260301000000, Direction::Entry)).await.unwrap();
        repo.create(&scan(1, 260302080000, Direction::Entry)).await.unwrap();
        repo.create(&scan(3, 260302090000, Direction::Exit)).await.unwrap();

        let events = repo
            .find_for_ranking(start(), TimeColumn::CheckTime)
            .await
            .unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.check_time.raw()).collect();
        assert_eq!(times, vec![260301000000, 260302090000]);
        assert!(events.iter().all(|e| !e.user_id.is_system()));
    }

    #[tokio::test]
    async fn test_ranking_window_by_record_time() {
        let repo = repo().await;
        // reader clock far in the past; only the insertion time counts here
        repo.create(&scan(2, 200101000000, Direction::Entry)).await.unwrap();

        let now = Local::now().naive_local();
        let events = repo
            .find_for_ranking(now - TimeDelta::minutes(5), TimeColumn::RecordTime)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);

        let none = repo
            .find_for_ranking(now + TimeDelta::minutes(5), TimeColumn::RecordTime)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_record_time_is_local() {
        let repo = repo().await;
        let before = Local::now().naive_local() - TimeDelta::seconds(2);
        repo.create(&scan(2, 260314090000, Direction::Entry)).await.unwrap();
        let after = Local::now().naive_local() + TimeDelta::seconds(2);

        let events = repo.find_by_user(UserId::new(2)).await.unwrap();
        let stored = events[0].record_time;
        assert!(
            before <= stored && stored <= after,
            "record_time {stored} outside [{before}, {after}]"
        );
    }

    #[test]
    fn test_time_column_flag() {
        assert_eq!(TimeColumn::from_record_time_flag(true), TimeColumn::RecordTime);
        assert_eq!(TimeColumn::from_record_time_flag(false), TimeColumn::CheckTime);
    }
}
