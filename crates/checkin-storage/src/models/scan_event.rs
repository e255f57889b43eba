use crate::error::{StorageError, StorageResult};
use crate::params::BindParameter;
use crate::row::Row;
use checkin_core::constants::RECORD_TIME_FORMAT;
use checkin_core::{CheckTime, Direction, TagId, UserId};
use chrono::NaiveDateTime;
use serde::Serialize;

/// One stored scan of a tag at a reader
///
/// Rows are immutable once written. `leaving` keeps the flag exactly as
/// the reader sent it; use [`ScanEvent::direction`] to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEvent {
    pub id: i64,
    pub tag_id: String,
    pub check_time: CheckTime,
    pub leaving: String,
    pub user_id: UserId,
    /// Insertion time in host local time
    pub record_time: NaiveDateTime,
}

impl ScanEvent {
    /// Direction of the scan, if the stored flag is a known one
    pub fn direction(&self) -> checkin_core::Result<Direction> {
        Direction::from_leaving_flag(&self.leaving)
    }
}

impl TryFrom<&Row> for ScanEvent {
    type Error = StorageError;

    fn try_from(row: &Row) -> StorageResult<Self> {
        let record_time = row.get_text("record_time")?;
        let record_time = NaiveDateTime::parse_from_str(&record_time, RECORD_TIME_FORMAT)
            .map_err(|e| StorageError::Decode {
                column: "record_time".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: row.get_i64("id")?,
            tag_id: row.get_text("tag_id")?,
            check_time: CheckTime::from_raw(row.get_i64("check_time")?),
            leaving: row.get_text("leaving")?,
            user_id: UserId::new(row.get_i64("user_id")?),
            record_time,
        })
    }
}

/// A scan about to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewScanEvent {
    pub tag_id: TagId,
    pub check_time: CheckTime,
    pub direction: Direction,
    pub user_id: UserId,
}

impl NewScanEvent {
    /// Insert parameters, one per `scan_events` column
    pub fn to_params(&self) -> Vec<BindParameter> {
        vec![
            BindParameter::text("tag_id", self.tag_id.as_str()),
            BindParameter::int("check_time", self.check_time.raw()),
            BindParameter::text("leaving", self.direction.leaving_flag()),
            BindParameter::int("user_id", self.user_id.get()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SqlValue;

    fn row(leaving: &str, record_time: &str) -> Row {
        Row::new(vec![
            ("id".to_string(), SqlValue::Integer(12)),
            ("tag_id".to_string(), SqlValue::Text("04A1B2C3".to_string())),
            ("check_time".to_string(), SqlValue::Integer(260314093015)),
            ("leaving".to_string(), SqlValue::Text(leaving.to_string())),
            ("user_id".to_string(), SqlValue::Integer(4)),
            ("record_time".to_string(), SqlValue::Text(record_time.to_string())),
        ])
    }

    #[test]
    fn test_from_row() {
        let event = ScanEvent::try_from(&row("1", "2026-03-14 09:30:16")).unwrap();

        assert_eq!(event.id, 12);
        assert_eq!(event.check_time.raw(), 260314093015);
        assert_eq!(event.user_id, UserId::new(4));
        assert_eq!(event.direction().unwrap(), Direction::Exit);
        assert_eq!(
            event.record_time.format("%H:%M:%S").to_string(),
            "09:30:16"
        );
    }

    #[test]
    fn test_unknown_flag_is_kept() {
        let event = ScanEvent::try_from(&row("7", "2026-03-14 09:30:16")).unwrap();
        assert_eq!(event.leaving, "7");
        assert!(event.direction().is_err());
    }

    #[test]
    fn test_bad_record_time() {
        let err = ScanEvent::try_from(&row("0", "yesterday")).unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
    }

    #[test]
    fn test_new_scan_event_params() {
        let event = NewScanEvent {
            tag_id: TagId::new("04A1B2C3").unwrap(),
            check_time: CheckTime::from_raw(260314093015),
            direction: Direction::Entry,
            user_id: UserId::UNKNOWN,
        };
        let params = event.to_params();
        let keys: Vec<&str> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["tag_id", "check_time", "leaving", "user_id"]);
    }
}
