use crate::{
    Result,
    constants::{CHECK_TIME_FORMAT, MAX_TAG_LENGTH, SYSTEM_USER_ID, UNKNOWN_USER_ID},
    error::Error,
};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// RFID tag identifier (1-64 characters)
///
/// # Security
/// This type implements constant-time comparison so tag lookups do not
/// leak how much of a guessed tag matched.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Create a new tag id with validation.
    ///
    /// Surrounding whitespace is trimmed. Case is preserved because tags are
    /// matched literally against the users table.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagId` if:
    /// - The tag is empty after trimming or longer than 64 characters
    /// - The tag contains control characters
    pub fn new(tag: &str) -> Result<Self> {
        let tag = tag.trim();

        if tag.is_empty() {
            return Err(Error::InvalidTagId("tag id is empty".to_string()));
        }

        let len = tag.chars().count();
        if len > MAX_TAG_LENGTH {
            return Err(Error::InvalidTagId(format!(
                "tag id must be at most {MAX_TAG_LENGTH} chars, got {len}"
            )));
        }

        if tag.chars().any(char::is_control) {
            return Err(Error::InvalidTagId(
                "tag id must not contain control characters".to_string(),
            ));
        }

        Ok(TagId(tag.to_string()))
    }

    /// Get the tag id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagId::new(s)
    }
}

impl PartialEq for TagId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for TagId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// User identifier
///
/// `0` marks a scan whose tag has no owner, `1` is the reserved system user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const UNKNOWN: UserId = UserId(UNKNOWN_USER_ID);
    pub const SYSTEM: UserId = UserId(SYSTEM_USER_ID);

    #[must_use]
    pub fn new(id: i64) -> Self {
        UserId(id)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` if the tag lookup found no owner.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        self.0 == UNKNOWN_USER_ID
    }

    /// Returns `true` for the reserved system account.
    #[must_use]
    pub fn is_system(self) -> bool {
        self.0 == SYSTEM_USER_ID
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// Scan timestamp in the reader's compact format (`YYMMDDHHMMSS`)
///
/// Readers send the value as a plain integer, so the raw number is kept as
/// is and only decoded when a calendar date is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckTime(i64);

impl CheckTime {
    /// Wrap a raw integer without checking that it decodes to a date.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        CheckTime(raw)
    }

    /// Encode a local date time.
    #[must_use]
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        let encoded = dt.format(CHECK_TIME_FORMAT).to_string();
        // Twelve ASCII digits always fit in an i64.
        CheckTime(encoded.parse().unwrap_or_default())
    }

    /// Parse the decimal form sent by readers (`"260314093015"`).
    ///
    /// # Errors
    /// Returns `Error::InvalidCheckTime` if the value is not an integer.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        trimmed
            .parse::<i64>()
            .map(CheckTime)
            .map_err(|e| Error::InvalidCheckTime {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    #[must_use]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Decode into a calendar date time.
    ///
    /// # Errors
    /// Returns `Error::InvalidCheckTime` if the number is not a valid
    /// `YYMMDDHHMMSS` date.
    pub fn to_datetime(self) -> Result<NaiveDateTime> {
        let digits = format!("{:012}", self.0);
        NaiveDateTime::parse_from_str(&digits, CHECK_TIME_FORMAT).map_err(|e| {
            Error::InvalidCheckTime {
                value: self.0.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Day bucket used by the meters aggregation (`20260314`).
    ///
    /// # Errors
    /// Same as [`CheckTime::to_datetime`].
    pub fn day_key(self) -> Result<u32> {
        let dt = self.to_datetime()?;
        Ok(day_key(&dt))
    }
}

impl fmt::Display for CheckTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:012}", self.0)
    }
}

/// Day key (`YYYYMMDD`) of a date time.
#[must_use]
pub fn day_key(dt: &NaiveDateTime) -> u32 {
    let date = dt.date();
    // Years before 0 never occur in scan data.
    date.year().unsigned_abs() * 10_000 + date.month() * 100 + date.day()
}

/// Scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Entry = 0,
    Exit = 1,
}

impl Direction {
    /// Parse the reader's `leaving` flag.
    ///
    /// # Errors
    /// Returns `Error::InvalidDirection` if the flag is not `0` or `1`.
    pub fn from_leaving_flag(flag: &str) -> Result<Self> {
        match flag.trim() {
            "0" => Ok(Direction::Entry),
            "1" => Ok(Direction::Exit),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }

    /// Flag as stored in the `leaving` column.
    #[inline]
    #[must_use]
    pub fn leaving_flag(self) -> &'static str {
        match self {
            Direction::Entry => "0",
            Direction::Exit => "1",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_entry(self) -> bool {
        matches!(self, Direction::Entry)
    }

    #[inline]
    #[must_use]
    pub fn is_exit(self) -> bool {
        matches!(self, Direction::Exit)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Entry => write!(f, "Entry"),
            Direction::Exit => write!(f, "Exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case("04A1B2C3", "04A1B2C3")]
    #[case("  04a1b2c3 ", "04a1b2c3")]
    #[case("1", "1")]
    fn test_tag_id_valid(#[case] input: &str, #[case] expected: &str) {
        let tag = TagId::new(input).unwrap();
        assert_eq!(tag.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc\u{7}def")]
    fn test_tag_id_invalid(#[case] input: &str) {
        assert!(TagId::new(input).is_err());
    }

    #[test]
    fn test_tag_id_too_long() {
        let long = "A".repeat(MAX_TAG_LENGTH + 1);
        assert!(TagId::new(&long).is_err());
        assert!(TagId::new(&long[1..]).is_ok());
    }

    #[test]
    fn test_tag_id_equality() {
        assert_eq!(TagId::new("ABC").unwrap(), TagId::new(" ABC").unwrap());
        assert_ne!(TagId::new("ABC").unwrap(), TagId::new("abc").unwrap());
    }

    #[test]
    fn test_user_id_markers() {
        assert!(UserId::UNKNOWN.is_unknown());
        assert!(UserId::SYSTEM.is_system());
        assert!(!UserId::new(42).is_unknown());
        assert_eq!(UserId::from(42).get(), 42);
    }

    #[test]
    fn test_check_time_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 15)
            .unwrap();
        let ct = CheckTime::from_datetime(dt);
        assert_eq!(ct.raw(), 260314093015);
        assert_eq!(ct.to_datetime().unwrap(), dt);
        assert_eq!(ct.day_key().unwrap(), 20260314);
    }

    #[test]
    fn test_check_time_leading_zero_year() {
        let ct = CheckTime::parse("50102080000").unwrap();
        assert_eq!(ct.to_string(), "050102080000");
        assert_eq!(ct.day_key().unwrap(), 20050102);
    }

    #[rstest]
    #[case("abc")]
    #[case("26-03-14")]
    #[case("")]
    fn test_check_time_parse_invalid(#[case] input: &str) {
        assert!(CheckTime::parse(input).is_err());
    }

    #[test]
    fn test_check_time_undecodable() {
        let ct = CheckTime::from_raw(261399000000);
        assert!(ct.to_datetime().is_err());
        assert!(ct.day_key().is_err());
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::from_leaving_flag("0").unwrap(), Direction::Entry);
        assert_eq!(Direction::from_leaving_flag(" 1").unwrap(), Direction::Exit);
        assert!(Direction::from_leaving_flag("2").is_err());
        assert!(Direction::from_leaving_flag("yes").is_err());

        assert_eq!(Direction::Exit.leaving_flag(), "1");
        assert!(Direction::Entry.is_entry());
        assert!(Direction::Exit.is_exit());
    }
}
