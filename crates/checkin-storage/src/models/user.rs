use crate::error::StorageError;
use crate::row::Row;
use checkin_core::{TagId, UserId};
use serde::{Deserialize, Serialize};

/// Owner of an RFID tag
///
/// Maps to the `users` table. The service only reads users; they are
/// provisioned out of band.
///
/// # Examples
///
/// ```
/// use checkin_storage::models::User;
/// use checkin_storage::{Row, SqlValue};
///
/// let row = Row::new(vec![
///     ("user_id".to_string(), SqlValue::Integer(7)),
///     ("tag_id".to_string(), SqlValue::Text("04A1B2C3".to_string())),
///     ("user_name".to_string(), SqlValue::Text("Aiko".to_string())),
/// ]);
///
/// let user = User::try_from(&row).unwrap();
/// assert_eq!(user.user_id.get(), 7);
/// assert!(!user.is_system());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub tag_id: TagId,
    pub user_name: String,
}

impl User {
    /// Returns `true` for the reserved account left out of rankings
    pub fn is_system(&self) -> bool {
        self.user_id.is_system()
    }
}

impl TryFrom<&Row> for User {
    type Error = StorageError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(row.get_i64("user_id")?),
            tag_id: TagId::new(&row.get_text("tag_id")?)?,
            user_name: row.get_text("user_name")?,
        })
    }
}
