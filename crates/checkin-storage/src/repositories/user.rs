#![allow(async_fn_in_trait)]

use crate::db::Db;
use crate::error::{StorageError, StorageResult};
use crate::models::User;
use crate::params::BindParameter;
use checkin_core::constants::USERS_TABLE;
use checkin_core::{TagId, UserId};

/// Repository trait for tag owners
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature),
/// eliminating the need for the async-trait crate while maintaining
/// full async/await support in trait methods.
pub trait UserRepository: Send + Sync {
    /// Find the user owning a tag
    async fn find_by_tag(&self, tag: &str) -> StorageResult<Option<User>>;

    /// Owner id of a tag, [`UserId::UNKNOWN`] when nobody owns it
    async fn find_user_id_by_tag(&self, tag: &str) -> StorageResult<UserId>;

    /// Display name of a user
    async fn find_user_name(&self, user_id: UserId) -> StorageResult<Option<String>>;

    /// Register a tag owner
    async fn create(&self, tag: &TagId, user_name: &str) -> StorageResult<UserId>;
}

/// UserRepository over the generic [`Db`] helpers
pub struct SqliteUserRepository {
    db: Db,
}

impl SqliteUserRepository {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_tag(&self, tag: &str) -> StorageResult<Option<User>> {
        let rows = self
            .db
            .select(
                USERS_TABLE,
                "user_id, tag_id, user_name",
                "tag_id = :tag_id LIMIT 1",
                &[BindParameter::text("tag_id", tag)],
            )
            .await?;

        rows.first().map(User::try_from).transpose()
    }

    async fn find_user_id_by_tag(&self, tag: &str) -> StorageResult<UserId> {
        let rows = self
            .db
            .select(
                USERS_TABLE,
                "user_id",
                "tag_id = :tag_id LIMIT 1",
                &[BindParameter::text("tag_id", tag)],
            )
            .await?;

        match rows.first() {
            Some(row) => Ok(UserId::new(row.get_i64("user_id")?)),
            None => Ok(UserId::UNKNOWN),
        }
    }

    async fn find_user_name(&self, user_id: UserId) -> StorageResult<Option<String>> {
        let rows = self
            .db
            .select(
                USERS_TABLE,
                "user_name",
                "user_id = :user_id LIMIT 1",
                &[BindParameter::int("user_id", user_id.get())],
            )
            .await?;

        rows.first().map(|row| row.get_text("user_name")).transpose()
    }

    async fn create(&self, tag: &TagId, user_name: &str) -> StorageResult<UserId> {
        let handle = self
            .db
            .insert(
                USERS_TABLE,
                &[
                    BindParameter::text("tag_id", tag.as_str()),
                    BindParameter::text("user_name", user_name),
                ],
            )
            .await?
            .ok_or_else(|| StorageError::Simulated(format!("insert into {USERS_TABLE}")))?;

        Ok(UserId::new(handle.last_insert_id()))
    }
}
