//! Generic parameterized CRUD over the shared pool.
//!
//! A [`Db`] is a per-request handle: it shares the connection pool but owns
//! its execution options and a small session (last insert id, last error,
//! echo transcript). Cloning a handle keeps the options and starts a fresh
//! session.
//!
//! # Example
//!
//! ```no_run
//! use checkin_storage::{BindParameter, Database};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let database = Database::in_memory().await?;
//! let db = database.db();
//!
//! db.insert(
//!     "users",
//!     &[
//!         BindParameter::text("tag_id", "04A1B2C3"),
//!         BindParameter::text("user_name", "Aiko"),
//!     ],
//! )
//! .await?;
//! println!("new user {}", db.last_insert_id());
//!
//! let rows = db
//!     .select(
//!         "users",
//!         "user_id, user_name",
//!         "tag_id = :tag_id",
//!         &[BindParameter::text("tag_id", "04A1B2C3")],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{StorageError, StorageResult};
use crate::params::{BindParameter, SqlValue};
use crate::row::Row;
use crate::sql::{self, BoundStatement, StatementKind};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const SIMULATION_PREFIX: &str = "*SimulationMode: Query is not Executed!*";
const DEBUG_QUERY_PREFIX: &str = "*debug mode on: query*";
const DEBUG_RESULTS: &str = "query results*";

/// Execution toggles of one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOptions {
    /// Echo statements instead of running them
    pub simulate: bool,
    /// Echo each executed statement and its outcome
    pub debug: bool,
    /// Wrap debug echo in HTML comments instead of `<br>` lines
    pub debug_hidden: bool,
}

impl ExecOptions {
    pub fn simulated() -> Self {
        Self {
            simulate: true,
            ..Self::default()
        }
    }

    pub fn debug(hidden: bool) -> Self {
        Self {
            debug: true,
            debug_hidden: hidden,
            ..Self::default()
        }
    }
}

/// Outcome of an executed statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryHandle {
    rows: Vec<Row>,
    rows_affected: u64,
    last_insert_id: i64,
}

impl QueryHandle {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Rows changed by a write, or rows returned by a read
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    fn summary(&self) -> String {
        format!(
            "{} row(s) returned, {} affected, last insert id {}",
            self.rows.len(),
            self.rows_affected,
            self.last_insert_id
        )
    }
}

#[derive(Debug, Default)]
struct Session {
    last_insert_id: i64,
    last_error: Option<String>,
    echo: Vec<String>,
}

/// Query handle over the shared pool
#[derive(Debug)]
pub struct Db {
    pool: SqlitePool,
    healthy: bool,
    options: ExecOptions,
    allowed_tables: Option<Arc<BTreeSet<String>>>,
    session: Mutex<Session>,
}

impl Clone for Db {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            healthy: self.healthy,
            options: self.options,
            allowed_tables: self.allowed_tables.clone(),
            session: Mutex::default(),
        }
    }
}

impl Db {
    pub(crate) fn new(
        pool: SqlitePool,
        healthy: bool,
        allowed_tables: Option<Arc<BTreeSet<String>>>,
    ) -> Self {
        Self {
            pool,
            healthy,
            options: ExecOptions::default(),
            allowed_tables,
            session: Mutex::default(),
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// Restrict table names to the given set
    pub fn with_allowed_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tables = Some(Arc::new(tables.into_iter().map(Into::into).collect()));
        self
    }

    pub fn set_sim_mode(&mut self, on: bool) {
        self.options.simulate = on;
    }

    pub fn set_debug_mode(&mut self, on: bool, hidden: bool) {
        self.options.debug = on;
        self.options.debug_hidden = hidden;
    }

    pub fn options(&self) -> ExecOptions {
        self.options
    }

    /// Whether the underlying connection was established
    pub fn is_successful(&self) -> bool {
        self.healthy
    }

    /// Message of the last failed statement, if any
    pub fn last_error(&self) -> Option<String> {
        self.session().last_error.clone()
    }

    /// Id generated by the last insert or replace on this handle, `"0"` if none
    pub fn last_insert_id(&self) -> String {
        self.session().last_insert_id.to_string()
    }

    /// Drain the echo transcript
    pub fn take_echo(&self) -> Vec<String> {
        std::mem::take(&mut self.session().echo)
    }

    /// Run a prepared statement with named placeholders
    ///
    /// Returns `Ok(None)` in simulation mode. Failures are recorded as the
    /// handle's last error before being returned.
    pub async fn query(
        &self,
        sql: &str,
        params: &[BindParameter],
    ) -> StorageResult<Option<QueryHandle>> {
        if self.options.simulate {
            self.push_echo(format!("{SIMULATION_PREFIX}{sql}"));
            return Ok(None);
        }

        let result = if !self.healthy {
            Err(StorageError::Unavailable)
        } else {
            match sql::bind_named(sql, params) {
                Ok(bound) => self.execute(&bound).await,
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(handle) => {
                if is_insert(sql) && handle.last_insert_id != 0 {
                    self.session().last_insert_id = handle.last_insert_id;
                }
                if self.options.debug {
                    self.debug_echo(format!("{DEBUG_QUERY_PREFIX}{sql}"));
                    self.debug_echo(DEBUG_RESULTS.to_string());
                    self.debug_echo(handle.summary());
                }
                Ok(Some(handle))
            }
            Err(e) => {
                warn!(error = %e, "statement failed");
                if self.options.debug {
                    self.debug_echo(e.to_string());
                }
                self.session().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Run a statement without parameters
    ///
    /// Rows are returned unless `no_return` is set or the handle is simulated.
    pub async fn raw_query(&self, sql: &str, no_return: bool) -> StorageResult<Vec<Row>> {
        let handle = self.query(sql, &[]).await?;
        Ok(match handle {
            Some(handle) if !no_return => handle.into_rows(),
            _ => Vec::new(),
        })
    }

    /// `SELECT columns FROM tables [WHERE ..]`
    ///
    /// `tables` is a comma-separated list of table names and `columns` is
    /// `*` or a comma-separated list of column names.
    pub async fn select(
        &self,
        tables: &str,
        columns: &str,
        where_clause: &str,
        params: &[BindParameter],
    ) -> StorageResult<Vec<Row>> {
        let tables = sql::table_list(tables, self.allowed())?;
        let columns = sql::column_list(columns)?;
        let statement = sql::select(&tables, &columns, where_clause);
        Ok(self
            .query(&statement, params)
            .await?
            .map(QueryHandle::into_rows)
            .unwrap_or_default())
    }

    /// Insert one row; each keyed parameter names a column
    pub async fn insert(
        &self,
        table: &str,
        params: &[BindParameter],
    ) -> StorageResult<Option<QueryHandle>> {
        let table = sql::table_identifier(table, self.allowed())?;
        let statement = sql::insert("INSERT", &table, params)?;
        self.query(&statement, params).await
    }

    /// Insert or overwrite one row, keyed like [`Db::insert`]
    pub async fn replace(
        &self,
        table: &str,
        params: &[BindParameter],
    ) -> StorageResult<Option<QueryHandle>> {
        let table = sql::table_identifier(table, self.allowed())?;
        let statement = sql::insert("REPLACE", &table, params)?;
        self.query(&statement, params).await
    }

    /// `UPDATE table SET .. WHERE ..`
    ///
    /// `params` build the SET clause; `where_params` bind the placeholders
    /// of `where_clause`.
    pub async fn update(
        &self,
        table: &str,
        where_clause: &str,
        where_params: &[BindParameter],
        params: &[BindParameter],
    ) -> StorageResult<Option<QueryHandle>> {
        let table = sql::table_identifier(table, self.allowed())?;
        let statement = sql::update(&table, params, where_clause)?;
        let bind: Vec<BindParameter> = params.iter().chain(where_params).cloned().collect();
        self.query(&statement, &bind).await
    }

    pub async fn delete(
        &self,
        table: &str,
        where_clause: &str,
        params: &[BindParameter],
    ) -> StorageResult<()> {
        let table = sql::table_identifier(table, self.allowed())?;
        let statement = sql::delete(&table, where_clause)?;
        self.query(&statement, params).await?;
        Ok(())
    }

    /// Next AUTOINCREMENT value for `table`
    pub async fn auto_increment(&self, table: &str) -> StorageResult<i64> {
        let quoted = sql::table_identifier(table, self.allowed())?;
        let name = &quoted[1..quoted.len() - 1];

        if self.has_sequence_table().await? {
            let rows = self
                .expect_rows(
                    "SELECT seq + 1 AS next FROM sqlite_sequence WHERE name = :name",
                    &[BindParameter::text("name", name)],
                )
                .await?;
            if let Some(row) = rows.first() {
                return row.get_i64("next");
            }
        }

        let rows = self
            .expect_rows(
                &format!("SELECT COALESCE(MAX(rowid), 0) + 1 AS next FROM {quoted}"),
                &[],
            )
            .await?;
        rows.first().map_or(Ok(1), |row| row.get_i64("next"))
    }

    /// Remove every row of `table` and reset its AUTOINCREMENT counter
    pub async fn truncate(&self, table: &str) -> StorageResult<()> {
        let quoted = sql::table_identifier(table, self.allowed())?;
        let name = quoted[1..quoted.len() - 1].to_string();

        self.query(&format!("DELETE FROM {quoted}"), &[]).await?;
        if !self.options.simulate && self.has_sequence_table().await? {
            self.query(
                "DELETE FROM sqlite_sequence WHERE name = :name",
                &[BindParameter::text("name", name)],
            )
            .await?;
        }
        Ok(())
    }

    /// Driver name and server version, e.g. `sqlite:3.46.0`
    pub async fn db_version(&self) -> StorageResult<String> {
        let rows = self
            .expect_rows("SELECT sqlite_version() AS version", &[])
            .await?;
        let version = rows
            .first()
            .map(|row| row.get_text("version"))
            .transpose()?
            .unwrap_or_default();
        Ok(format!("sqlite:{version}"))
    }

    /// User tables and views as `{name, type}` rows
    pub async fn table_list(&self) -> StorageResult<Vec<Row>> {
        self.expect_rows(
            r"SELECT name, type FROM sqlite_master
              WHERE type IN ('table', 'view')
                AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
                AND name NOT LIKE '\_sqlx\_%' ESCAPE '\'
              ORDER BY name",
            &[],
        )
        .await
    }

    async fn has_sequence_table(&self) -> StorageResult<bool> {
        let rows = self
            .expect_rows(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
                &[],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Rows of a read that must actually run
    async fn expect_rows(&self, sql: &str, params: &[BindParameter]) -> StorageResult<Vec<Row>> {
        self.query(sql, params)
            .await?
            .map(QueryHandle::into_rows)
            .ok_or_else(|| StorageError::Simulated(sql.to_string()))
    }

    async fn execute(&self, bound: &BoundStatement) -> StorageResult<QueryHandle> {
        let query = bound
            .values
            .iter()
            .fold(sqlx::query(&bound.sql), |query, value| bind_value(query, value));

        match StatementKind::of(&bound.sql) {
            StatementKind::Rows => {
                let rows = query
                    .fetch_all(&self.pool)
                    .await?
                    .iter()
                    .map(Row::from_sqlite)
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(QueryHandle {
                    rows_affected: rows.len() as u64,
                    rows,
                    last_insert_id: 0,
                })
            }
            StatementKind::Write => {
                let result = query.execute(&self.pool).await?;
                Ok(QueryHandle {
                    rows: Vec::new(),
                    rows_affected: result.rows_affected(),
                    last_insert_id: result.last_insert_rowid(),
                })
            }
        }
    }

    fn allowed(&self) -> Option<&BTreeSet<String>> {
        self.allowed_tables.as_deref()
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_echo(&self, entry: String) {
        debug!(target: "checkin_storage::echo", "{entry}");
        self.session().echo.push(entry);
    }

    fn debug_echo(&self, message: String) {
        let entry = if self.options.debug_hidden {
            format!("<!--{message} -->")
        } else {
            format!("<br>{message}<br>")
        };
        self.push_echo(entry);
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Blob(v) => query.bind(v.clone()),
    }
}

fn is_insert(sql: &str) -> bool {
    let first = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(first.as_str(), "INSERT" | "REPLACE")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn seeded() -> Db {
        let database = Database::in_memory().await.unwrap();
        let db = database.db();
        db.insert(
            "users",
            &[
                BindParameter::text("tag_id", "TAG-A"),
                BindParameter::text("user_name", "Aiko"),
            ],
        )
        .await
        .unwrap();
        db
    }

    async fn name_of(db: &Db, tag: &str) -> Option<String> {
        db.select(
            "users",
            "user_name",
            "tag_id = :tag",
            &[BindParameter::text("tag", tag)],
        )
        .await
        .unwrap()
        .first()
        .map(|row| row.get_text("user_name").unwrap())
    }

    #[tokio::test]
    async fn test_insert_sets_last_insert_id() {
        let db = seeded().await;
        // id 1 is the seeded system user
        assert_eq!(db.last_insert_id(), "2");
    }

    #[tokio::test]
    async fn test_last_insert_id_defaults_to_zero() {
        let database = Database::in_memory().await.unwrap();
        assert_eq!(database.db().last_insert_id(), "0");
    }

    #[tokio::test]
    async fn test_select_binds_where_params() {
        let db = seeded().await;
        assert_eq!(name_of(&db, "TAG-A").await.as_deref(), Some("Aiko"));
        assert_eq!(name_of(&db, "TAG-Z").await, None);
    }

    #[tokio::test]
    async fn test_simulation_never_writes() {
        let db = seeded().await.with_options(ExecOptions::simulated());
        let outcome = db
            .insert(
                "users",
                &[
                    BindParameter::text("tag_id", "TAG-B"),
                    BindParameter::text("user_name", "Ben"),
                ],
            )
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(db.last_insert_id(), "2");

        let echo = db.take_echo();
        assert_eq!(echo.len(), 1);
        assert!(echo[0].starts_with("*SimulationMode: Query is not Executed!*INSERT INTO"));

        let live = db.clone().with_options(ExecOptions::default());
        assert_eq!(name_of(&live, "TAG-B").await, None);
    }

    #[tokio::test]
    async fn test_set_modes() {
        let mut db = seeded().await;
        db.set_sim_mode(true);
        assert!(db.raw_query("SELECT 1", false).await.unwrap().is_empty());

        db.set_sim_mode(false);
        db.set_debug_mode(true, true);
        assert_eq!(db.raw_query("SELECT 1 AS one", false).await.unwrap().len(), 1);
        assert!(db.options().debug_hidden);
    }

    #[tokio::test]
    async fn test_debug_echo_wrapping() {
        let db = seeded().await.with_options(ExecOptions::debug(false));
        db.raw_query("SELECT 1", false).await.unwrap();
        let echo = db.take_echo();
        assert_eq!(echo[0], "<br>*debug mode on: query*SELECT 1<br>");
        assert_eq!(echo[1], "<br>query results*<br>");

        let hidden = db.clone().with_options(ExecOptions::debug(true));
        hidden.raw_query("SELECT 1", true).await.unwrap();
        assert_eq!(hidden.take_echo()[0], "<!--*debug mode on: query*SELECT 1 -->");
    }

    #[tokio::test]
    async fn test_clone_starts_fresh_session() {
        let db = seeded().await;
        let other = db.clone();
        assert_eq!(db.last_insert_id(), "2");
        assert_eq!(other.last_insert_id(), "0");
    }

    #[tokio::test]
    async fn test_failure_recorded_as_last_error() {
        let db = seeded().await;
        let err = db.raw_query("SELECT * FROM missing_table", false).await;
        assert!(err.is_err());
        assert!(db.last_error().unwrap().contains("missing_table"));
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_executes() {
        let db = seeded().await.with_options(ExecOptions::debug(false));
        let err = db
            .select("users; DROP TABLE users", "*", "", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier { .. }));
        assert!(db.take_echo().is_empty());
    }

    #[tokio::test]
    async fn test_allow_list_rejects_other_tables() {
        let db = seeded().await.with_allowed_tables(["scan_events"]);
        let err = db.select("users", "*", "", &[]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = seeded().await;
        let tag = [BindParameter::text("tag", "TAG-A")];
        db.update(
            "users",
            "tag_id = :tag",
            &tag,
            &[BindParameter::text("user_name", "Aiko S.")],
        )
        .await
        .unwrap();
        assert_eq!(name_of(&db, "TAG-A").await.as_deref(), Some("Aiko S."));

        db.delete("users", "tag_id = :tag", &tag).await.unwrap();
        assert_eq!(name_of(&db, "TAG-A").await, None);
    }

    #[tokio::test]
    async fn test_replace_overwrites_row() {
        let db = seeded().await;
        db.replace(
            "users",
            &[
                BindParameter::int("user_id", 2),
                BindParameter::text("tag_id", "TAG-A"),
                BindParameter::text("user_name", "Aiko R."),
            ],
        )
        .await
        .unwrap();
        let rows = db
            .select("users", "*", "tag_id = :tag", &[BindParameter::text("tag", "TAG-A")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_text("user_name").unwrap(), "Aiko R.");
    }

    #[tokio::test]
    async fn test_auto_increment_and_truncate() {
        let db = seeded().await;
        assert_eq!(db.auto_increment("users").await.unwrap(), 3);
        assert_eq!(db.auto_increment("scan_events").await.unwrap(), 1);

        db.truncate("users").await.unwrap();
        assert!(db.select("users", "*", "", &[]).await.unwrap().is_empty());
        assert_eq!(db.auto_increment("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_db_version_and_table_list() {
        let db = seeded().await;
        assert!(db.db_version().await.unwrap().starts_with("sqlite:3"));

        let tables = db.table_list().await.unwrap();
        let names: Vec<String> = tables
            .iter()
            .map(|row| row.get_text("name").unwrap())
            .collect();
        assert_eq!(names, vec!["scan_events", "users"]);
    }
}
