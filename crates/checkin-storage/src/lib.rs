//! Storage layer for the check-in service.
//!
//! This crate provides SQLite-backed persistence for tag owners and scan
//! events through a small generic CRUD wrapper, plus the daily meters and
//! ranking computations that read those scans.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`Db`] - Per-request query handle: parameterized select, insert,
//!   update, replace and delete, with simulation and debug echo
//! - [`UserRepository`], [`ScanEventRepository`] - Data access traits built
//!   on [`Db`]
//! - [`aggregation`] - Daily meters and competition ranking
//!
//! # Safety of generated SQL
//!
//! Values always travel as [`BindParameter`]s. Table and column names are
//! checked against `[A-Za-z_][A-Za-z0-9_]*` and, when configured, a table
//! allow-list before they are spliced into statement text. WHERE clauses
//! are the one place callers write SQL themselves; they should reference
//! `:name` placeholders rather than format values in.
//!
//! # Examples
//!
//! ```no_run
//! use checkin_storage::{Database, DatabaseConfig};
//! use checkin_storage::repositories::{SqliteUserRepository, UserRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::new("checkin.db").allow_tables(["users", "scan_events"]);
//! let database = Database::connect_or_degraded(config).await;
//!
//! let users = SqliteUserRepository::new(database.db());
//! let owner = users.find_user_id_by_tag("04A1B2C3").await?;
//! if owner.is_unknown() {
//!     println!("tag has no owner");
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod connection;
pub mod db;
pub mod error;
pub mod models;
pub mod params;
pub mod repositories;
pub mod row;
pub mod sql;

pub use aggregation::{DailyMeters, RankEntry, daily_meters, rank_of, ranking};
pub use connection::{Database, DatabaseConfig};
pub use db::{Db, ExecOptions, QueryHandle};
pub use error::{StorageError, StorageResult};
pub use models::{NewScanEvent, ScanEvent, User};
pub use params::{BindParameter, ParamType, SqlValue};
pub use repositories::{
    ScanEventRepository, SqliteScanEventRepository, SqliteUserRepository, TimeColumn,
    UserRepository,
};
pub use row::Row;
