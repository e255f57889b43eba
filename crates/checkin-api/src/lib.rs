//! HTTP front end of the check-in service.
//!
//! RFID readers POST scans to `/api/checkin`; kiosks GET the same path with
//! a `tag_id` to show a user's meters for the day and their ranking. All
//! reader-facing responses are JSON with status 200, and requests outside
//! the configured opening hours are refused before touching the database.
//!
//! # Example
//!
//! ```no_run
//! use checkin_api::config::AppConfig;
//! use checkin_api::routes::router;
//! use checkin_api::state::AppState;
//! use checkin_storage::Database;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! let database = Database::connect_or_degraded(config.database.to_database_config()).await;
//! let app = router(AppState::new(database, config.settings()?));
//!
//! let listener = tokio::net::TcpListener::bind(config.server.addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod messages;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::ApiError;
pub use response::CheckinResponse;
pub use state::{AppState, Clock};
