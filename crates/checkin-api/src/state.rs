//! Shared request state.

use crate::config::ServiceSettings;
use checkin_storage::Database;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;

/// Source of "now" for the opening-hours gate and the daily summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Local wall clock
    #[default]
    System,
    /// Frozen time, for tests and replays
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(at) => at,
        }
    }
}

/// Axum state: the connection pool plus parsed settings
///
/// Handlers take a fresh `Db` from [`Database::db`] per request, so
/// execution options never leak between requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub database: Database,
    pub settings: Arc<ServiceSettings>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(database: Database, settings: ServiceSettings) -> Self {
        Self {
            database,
            settings: Arc::new(settings),
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}
