use thiserror::Error;

/// Storage-specific error types for the check-in service.
///
/// These errors represent failures in statement building, parameter binding,
/// and database execution.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A placeholder had no matching parameter, or a statement could not be built
    #[error("Bind error: {0}")]
    Bind(String),

    /// Table or column name rejected before reaching SQL
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Operation needs a real result but the handle is in simulation mode
    #[error("Statement not executed (simulation mode): {0}")]
    Simulated(String),

    /// A row did not have the expected shape
    #[error("Decode error: column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// The startup connection failed; nothing is sent to the driver
    #[error("Database unavailable: the initial connection failed")]
    Unavailable,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Domain value rejected
    #[error(transparent)]
    Core(#[from] checkin_core::Error),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
