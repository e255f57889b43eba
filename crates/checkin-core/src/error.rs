use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tag id: {0}")]
    InvalidTagId(String),

    #[error("Invalid check time '{value}': {reason}")]
    InvalidCheckTime { value: String, reason: String },

    #[error("Invalid leaving flag: {0}")]
    InvalidDirection(String),
}

pub type Result<T> = std::result::Result<T, Error>;
