//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value cannot be mapped to the domain model
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Team already exists
    #[error("Team already exists: {0}")]
    TeamExists(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary SQLite result codes that mean another connection holds the data
/// (SQLITE_BUSY, SQLITE_LOCKED). Extended codes carry these in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Whether an extended SQLite result code is a lock contention
fn is_contention_code(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

impl Error {
    fn is_contention(&self) -> bool {
        match self {
            Error::Sqlx(sqlx::Error::Database(db)) => {
                db.code().is_some_and(|code| is_contention_code(&code))
            }
            _ => false,
        }
    }
}

impl From<Error> for roster_core::Error {
    fn from(err: Error) -> Self {
        if err.is_contention() {
            return roster_core::Error::Conflict(err.to_string());
        }
        match err {
            Error::NotFound(what) => roster_core::Error::NotFound(what),
            Error::TeamExists(team) => roster_core::Error::TeamExists(team),
            other => roster_core::Error::infrastructure(other),
        }
    }
}
