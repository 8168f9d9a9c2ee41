//! Error types for database plumbing shared by the services

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Error type for pool setup, migrations and health checks
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred while opening the pool
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred while applying schema migrations
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Invalid or missing configuration
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Whether a sqlx error is a unique constraint violation (e.g. a duplicate email)
pub fn is_unique_violation(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Whether a sqlx error is a foreign key violation (e.g. a missing parent row)
pub fn is_foreign_key_violation(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db) => db.is_foreign_key_violation(),
        _ => false,
    }
}
