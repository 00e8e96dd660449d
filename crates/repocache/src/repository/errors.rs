use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::entity::platform::Platform;

/// Errors that can occur during repository store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness or foreign-key constraint rejected the statement.
    #[error("Constraint violation: {message}")]
    Constraint { message: String },

    /// The store is momentarily unavailable (locked, busy, disconnected).
    #[error("Transient database error: {source}")]
    Transient { source: DbErr },

    /// A row that must exist could not be read back.
    #[error("Repository not found: {context}")]
    NotFound { context: String },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// `extra_info` could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    /// Create a NotFound error for a `(platform, remote_id)` lookup.
    pub fn not_found_by_remote_id(platform: Platform, remote_id: &str) -> Self {
        Self::NotFound {
            context: format!("{} remote_id={}", platform, remote_id),
        }
    }

    /// Whether retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether the error is a constraint violation.
    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint { .. })
    }
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message))
            | Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                return Self::Constraint { message };
            }
            _ => {}
        }

        if is_constraint_message(&err) {
            Self::Constraint {
                message: err.to_string(),
            }
        } else if is_retryable_db_error(&err) {
            Self::Transient { source: err }
        } else {
            Self::Database(err)
        }
    }
}

fn is_constraint_message(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: UNIQUE constraint failed
            // PostgreSQL: duplicate key value violates unique constraint
            err_str.contains("unique constraint") || err_str.contains("duplicate key")
        }
        _ => false,
    }
}

pub(crate) fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
