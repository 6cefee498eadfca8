use rusqlite::ffi;
use thiserror::Error;

use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error, raised for rows the schema rejects
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A conditional update found the row in an unexpected state
    #[error("Stale state: {0}")]
    StaleState(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(error: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = error {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return RepositoryError::Conflict(detail)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return RepositoryError::Validation(format!("Referenced record does not exist ({})", detail))
                }
                ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                    return RepositoryError::Validation(detail)
                }
                _ => {}
            }
        }
        RepositoryError::Sqlite(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_error(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: ffi::ErrorCode::ConstraintViolation,
                extended_code,
            },
            Some("constraint failed".to_string()),
        )
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err: RepositoryError = constraint_error(ffi::SQLITE_CONSTRAINT_UNIQUE).into();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn test_foreign_key_violation_maps_to_validation() {
        let err: RepositoryError = constraint_error(ffi::SQLITE_CONSTRAINT_FOREIGNKEY).into();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[test]
    fn test_other_errors_stay_sqlite() {
        let err: RepositoryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, RepositoryError::Sqlite(_)));
    }
}
