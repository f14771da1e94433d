//! Classification of sqlx failures into typed repository errors.

use portal_types::RepoError;

/// Maps a sqlx error onto the port's error taxonomy.
///
/// Unique violations become [`RepoError::Conflict`] from the driver's error
/// kind, never from message text.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            RepoError::Unavailable(e.to_string())
        }
        e => RepoError::Database(e.to_string()),
    }
}

/// Error for a stored value that no longer parses into its domain type.
pub(crate) fn corrupt(column: &str, err: impl std::fmt::Display) -> RepoError {
    RepoError::Database(format!("corrupt value in column {}: {}", column, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Unavailable(_)
        ));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::Database(_)
        ));
    }
}
