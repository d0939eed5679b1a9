/// Errors surfaced by `indexer-db` at API boundaries callers need to match
/// on (transient vs. permanent). Internal helpers use `anyhow::Result`
/// (teacher: `agent-sql` functions return `sqlx::Result`/`anyhow::Result`
/// directly; this enum exists only where a caller needs to branch on cause).
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database operation failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Classifies a `sqlx::Error` as transient (worth retrying) or permanent,
/// following the "taxonomy drives retry" idiom (spec.md §7).
///
/// Transient: pool acquire timeout, I/O errors, and the two Postgres codes
/// that mean "retry the whole transaction": `40001` (serialization failure)
/// and `40P01` (deadlock detected).
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn row_not_found_is_not_transient() {
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
