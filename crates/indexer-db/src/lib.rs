//! Component C: the persistence layer (spec.md §4.3). Grounded on
//! `agent-sql`'s thin-functions-over-`sqlx::PgPool` style and
//! `agent/src/main.rs`'s pool construction.

pub mod casts;
pub mod delete;
pub mod entities;
pub mod error;
pub mod pool;
pub mod profiles;
pub mod retry;
pub mod sync_state;
pub mod targets;
pub mod upsert;

pub use error::DbError;
pub use pool::{connect, migrate, DbEnvironment};
pub use retry::{default_base_delay, default_retries, safe_db_operation};

/// `withTransaction` (spec.md §4.3): runs `op` inside a transaction,
/// committing on `Ok` and rolling back on `Err`. Grounded on the
/// `lock_live_specs`/publication-handling functions in `agent-sql`, which
/// take an already-open `&mut Transaction` rather than owning the
/// begin/commit themselves. Used by the Sync Cursor (I) to wrap its own
/// advance step; it can't also cover the Redis enqueue that precedes it in
/// the Realtime Worker, since that lives in a different store.
pub async fn with_transaction<T, F>(pool: &sqlx::PgPool, op: F) -> Result<T, sqlx::Error>
where
    F: for<'c> FnOnce(
        &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> futures::future::BoxFuture<'c, Result<T, sqlx::Error>>,
{
    let mut txn = pool.begin().await?;
    match op(&mut txn).await {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            let _ = txn.rollback().await;
            Err(err)
        }
    }
}
