//! Component I: the realtime cursor (spec.md §4.7 step 1/5, §4.10).
//! `advance_cursor` takes an already-open transaction (run through
//! `indexer_db::with_transaction`) so the cursor write itself is atomic;
//! the page's `process-event` enqueues live in Redis and can't share that
//! transaction, so the Realtime Worker enqueues first and advances the
//! cursor second, relying on downstream idempotency to cover the gap.

use sqlx::{PgPool, Postgres, Transaction};

pub const REALTIME_SYNC: &str = "realtime-sync";

pub async fn get_cursor(pool: &PgPool, name: &str) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(Option<i64>,)> = sqlx::query_as("select last_event_id from sync_state where name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|(id,)| id))
}

/// Monotonic: never moves `last_event_id` backward (invariant 4), even if
/// called with a stale value by a racing caller.
pub async fn advance_cursor(txn: &mut Transaction<'_, Postgres>, name: &str, new_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "insert into sync_state (name, last_event_id, last_synced_at) values ($1, $2, now()) \
         on conflict (name) do update set \
             last_event_id = greatest(coalesce(sync_state.last_event_id, 0), excluded.last_event_id), \
             last_synced_at = excluded.last_synced_at",
    )
    .bind(name)
    .bind(new_id)
    .execute(&mut **txn)
    .await?;
    Ok(())
}
