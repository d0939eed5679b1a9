//! Target/target-client CRUD (spec.md §3, §4.8 expansion rules). Mutations
//! here are always followed by a cache write in `indexer-cache` — per
//! invariant 6, callers must write here first, then to the cache.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use indexer_types::Fid;

use crate::entities::TargetRow;

/// Inserts a target if absent. Returns `true` iff a new row was inserted —
/// callers (R1/R2 expansion) use this to decide whether to also enqueue a
/// backfill job, since `ON CONFLICT DO NOTHING` makes re-processing the same
/// event idempotent without a double-enqueue.
pub async fn insert_target(txn: &mut Transaction<'_, Postgres>, fid: Fid, is_root: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("insert into targets (fid, is_root) values ($1, $2) on conflict (fid) do nothing")
        .bind(fid.as_i64())
        .bind(is_root)
        .execute(&mut *txn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_target_client(pool: &PgPool, client_fid: Fid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("insert into target_clients (client_fid) values ($1) on conflict (client_fid) do nothing")
        .bind(client_fid.as_i64())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_last_synced_at(pool: &PgPool, fid: Fid) -> Result<(), sqlx::Error> {
    sqlx::query("update targets set last_synced_at = $2, updated_at = $2 where fid = $1")
        .bind(fid.as_i64())
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_root_target(pool: &PgPool, fid: Fid) -> Result<bool, sqlx::Error> {
    let row: Option<(bool,)> = sqlx::query_as("select is_root from targets where fid = $1")
        .bind(fid.as_i64())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(is_root,)| is_root).unwrap_or(false))
}

pub async fn is_client_target(pool: &PgPool, fid: Fid) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("select client_fid from target_clients where client_fid = $1")
        .bind(fid.as_i64())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Full table read, used by the boot sequence (J) to hydrate cache D.
pub async fn list_targets(pool: &PgPool) -> Result<Vec<TargetRow>, sqlx::Error> {
    sqlx::query_as::<_, TargetRow>("select fid, is_root, added_at, last_synced_at from targets").fetch_all(pool).await
}

pub async fn list_client_targets(pool: &PgPool) -> Result<Vec<Fid>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as("select client_fid from target_clients").fetch_all(pool).await?;
    Ok(rows.into_iter().filter_map(|(fid,)| Fid::new(fid).ok()).collect())
}
