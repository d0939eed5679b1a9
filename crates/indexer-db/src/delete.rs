//! Remove-event handlers (spec.md §4.8). A link-remove's delete can race a
//! reordered link-add under `process-event`'s concurrency=10 (spec.md §5);
//! these return the number of rows removed (0 or 1) so callers can log a
//! zombie-row miss without treating it as an error.

use sqlx::PgPool;

use indexer_types::{Fid, LinkType, MessageHash, ReactionType};

pub async fn delete_cast(pool: &PgPool, hash: &MessageHash) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("delete from casts where hash = $1").bind(hash.as_str()).execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn delete_reaction(
    pool: &PgPool,
    fid: Fid,
    reaction_type: ReactionType,
    target_hash: Option<&MessageHash>,
    target_url: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "delete from reactions where fid = $1 and type = $2 and target_hash is not distinct from $3 and target_url is not distinct from $4",
    )
    .bind(fid.as_i64())
    .bind(reaction_type.as_str())
    .bind(target_hash.map(|h| h.as_str()))
    .bind(target_url)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_link(pool: &PgPool, fid: Fid, target_fid: Fid, link_type: LinkType) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("delete from links where fid = $1 and target_fid = $2 and type = $3")
        .bind(fid.as_i64())
        .bind(target_fid.as_i64())
        .bind(link_type.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_verification(pool: &PgPool, fid: Fid, address: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("delete from verifications where fid = $1 and address = $2")
        .bind(fid.as_i64())
        .bind(address)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
