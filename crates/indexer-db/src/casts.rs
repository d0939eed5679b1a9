//! Thread-root resolution for `casts.root_parent_hash`/`root_parent_fid`
//! (SPEC_FULL.md §3): a one-hop walk of `parent_hash`, not a full recursive
//! walk up the thread — cheap at ingest time since the immediate parent, if
//! locally known, already carries its own resolved root (or is the root
//! itself, if it has no parent of its own).

use sqlx::PgPool;

use indexer_types::{Fid, MessageHash};

/// Looks up `parent_hash`'s own row and returns the thread root implied by
/// it: its already-resolved root if it has one, otherwise the parent itself
/// (it has no parent of its own, so it's the closest known root). `None`
/// when the parent isn't locally known yet.
pub async fn resolve_root_parent(pool: &PgPool, parent_hash: &MessageHash) -> Result<Option<(MessageHash, Fid)>, sqlx::Error> {
    let row: Option<(Option<String>, Option<i64>, String, i64)> =
        sqlx::query_as("select root_parent_hash, root_parent_fid, hash, fid from casts where hash = $1")
            .bind(parent_hash.as_str())
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(root_hash, root_fid, hash, fid)| match (root_hash, root_fid) {
        (Some(h), Some(f)) => Some((MessageHash::from_hex(&h).ok()?, Fid::new(f).ok()?)),
        _ => Some((MessageHash::from_hex(&hash).ok()?, Fid::new(fid).ok()?)),
    }))
}
