//! Idempotent writers for Component C (spec.md §4.3). Every hash-keyed
//! insert is `ON CONFLICT (hash) DO NOTHING` so repeated delivery (realtime
//! re-enqueue after a crash, backfill restart) is a no-op, per invariant 1.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::entities::{NewCast, NewLink, NewOnChainEvent, NewReaction, NewUserData, NewUsernameProof, NewVerification};

const DEFAULT_BATCH_SIZE: usize = 1000;

pub async fn insert_casts(pool: &PgPool, rows: &[NewCast], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "insert into casts (hash, fid, text, parent_hash, parent_fid, parent_url, root_parent_hash, root_parent_fid, \"timestamp\", embeds, mentions, mentions_positions) ",
        );
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.hash.as_str())
                .push_bind(row.fid.as_i64())
                .push_bind(&row.text)
                .push_bind(row.parent_hash.as_ref().map(|h| h.as_str()))
                .push_bind(row.parent_fid.map(|f| f.as_i64()))
                .push_bind(&row.parent_url)
                .push_bind(row.root_parent_hash.as_ref().map(|h| h.as_str()))
                .push_bind(row.root_parent_fid.map(|f| f.as_i64()))
                .push_bind(row.timestamp)
                .push_bind(&row.embeds)
                .push_bind(&row.mentions)
                .push_bind(&row.mentions_positions);
        });
        qb.push(" on conflict (hash) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub async fn insert_reactions(pool: &PgPool, rows: &[NewReaction], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("insert into reactions (hash, fid, type, target_hash, target_fid, target_url, \"timestamp\") ");
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.hash.as_str())
                .push_bind(row.fid.as_i64())
                .push_bind(row.reaction_type.as_str())
                .push_bind(row.target_hash.as_ref().map(|h| h.as_str()))
                .push_bind(row.target_fid.map(|f| f.as_i64()))
                .push_bind(&row.target_url)
                .push_bind(row.timestamp);
        });
        qb.push(" on conflict (hash) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub async fn insert_links(pool: &PgPool, rows: &[NewLink], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("insert into links (hash, fid, target_fid, type, \"timestamp\") ");
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.hash.as_str())
                .push_bind(row.fid.as_i64())
                .push_bind(row.target_fid.as_i64())
                .push_bind(row.link_type.as_str())
                .push_bind(row.timestamp);
        });
        qb.push(" on conflict (hash) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub async fn insert_verifications(pool: &PgPool, rows: &[NewVerification], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("insert into verifications (hash, fid, address, protocol, block_hash, \"timestamp\") ");
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.hash.as_str())
                .push_bind(row.fid.as_i64())
                .push_bind(&row.address)
                .push_bind(row.protocol.as_str())
                .push_bind(&row.block_hash)
                .push_bind(row.timestamp);
        });
        qb.push(" on conflict (hash) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub async fn insert_user_data(pool: &PgPool, rows: &[NewUserData], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("insert into user_data (hash, fid, type, value, \"timestamp\") ");
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.hash.as_str())
                .push_bind(row.fid.as_i64())
                .push_bind(row.data_type.as_str())
                .push_bind(&row.value)
                .push_bind(row.timestamp);
        });
        qb.push(" on conflict (hash) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub async fn insert_username_proofs(pool: &PgPool, rows: &[NewUsernameProof], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("insert into username_proofs (hash, fid, name, owner, signature, \"timestamp\") ");
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(row.hash.as_str())
                .push_bind(row.fid.as_i64())
                .push_bind(&row.name)
                .push_bind(&row.owner)
                .push_bind(&row.signature)
                .push_bind(row.timestamp);
        });
        qb.push(" on conflict (hash) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub async fn insert_on_chain_events(pool: &PgPool, rows: &[NewOnChainEvent], batch_size: usize) -> Result<u64, sqlx::Error> {
    let batch_size = batch_size.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(batch_size) {
        if chunk.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "insert into on_chain_events (type, chain_id, block_number, block_hash, block_timestamp, transaction_hash, log_index, fid, \
             signer_event_body, id_registry_event_body, key_registry_event_body, storage_rent_event_body) ",
        );
        qb.push_values(chunk, |mut b, row| {
            use indexer_types::OnChainEventType as K;
            b.push_bind(row.kind.as_str())
                .push_bind(row.chain_id)
                .push_bind(row.block_number)
                .push_bind(&row.block_hash)
                .push_bind(row.block_timestamp)
                .push_bind(&row.transaction_hash)
                .push_bind(row.log_index)
                .push_bind(row.fid.as_i64())
                .push_bind(matches!(row.kind, K::Signer | K::SignerMigrated).then(|| row.body.clone()))
                .push_bind(matches!(row.kind, K::IdRegistry).then(|| row.body.clone()))
                .push_bind(matches!(row.kind, K::KeyRegistry).then(|| row.body.clone()))
                .push_bind(matches!(row.kind, K::StorageRent).then(|| row.body.clone()));
        });
        qb.push(" on conflict (transaction_hash, log_index) do nothing");
        let result = qb.build().execute(pool).await?;
        affected += result.rows_affected();
    }
    Ok(affected)
}

pub fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
