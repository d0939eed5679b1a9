//! Component F: the backfill worker (spec.md §4.6). Each section pages
//! through A at `page_size=100` and upserts via C; ordering between
//! sections doesn't matter for correctness (every write is hash-keyed and
//! idempotent) but user-data goes first so profiles become visible quickly.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

use indexer_hub::{HubClient, MessageBody, MessageEndpoint};
use indexer_queue::{Job, QueueHandler};
use indexer_types::Fid;

use crate::factories;

#[derive(Debug, Deserialize)]
struct Payload {
    fid: Fid,
    #[serde(rename = "isRoot")]
    is_root: bool,
}

pub struct BackfillHandler {
    pub hub: Arc<HubClient>,
    pub db: PgPool,
}

#[async_trait]
impl QueueHandler for BackfillHandler {
    #[tracing::instrument(skip_all, fields(fid = tracing::field::Empty), err)]
    async fn handle(&self, job: Job) -> anyhow::Result<()> {
        let payload: Payload = serde_json::from_value(job.payload)?;
        tracing::Span::current().record("fid", payload.fid.as_i64());
        self.run(payload.fid, payload.is_root).await
    }
}

impl BackfillHandler {
    async fn run(&self, fid: Fid, is_root: bool) -> anyhow::Result<()> {
        let batch_size = indexer_db::upsert::default_batch_size();
        let retries = indexer_db::default_retries();
        let delay = indexer_db::default_base_delay();

        let user_data_msgs = self.hub.get_all_messages_by_fid(MessageEndpoint::UserData, fid).await?;
        let rows: Vec<_> = user_data_msgs.iter().filter_map(factories::user_data).collect();
        indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_user_data(&self.db, &rows, batch_size)).await?;

        let cast_msgs = self.hub.get_all_messages_by_fid(MessageEndpoint::Casts, fid).await?;
        let mut cast_rows = Vec::new();
        let mut remove_hashes = Vec::new();
        for msg in &cast_msgs {
            match &msg.body {
                MessageBody::CastAdd { .. } => {
                    if let Some(mut row) = factories::cast(msg) {
                        if let Some(parent_hash) = row.parent_hash.clone() {
                            row.root_parent_hash = None;
                            row.root_parent_fid = None;
                            if let Some((root_hash, root_fid)) = indexer_db::casts::resolve_root_parent(&self.db, &parent_hash).await? {
                                row.root_parent_hash = Some(root_hash);
                                row.root_parent_fid = Some(root_fid);
                            }
                        }
                        cast_rows.push(row);
                    }
                }
                MessageBody::CastRemove { .. } => {
                    if let Some(hash) = factories::cast_remove_target(msg) {
                        remove_hashes.push(hash);
                    }
                }
                _ => {}
            }
        }
        indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_casts(&self.db, &cast_rows, batch_size)).await?;
        for hash in &remove_hashes {
            indexer_db::safe_db_operation(retries, delay, || indexer_db::delete::delete_cast(&self.db, hash)).await?;
        }

        let reaction_msgs = self.hub.get_all_messages_by_fid(MessageEndpoint::Reactions, fid).await?;
        let rows: Vec<_> = reaction_msgs.iter().filter_map(factories::reaction).collect();
        indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_reactions(&self.db, &rows, batch_size)).await?;

        let link_msgs = self.hub.get_all_messages_by_fid(MessageEndpoint::Links, fid).await?;
        let rows: Vec<_> = link_msgs.iter().filter_map(factories::link).collect();
        indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_links(&self.db, &rows, batch_size)).await?;

        let verification_msgs = self.hub.get_all_messages_by_fid(MessageEndpoint::Verifications, fid).await?;
        let rows: Vec<_> = verification_msgs.iter().filter_map(factories::verification).collect();
        indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_verifications(&self.db, &rows, batch_size)).await?;

        let proofs = self.hub.username_proofs_by_fid(fid).await?;
        let rows: Vec<_> = proofs
            .into_iter()
            .map(|p| indexer_db::entities::NewUsernameProof {
                // The proofs endpoint's JSON shape carries no message hash
                // of its own (spec.md §6.1); the signature is unique per
                // proof, so it stands in as the row's primary key material.
                hash: indexer_types::MessageHash::from_bytes(p.signature.as_bytes()),
                fid: p.fid,
                name: p.name,
                owner: p.owner,
                signature: p.signature,
                timestamp: indexer_types::farcaster_time_to_utc(p.timestamp),
            })
            .collect();
        indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_username_proofs(&self.db, &rows, batch_size)).await?;

        if is_root {
            let events = self.hub.on_chain_events_by_fid(fid, None).await?;
            let rows: Vec<_> = events.iter().filter_map(factories::on_chain_event).collect();
            indexer_db::safe_db_operation(retries, delay, || indexer_db::upsert::insert_on_chain_events(&self.db, &rows, batch_size)).await?;
        }

        indexer_db::safe_db_operation(retries, delay, || indexer_db::targets::set_last_synced_at(&self.db, fid)).await?;
        Ok(())
    }
}
