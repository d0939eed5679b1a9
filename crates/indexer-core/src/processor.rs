//! Component H: event dispatch, relevance filtering, and dynamic target
//! expansion (spec.md §4.8). Dispatch is a `match` over the tagged
//! `HubEventBody`/`MessageBody` variants — no runtime type inspection, per
//! the redesign flag in spec.md §9 — following the dispatch-by-catalog-type
//! `match` shape in `agent/src/controllers/handler.rs`.

use std::sync::Arc;

use async_trait::async_trait;
use indexer_cache::{TargetCache, TargetSet};
use indexer_hub::{CastParent, HubEvent, HubEventBody, Message, MessageBody, OnChainEvent, ReactionTarget};
use indexer_queue::{Job, QueueHandler, RedisQueue};
use indexer_types::Fid;
use sqlx::PgPool;

use crate::factories;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("database error while processing event")]
    Db(#[from] sqlx::Error),
    #[error("cache error while processing event")]
    Cache(#[from] indexer_cache::CacheError),
    #[error("queue error while processing event")]
    Queue(#[from] indexer_queue::QueueError),
}

/// True iff `event` is worth enqueuing to `process-event` (spec.md §4.8
/// relevance filter), consulting cache D rather than the tables so the
/// check is a pure in-memory lookup in the realtime hot path.
pub async fn is_relevant(event: &HubEvent, cache: &dyn TargetCache) -> Result<bool, indexer_cache::CacheError> {
    match &event.body {
        HubEventBody::MergeMessage { message } => {
            if cache.contains(TargetSet::Targets, message.fid).await? {
                return Ok(true);
            }
            match &message.body {
                MessageBody::CastAdd { parent: Some(CastParent::Cast(cast_id)), .. } => {
                    cache.contains(TargetSet::Targets, cast_id.fid).await
                }
                MessageBody::ReactionAdd { target: ReactionTarget::Cast(cast_id), .. } => {
                    cache.contains(TargetSet::Targets, cast_id.fid).await
                }
                _ => Ok(false),
            }
        }
        HubEventBody::MergeOnChainEvent { event } => cache.contains(TargetSet::ClientTargets, event.fid).await,
        HubEventBody::PruneMessage | HubEventBody::RevokeMessage | HubEventBody::Unknown => Ok(false),
    }
}

/// Applies one hub event: base dispatch (insert/delete the matching row)
/// followed by the R1/R2 expansion rules when the event is an on-chain
/// signer event or a root's follow-add (spec.md §4.8). The triggering
/// upsert and each expansion rule run in their own separate transactions,
/// not one shared transaction — harmless since every write here is
/// `ON CONFLICT DO NOTHING` idempotent, so a crash between them just means
/// the next delivery of the same event retries whichever step didn't commit.
pub async fn process_event(pool: &PgPool, cache: &Arc<dyn TargetCache>, queue: &indexer_queue::RedisQueue, event: HubEvent) -> Result<(), ProcessError> {
    match event.body {
        HubEventBody::MergeMessage { message } => dispatch_message(pool, cache, queue, message).await,
        HubEventBody::MergeOnChainEvent { event } => {
            if let Some(row) = factories::on_chain_event(&event) {
                indexer_db::upsert::insert_on_chain_events(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            } else {
                tracing::debug!(fid = %event.fid, kind = event.type_, "on-chain event body missing for its declared type, skipping");
            }
            apply_expansion_rules(pool, cache, queue, &event).await
        }
        HubEventBody::PruneMessage | HubEventBody::RevokeMessage => Ok(()),
        HubEventBody::Unknown => {
            tracing::debug!(event_id = event.id, "unknown hub event type, ignoring");
            Ok(())
        }
    }
}

async fn dispatch_message(pool: &PgPool, cache: &Arc<dyn TargetCache>, queue: &RedisQueue, message: Message) -> Result<(), ProcessError> {
    match &message.body {
        MessageBody::CastAdd { .. } => {
            if let Some(mut row) = factories::cast(&message) {
                if let Some(parent_hash) = row.parent_hash.clone() {
                    if let Some((root_hash, root_fid)) = indexer_db::casts::resolve_root_parent(pool, &parent_hash).await? {
                        row.root_parent_hash = Some(root_hash);
                        row.root_parent_fid = Some(root_fid);
                    }
                }
                indexer_db::upsert::insert_casts(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            }
        }
        MessageBody::CastRemove { .. } => {
            if let Some(hash) = factories::cast_remove_target(&message) {
                indexer_db::delete::delete_cast(pool, &hash).await?;
            }
        }
        MessageBody::ReactionAdd { .. } => {
            if let Some(row) = factories::reaction(&message) {
                indexer_db::upsert::insert_reactions(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            }
        }
        MessageBody::ReactionRemove { reaction_type, target } => {
            let (target_hash, target_url) = match target {
                ReactionTarget::Cast(cast_id) => (Some(&cast_id.hash), None),
                ReactionTarget::Url { target_url } => (None, Some(target_url.as_str())),
            };
            indexer_db::delete::delete_reaction(pool, message.fid, *reaction_type, target_hash, target_url).await?;
        }
        MessageBody::LinkAdd { target_fid, .. } => {
            let target_fid = *target_fid;
            if let Some(row) = factories::link(&message) {
                indexer_db::upsert::insert_links(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            }
            // R1: a root target's follow-add may pull a new fid into scope.
            apply_root_follow_expansion(pool, cache, queue, message.fid, target_fid).await?;
        }
        MessageBody::LinkRemove { link_type, target_fid } => {
            indexer_db::delete::delete_link(pool, message.fid, *target_fid, *link_type).await?;
        }
        MessageBody::VerificationAddEthAddress { .. } => {
            if let Some(row) = factories::verification(&message) {
                indexer_db::upsert::insert_verifications(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            }
        }
        MessageBody::VerificationRemove { address } => {
            indexer_db::delete::delete_verification(pool, message.fid, address).await?;
        }
        MessageBody::UserDataAdd { .. } => {
            if let Some(row) = factories::user_data(&message) {
                indexer_db::upsert::insert_user_data(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            }
        }
        MessageBody::UsernameProof { .. } => {
            if let Some(row) = factories::username_proof(&message) {
                indexer_db::upsert::insert_username_proofs(pool, &[row], indexer_db::upsert::default_batch_size()).await?;
            }
        }
        MessageBody::Unknown => {
            tracing::debug!(fid = %message.fid, "unknown message type, ignoring");
        }
    }
    Ok(())
}

async fn apply_expansion_rules(pool: &PgPool, cache: &Arc<dyn TargetCache>, queue: &indexer_queue::RedisQueue, event: &OnChainEvent) -> Result<(), ProcessError> {
    let Some(signer_add_fid) = signer_add_payload_fid(event) else {
        return Ok(());
    };

    // R2 only fires for client-signer events: `event.fid` (the on-chain
    // issuer) must itself be a monitored client target.
    if !indexer_db::targets::is_client_target(pool, event.fid).await? {
        return Ok(());
    }
    if indexer_db::targets::is_root_target(pool, signer_add_fid).await.unwrap_or(false) {
        return Ok(());
    }

    let mut txn = pool.begin().await?;
    let inserted = indexer_db::targets::insert_target(&mut txn, signer_add_fid, true).await?;
    txn.commit().await?;

    if inserted {
        cache.add(TargetSet::Targets, signer_add_fid).await?;
        enqueue_backfill(queue, signer_add_fid, true).await?;
    }
    Ok(())
}

/// R1 — root-follow expansion: called by the processor when dispatching a
/// `LINK_ADD` of type `follow` whose author is a root target.
pub async fn apply_root_follow_expansion(pool: &PgPool, cache: &Arc<dyn TargetCache>, queue: &indexer_queue::RedisQueue, fid: Fid, target_fid: Fid) -> Result<(), ProcessError> {
    if !indexer_db::targets::is_root_target(pool, fid).await? {
        return Ok(());
    }

    let mut txn = pool.begin().await?;
    let inserted = indexer_db::targets::insert_target(&mut txn, target_fid, false).await?;
    txn.commit().await?;

    if inserted {
        cache.add(TargetSet::Targets, target_fid).await?;
        enqueue_backfill(queue, target_fid, false).await?;
    }
    Ok(())
}

async fn enqueue_backfill(queue: &indexer_queue::RedisQueue, fid: Fid, is_root: bool) -> Result<(), ProcessError> {
    let id = format!("backfill-{}-{}", fid.as_i64(), uuid_like_suffix());
    let dedup_key = indexer_queue::config::backfill_dedup_key(fid.as_i64());
    let payload = serde_json::json!({ "fid": fid, "isRoot": is_root });
    let now = now_ms();
    queue.enqueue(&id, &payload, now, indexer_queue::Priority::Default, Some(&dedup_key)).await?;
    Ok(())
}

/// Drains the `process-event` queue (concurrency 10, spec.md §6.3) —
/// everything already sitting in the queue was already judged relevant by
/// the realtime worker, so this handler just decodes and dispatches.
pub struct ProcessEventHandler {
    pub db: PgPool,
    pub cache: Arc<dyn TargetCache>,
    pub queue: Arc<RedisQueue>,
}

#[async_trait]
impl QueueHandler for ProcessEventHandler {
    #[tracing::instrument(skip_all, fields(event_id = tracing::field::Empty), err)]
    async fn handle(&self, job: Job) -> anyhow::Result<()> {
        let event = decode_queued_event(job.payload)?;
        tracing::Span::current().record("event_id", event.id);
        process_event(&self.db, &self.cache, &self.queue, event).await?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

/// A short per-call-site unique suffix, since Redis job ids need not be
/// globally unique — only unique within a queue's current live set, which
/// the dedup key already guarantees semantically.
fn uuid_like_suffix() -> String {
    format!("{:x}", rand::random::<u64>())
}

/// Re-encodes a relevant event into the hub's own wire shape so it can ride
/// through the `process-event` queue as plain JSON and come back out through
/// `HubEvent`'s existing `Deserialize` impl unchanged — no second wire format
/// to keep in sync with the hub's.
pub fn encode_for_queue(event: &HubEvent) -> serde_json::Value {
    match &event.body {
        HubEventBody::MergeMessage { message } => serde_json::json!({
            "id": event.id,
            "type": "HUB_EVENT_TYPE_MERGE_MESSAGE",
            "mergeMessageBody": { "message": encode_message(message) },
        }),
        HubEventBody::MergeOnChainEvent { event: on_chain } => serde_json::json!({
            "id": event.id,
            "type": "HUB_EVENT_TYPE_MERGE_ON_CHAIN_EVENT",
            "mergeOnChainEventBody": { "onChainEvent": on_chain },
        }),
        HubEventBody::PruneMessage => serde_json::json!({ "id": event.id, "type": "HUB_EVENT_TYPE_PRUNE_MESSAGE" }),
        HubEventBody::RevokeMessage => serde_json::json!({ "id": event.id, "type": "HUB_EVENT_TYPE_REVOKE_MESSAGE" }),
        HubEventBody::Unknown => serde_json::json!({ "id": event.id, "type": "HUB_EVENT_TYPE_UNKNOWN" }),
    }
}

pub fn decode_queued_event(value: serde_json::Value) -> Result<HubEvent, serde_json::Error> {
    serde_json::from_value(value)
}

fn encode_message(message: &Message) -> serde_json::Value {
    let mut data = serde_json::json!({ "fid": message.fid, "timestamp": message.timestamp });
    let obj = data.as_object_mut().expect("object literal");
    match &message.body {
        MessageBody::CastAdd { text, embeds, mentions, mentions_positions, parent } => {
            obj.insert("type".into(), "MESSAGE_TYPE_CAST_ADD".into());
            let mut body = serde_json::json!({
                "text": text, "embeds": embeds, "mentions": mentions, "mentionsPositions": mentions_positions,
            });
            match parent {
                Some(CastParent::Cast(cast_id)) => body["parentCastId"] = serde_json::to_value(cast_id).unwrap(),
                Some(CastParent::Url { parent_url }) => body["parentUrl"] = serde_json::Value::String(parent_url.clone()),
                None => {}
            }
            obj.insert("castAddBody".into(), body);
        }
        MessageBody::CastRemove { target_hash } => {
            obj.insert("type".into(), "MESSAGE_TYPE_CAST_REMOVE".into());
            obj.insert("castRemoveBody".into(), serde_json::json!({ "targetHash": target_hash }));
        }
        MessageBody::ReactionAdd { reaction_type, target } => {
            obj.insert("type".into(), "MESSAGE_TYPE_REACTION_ADD".into());
            obj.insert("reactionBody".into(), encode_reaction_body(*reaction_type, target));
        }
        MessageBody::ReactionRemove { reaction_type, target } => {
            obj.insert("type".into(), "MESSAGE_TYPE_REACTION_REMOVE".into());
            obj.insert("reactionBody".into(), encode_reaction_body(*reaction_type, target));
        }
        MessageBody::LinkAdd { link_type, target_fid } => {
            obj.insert("type".into(), "MESSAGE_TYPE_LINK_ADD".into());
            obj.insert("linkBody".into(), serde_json::json!({ "type": link_type.as_str(), "targetFid": target_fid }));
        }
        MessageBody::LinkRemove { link_type, target_fid } => {
            obj.insert("type".into(), "MESSAGE_TYPE_LINK_REMOVE".into());
            obj.insert("linkBody".into(), serde_json::json!({ "type": link_type.as_str(), "targetFid": target_fid }));
        }
        MessageBody::VerificationAddEthAddress { address, block_hash } => {
            obj.insert("type".into(), "MESSAGE_TYPE_VERIFICATION_ADD_ETH_ADDRESS".into());
            obj.insert("verificationAddAddressBody".into(), serde_json::json!({ "address": address, "blockHash": block_hash }));
        }
        MessageBody::VerificationRemove { address } => {
            obj.insert("type".into(), "MESSAGE_TYPE_VERIFICATION_REMOVE".into());
            obj.insert("verificationRemoveBody".into(), serde_json::json!({ "address": address }));
        }
        MessageBody::UserDataAdd { data_type, value } => {
            obj.insert("type".into(), "MESSAGE_TYPE_USER_DATA_ADD".into());
            obj.insert("userDataBody".into(), serde_json::json!({ "type": data_type.as_str(), "value": value }));
        }
        MessageBody::UsernameProof { name, owner, signature } => {
            obj.insert("type".into(), "MESSAGE_TYPE_USERNAME_PROOF".into());
            obj.insert(
                "usernameProofBody".into(),
                serde_json::json!({ "name": name, "owner": owner, "signature": signature }),
            );
        }
        MessageBody::Unknown => {
            obj.insert("type".into(), "MESSAGE_TYPE_UNKNOWN_FUTURE_VALUE".into());
        }
    }
    serde_json::json!({ "data": data, "hash": message.hash })
}

fn encode_reaction_body(reaction_type: indexer_types::ReactionType, target: &ReactionTarget) -> serde_json::Value {
    let mut body = serde_json::json!({ "type": reaction_type.as_str() });
    match target {
        ReactionTarget::Cast(cast_id) => body["targetCastId"] = serde_json::to_value(cast_id).unwrap(),
        ReactionTarget::Url { target_url } => body["targetUrl"] = serde_json::Value::String(target_url.clone()),
    }
    body
}

fn signer_add_payload_fid(event: &OnChainEvent) -> Option<Fid> {
    if event.type_ != "EVENT_TYPE_SIGNER" {
        return None;
    }
    let body = event.signer_event_body.as_ref()?;
    if body.get("eventType")?.as_str()? != "SIGNER_EVENT_TYPE_ADD" {
        return None;
    }
    let fid_value = body.get("fid")?;
    let fid_num = fid_value.as_i64().or_else(|| fid_value.as_str().and_then(|s| s.parse().ok()))?;
    Fid::new(fid_num).ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use indexer_cache::FakeTargetCache;
    use indexer_hub::wire::CastId;
    use indexer_types::MessageHash;

    fn cast_add_event(fid: i64, parent_fid: Option<i64>) -> HubEvent {
        HubEvent {
            id: 1,
            body: HubEventBody::MergeMessage {
                message: Message {
                    hash: MessageHash::from_hex(&"aa".repeat(32)).unwrap(),
                    fid: Fid::new(fid).unwrap(),
                    timestamp: 0,
                    body: MessageBody::CastAdd {
                        text: "hi".into(),
                        embeds: vec![],
                        mentions: vec![],
                        mentions_positions: vec![],
                        parent: parent_fid.map(|f| CastParent::Cast(CastId { fid: Fid::new(f).unwrap(), hash: MessageHash::from_hex(&"bb".repeat(32)).unwrap() })),
                    },
                },
            },
        }
    }

    #[tokio::test]
    async fn relevant_when_author_is_a_target() {
        let cache: std::sync::Arc<dyn TargetCache> = std::sync::Arc::new(FakeTargetCache::default());
        cache.add(TargetSet::Targets, Fid::new(5).unwrap()).await.unwrap();
        let event = cast_add_event(5, None);
        assert!(is_relevant(&event, &*cache).await.unwrap());
    }

    #[tokio::test]
    async fn relevant_when_reply_targets_a_target() {
        let cache: std::sync::Arc<dyn TargetCache> = std::sync::Arc::new(FakeTargetCache::default());
        cache.add(TargetSet::Targets, Fid::new(9).unwrap()).await.unwrap();
        let event = cast_add_event(1, Some(9));
        assert!(is_relevant(&event, &*cache).await.unwrap());
    }

    #[tokio::test]
    async fn irrelevant_when_nobody_involved_is_a_target() {
        let cache: std::sync::Arc<dyn TargetCache> = std::sync::Arc::new(FakeTargetCache::default());
        let event = cast_add_event(1, Some(9));
        assert!(!is_relevant(&event, &*cache).await.unwrap());
    }

    #[test]
    fn queue_round_trip_preserves_cast_add() {
        let event = cast_add_event(5, Some(9));
        let encoded = encode_for_queue(&event);
        let decoded = decode_queued_event(encoded).unwrap();
        assert_eq!(decoded.id, event.id);
        match decoded.body {
            HubEventBody::MergeMessage { message } => {
                assert_eq!(message.fid, Fid::new(5).unwrap());
                assert!(matches!(message.body, MessageBody::CastAdd { parent: Some(CastParent::Cast(_)), .. }));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn signer_add_extracts_payload_fid() {
        let event = OnChainEvent {
            type_: "EVENT_TYPE_SIGNER".into(),
            chain_id: 10,
            block_number: 1,
            block_hash: "0x0".into(),
            block_timestamp: 0,
            transaction_hash: "0x0".into(),
            log_index: 0,
            fid: Fid::new(1).unwrap(),
            signer_event_body: Some(serde_json::json!({"eventType": "SIGNER_EVENT_TYPE_ADD", "fid": 77})),
            id_register_event_body: None,
            key_register_event_body: None,
            storage_rent_event_body: None,
        };
        assert_eq!(signer_add_payload_fid(&event), Some(Fid::new(77).unwrap()));
    }
}
