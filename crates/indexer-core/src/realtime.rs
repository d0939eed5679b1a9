//! Component G: the realtime worker (spec.md §4.7). A single recurring job
//! rather than a claim from a Redis queue proper — concurrency=1 by
//! construction (one `tokio::spawn`'d loop, not a pool of dequeuers), which
//! guarantees non-overlap even if an iteration runs long, so this loop is
//! time-driven, not queue-driven.
//!
//! Loop shape grounded on `agent::handlers::serve`'s `tokio::select!`-over-
//! exit-future idiom, simplified to the single recurring job case (no
//! LISTEN/NOTIFY — the schedule is entirely time-driven per spec.md §4.5).

use std::sync::Arc;
use std::time::Duration;

use indexer_cache::TargetCache;
use indexer_hub::HubClient;
use indexer_queue::{Priority, RedisQueue};
use sqlx::PgPool;

use crate::processor;

const PAGE_SIZE: u32 = 100;

pub async fn run_realtime_worker(hub: Arc<HubClient>, db: PgPool, cache: Arc<dyn TargetCache>, process_event_queue: Arc<RedisQueue>, interval: Duration, shutdown: impl std::future::Future<Output = ()>) {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = &mut shutdown => break,
        }
        if let Err(err) = run_once(&hub, &db, &cache, &process_event_queue).await {
            tracing::error!(?err, "realtime worker iteration failed, will retry next tick");
        }
    }
    tracing::info!("realtime worker signaled to stop");
}

async fn run_once(hub: &HubClient, db: &PgPool, cache: &Arc<dyn TargetCache>, process_event_queue: &RedisQueue) -> anyhow::Result<()> {
    let cursor = indexer_db::sync_state::get_cursor(db, indexer_db::sync_state::REALTIME_SYNC).await?.unwrap_or(0);
    let events = hub.events(cursor.max(0) as u64, PAGE_SIZE).await?;
    if events.is_empty() {
        return Ok(());
    }

    // Ids arrive in strictly increasing order (spec.md §4.7); the cursor
    // advances to the page's maximum, not simply the last element's id, in
    // case a future hub response is ever out of order.
    let mut max_id = cursor;
    for event in &events {
        max_id = max_id.max(event.id as i64);
        if processor::is_relevant(event, &**cache).await? {
            enqueue_process_event(process_event_queue, event).await?;
        }
    }

    // Enqueue-then-advance (not the reverse): if the process crashes
    // between the two, the next tick re-reads the same page and
    // re-enqueues — safe because `process-event` handlers are idempotent
    // (every write is hash-keyed), per the crash note in spec.md §4.7 step 5.
    // The cursor write itself goes through `with_transaction`; it can't also
    // cover the Redis enqueue above since that's a different store.
    indexer_db::with_transaction(db, |txn| Box::pin(async move { indexer_db::sync_state::advance_cursor(txn, indexer_db::sync_state::REALTIME_SYNC, max_id).await }))
        .await?;

    Ok(())
}

async fn enqueue_process_event(queue: &RedisQueue, event: &indexer_hub::HubEvent) -> anyhow::Result<()> {
    let payload = processor::encode_for_queue(event);
    let id = format!("process-event-{}", event.id);
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)?.as_millis() as i64;
    queue.enqueue(&id, &payload, now, Priority::High, None).await?;
    Ok(())
}
