//! Component J: boot sequence and lifecycle (spec.md §4.9).
//!
//! Grounded on `agent/src/main.rs::async_main`'s construct-everything-before-
//! serving shape: connect stores, hydrate in-memory state, wire up workers,
//! then `tokio::try_join!` them all against one shared shutdown future.

use std::sync::Arc;

use anyhow::Context;
use indexer_cache::{RedisTargetCache, TargetCache, TargetSet};
use indexer_hub::HubClient;
use indexer_queue::QueueHandles;
use indexer_types::Fid;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Settings;

/// Everything a worker needs, constructed once at boot and shared by
/// reference/`Arc` rather than threaded through as loose arguments or
/// reached via a global — the redesign flag in spec.md §9.
pub struct Runtime {
    pub db: PgPool,
    pub cache: Arc<dyn TargetCache>,
    pub hub: Arc<HubClient>,
    pub queues: QueueHandles,
}

impl Runtime {
    pub async fn boot(settings: &Settings) -> anyhow::Result<Self> {
        let db = indexer_db::connect(&settings.postgres_connection_string, settings.db_environment, "indexer-core")
            .await
            .context("connecting to postgres")?;
        indexer_db::migrate(&db).await.context("running migrations")?;

        let redis_client = RedisClient::open(settings.redis_url.as_str()).context("parsing redis url")?;
        let conn = redis_client.get_connection_manager().await.context("connecting to redis")?;
        let cache: Arc<dyn TargetCache> = Arc::new(RedisTargetCache::connect(&settings.redis_url).await.context("connecting target cache")?);
        let queues = QueueHandles::new(conn);

        seed_configured_targets(&db, &settings.strategy).await.context("seeding configured targets")?;
        hydrate_cache(&db, &cache).await.context("hydrating target cache")?;

        let hub = Arc::new(HubClient::new(settings.hub_endpoints.clone(), reqwest::Client::new())?);

        Ok(Self { db, cache, hub, queues })
    }
}

/// Inserts the operator-configured root targets/target clients (spec.md
/// §4.9 step 1) so they exist before the cache is hydrated from the tables.
async fn seed_configured_targets(db: &PgPool, strategy: &crate::config::Strategy) -> Result<(), sqlx::Error> {
    for &fid in &strategy.root_targets {
        let mut txn = db.begin().await?;
        indexer_db::targets::insert_target(&mut txn, fid, true).await?;
        txn.commit().await?;
    }
    if strategy.enable_client_discovery {
        for &fid in &strategy.target_clients {
            indexer_db::targets::insert_target_client(db, fid).await?;
        }
    }
    Ok(())
}

async fn hydrate_cache(db: &PgPool, cache: &Arc<dyn TargetCache>) -> Result<(), anyhow::Error> {
    let targets = indexer_db::targets::list_targets(db).await?;
    let fids: Vec<Fid> = targets.into_iter().filter_map(|row| Fid::new(row.fid).ok()).collect();
    cache.hydrate(TargetSet::Targets, &fids).await?;

    let client_targets = indexer_db::targets::list_client_targets(db).await?;
    cache.hydrate(TargetSet::ClientTargets, &client_targets).await?;

    tracing::info!(targets = fids.len(), client_targets = client_targets.len(), "hydrated target cache from tables");
    Ok(())
}

/// Enqueues one backfill job per currently-known target (spec.md §4.9 step
/// 4), so a fresh deployment with pre-seeded root targets actually starts
/// fetching instead of waiting for an R1/R2 expansion event to trigger it.
pub async fn enqueue_initial_backfills(db: &PgPool, queue: &indexer_queue::RedisQueue) -> anyhow::Result<()> {
    let targets = indexer_db::targets::list_targets(db).await?;
    for target in targets {
        let dedup_key = indexer_queue::config::backfill_dedup_key(target.fid);
        let payload = serde_json::json!({ "fid": target.fid, "isRoot": target.is_root });
        let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)?.as_millis() as i64;
        queue.enqueue(&format!("backfill-{}-boot", target.fid), &payload, now, indexer_queue::Priority::Default, Some(&dedup_key)).await?;
    }
    Ok(())
}

/// Resolves once either signal arrives. Grounded on `flow_worker`'s
/// `sigterm`/`sigint` `tokio::select!` and `agent`'s `ctrl_c`-only variant,
/// combined since this process has no parent-death hook to also watch.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(?err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
