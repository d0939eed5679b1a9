use std::sync::Arc;

use clap::Parser;
use futures::FutureExt;
use indexer_core::config::{Args, Settings};
use indexer_core::{backfill, processor, realtime, runtime};
use indexer_queue::run_worker;

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    let settings = Settings::from_args(&args)?;

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let task = rt.spawn(async_main(settings));
    let result = rt.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    rt.shutdown_timeout(std::time::Duration::from_secs(10));
    result?
}

async fn async_main(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(hubs = settings.hub_endpoints.len(), "booting indexer");
    let runtime::Runtime { db, cache, hub, queues } = runtime::Runtime::boot(&settings).await?;

    runtime::enqueue_initial_backfills(&db, &queues.backfill).await?;

    // Shared future that resolves once, so every long-running task can
    // `.clone()` it into its own `select!` without racing to consume the
    // underlying signal (grounded on `agent/src/main.rs`'s `shared()` ctrl_c).
    let shutdown = runtime::shutdown_signal().shared();

    let backfill_handler: Arc<dyn indexer_queue::QueueHandler> = Arc::new(backfill::BackfillHandler { hub: hub.clone(), db: db.clone() });
    let backfill_worker = run_worker(queues.backfill.clone(), backfill_handler, std::time::Duration::from_secs(2), shutdown.clone());

    let process_event_handler: Arc<dyn indexer_queue::QueueHandler> =
        Arc::new(processor::ProcessEventHandler { db: db.clone(), cache: cache.clone(), queue: queues.process_event.clone() });
    let process_event_worker = run_worker(queues.process_event.clone(), process_event_handler, std::time::Duration::from_millis(500), shutdown.clone());

    let realtime_worker = realtime::run_realtime_worker(hub.clone(), db.clone(), cache.clone(), queues.process_event.clone(), settings.realtime_poll_interval, shutdown.clone());

    tokio::join!(backfill_worker, process_event_worker, realtime_worker);
    tracing::info!("all workers stopped, exiting");
    Ok(())
}
