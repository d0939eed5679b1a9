use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::job::Job;
use crate::queue::RedisQueue;

#[async_trait]
pub trait QueueHandler: Send + Sync {
    async fn handle(&self, job: Job) -> anyhow::Result<()>;
}

fn now_ms() -> i64 {
    // Workflow scripts in this crate family avoid wall-clock calls at
    // authoring time, but this is runtime code, not a workflow script.
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

/// Default bound on how long graceful shutdown waits for in-flight jobs to
/// finish before giving up on them (spec.md §5).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one queue until `shutdown` resolves: claims due jobs up to the
/// queue's configured concurrency, dispatches each to `handler` on its own
/// task, and acks/retries/dead-letters based on the result.
///
/// Grounded on `automations::server::serve`'s semaphore-bounded dequeue loop
/// (jittered sleep between empty polls) combined with `agent::handlers::serve`'s
/// `tokio::select!`-over-exit-future shutdown idiom.
pub async fn run_worker(queue: Arc<RedisQueue>, handler: Arc<dyn QueueHandler>, dequeue_interval: Duration, shutdown: impl std::future::Future<Output = ()>) {
    run_worker_with_shutdown_timeout(queue, handler, dequeue_interval, DEFAULT_SHUTDOWN_TIMEOUT, shutdown).await
}

pub async fn run_worker_with_shutdown_timeout(
    queue: Arc<RedisQueue>,
    handler: Arc<dyn QueueHandler>,
    dequeue_interval: Duration,
    shutdown_timeout: Duration,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let concurrency = queue.config().concurrency.max(1);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
    let lease = queue.config().lease;
    let name = queue.config().name;

    tokio::pin!(shutdown);

    loop {
        if let Err(err) = queue.reclaim_expired(now_ms()).await {
            tracing::warn!(queue = name, ?err, "failed to reclaim expired leases");
        }

        let available = semaphore.available_permits() as u32;
        if available == 0 {
            tokio::select! {
                () = tokio::time::sleep(dequeue_interval) => continue,
                () = &mut shutdown => break,
            }
        }

        let jobs = match queue.claim(available, now_ms(), lease).await {
            Ok(jobs) => jobs,
            Err(err) => {
                tracing::error!(queue = name, ?err, "failed to poll for jobs (will retry)");
                Vec::new()
            }
        };

        if jobs.is_empty() {
            let jitter = 0.9 + rand::random::<f64>() * 0.2;
            tokio::select! {
                () = tokio::time::sleep(dequeue_interval.mul_f64(jitter)) => (),
                () = &mut shutdown => break,
            }
            continue;
        }

        for job in jobs {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let queue = queue.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let job_id = job.id.clone();
                match handler.handle(job.clone()).await {
                    Ok(()) => {
                        if let Err(err) = queue.ack(&job).await {
                            tracing::error!(queue = queue.config().name, job_id, ?err, "failed to ack completed job");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(queue = queue.config().name, job_id, ?err, "job handler failed, will retry within attempt budget");
                        if let Err(err) = queue.fail(&job, now_ms()).await {
                            tracing::error!(queue = queue.config().name, job_id, ?err, "failed to record job failure");
                        }
                    }
                }
            });
        }
    }

    tracing::info!(queue = name, "queue worker signaled to stop, awaiting in-flight jobs");
    match tokio::time::timeout(shutdown_timeout, semaphore.acquire_many(concurrency as u32)).await {
        Ok(_) => tracing::info!(queue = name, "all in-flight jobs finished"),
        Err(_) => tracing::warn!(
            queue = name,
            timeout_secs = shutdown_timeout.as_secs(),
            "shutdown timeout elapsed with jobs still in flight, abandoning them"
        ),
    }
}
