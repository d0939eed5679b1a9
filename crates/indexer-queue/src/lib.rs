//! Component E: the three named job queues (spec.md §4.5), backed by Redis.
//!
//! Grounded on `automations::server`'s semaphore-bounded dequeue loop and
//! `agent::handlers`'s `serve`/shutdown idiom, adapted from a
//! `FOR UPDATE SKIP LOCKED` Postgres claim to a Redis `EVAL` script claim.

pub mod config;
mod error;
mod job;
mod queue;
mod stats;
mod worker;

pub use config::{Priority, QueueConfig, BACKFILL, PROCESS_EVENT};
pub use error::QueueError;
pub use job::Job;
pub use queue::RedisQueue;
pub use stats::QueueStats;
pub use worker::{run_worker, run_worker_with_shutdown_timeout, QueueHandler, DEFAULT_SHUTDOWN_TIMEOUT};

use redis::aio::ConnectionManager;

/// The two ad hoc job queues, constructed once at boot (component J) and
/// shared by the workers that claim from them. The realtime worker isn't a
/// queue consumer — it's a single time-driven poll loop (`indexer_core::
/// realtime`) — so it has no entry here.
pub struct QueueHandles {
    pub backfill: std::sync::Arc<RedisQueue>,
    pub process_event: std::sync::Arc<RedisQueue>,
}

impl QueueHandles {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            backfill: std::sync::Arc::new(RedisQueue::new(conn.clone(), BACKFILL)),
            process_event: std::sync::Arc::new(RedisQueue::new(conn, PROCESS_EVENT)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn high_priority_sorts_ahead_of_default_within_lease_window() {
        // The priority bias (60s) must exceed any queue's lease (<=60s) so a
        // ready high-priority job is never starved behind a just-claimed
        // default-priority one still inside its lease.
        assert!(Priority::High.score_bias_ms().unsigned_abs() as u128 >= BACKFILL.lease.as_millis());
        assert!(Priority::High.score_bias_ms().unsigned_abs() as u128 >= PROCESS_EVENT.lease.as_millis());
    }

    #[test]
    fn queue_configs_match_the_spec_table() {
        assert_eq!(BACKFILL.concurrency, 5);
        assert_eq!(PROCESS_EVENT.concurrency, 10);
        assert_eq!(BACKFILL.max_attempts, 3);
        assert_eq!(PROCESS_EVENT.max_attempts, 3);
    }
}
