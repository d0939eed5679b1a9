use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::config::{Priority, QueueConfig, COMPLETED_RETENTION, FAILED_RETENTION};
use crate::error::QueueError;
use crate::job::{priority_from_str, priority_to_str, Job};
use crate::stats::QueueStats;

/// Atomically pulls up to `limit` due jobs out of `scheduled` and marks them
/// active with a lease. Grounded on `automations::server`'s
/// `FOR UPDATE SKIP LOCKED` dequeue — a Redis `EVAL` script is this
/// backend's equivalent atomic claim primitive.
const CLAIM_SCRIPT: &str = r#"
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, ARGV[3])
for _, id in ipairs(ids) do
    redis.call('ZREM', KEYS[1], id)
    redis.call('HSET', KEYS[2], id, ARGV[2])
end
return ids
"#;

/// Moves active entries whose lease has expired back onto `scheduled`,
/// immediately due — the Redis equivalent of `automations::executors`'s
/// heartbeat-timeout reclaim.
const RECLAIM_SCRIPT: &str = r#"
local all = redis.call('HGETALL', KEYS[1])
local reclaimed = {}
for i = 1, #all, 2 do
    local id = all[i]
    local lease = tonumber(all[i + 1])
    if lease < tonumber(ARGV[1]) then
        redis.call('HDEL', KEYS[1], id)
        redis.call('ZADD', KEYS[2], ARGV[1], id)
        table.insert(reclaimed, id)
    end
end
return reclaimed
"#;

/// One of the three named queues (spec.md §4.5), backed by Redis.
pub struct RedisQueue {
    conn: ConnectionManager,
    config: QueueConfig,
}

impl RedisQueue {
    pub fn new(conn: ConnectionManager, config: QueueConfig) -> Self {
        Self { conn, config }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn scheduled_key(&self) -> String {
        format!("idx:queue:{}:scheduled", self.config.name)
    }
    fn active_key(&self) -> String {
        format!("idx:queue:{}:active", self.config.name)
    }
    fn job_key(&self, id: &str) -> String {
        format!("idx:queue:{}:job:{id}", self.config.name)
    }
    fn dedup_key(&self) -> String {
        format!("idx:queue:{}:dedup", self.config.name)
    }
    fn completed_key(&self) -> String {
        format!("idx:queue:{}:completed", self.config.name)
    }
    fn failed_key(&self) -> String {
        format!("idx:queue:{}:failed", self.config.name)
    }
    fn paused_key(&self) -> String {
        format!("idx:queue:{}:paused", self.config.name)
    }

    /// Enqueues a job at `due_at_ms` with `priority`. If `dedup_key` is
    /// `Some` and already live (job waiting or active), the enqueue is
    /// skipped and `Ok(None)` is returned — spec.md §4.5's dedup contract
    /// (e.g. `backfill-<fid>` preventing duplicate concurrent backfills).
    pub async fn enqueue(
        &self,
        id: &str,
        payload: &serde_json::Value,
        due_at_ms: i64,
        priority: Priority,
        dedup_key: Option<&str>,
    ) -> Result<Option<String>, QueueError> {
        let mut conn = self.conn.clone();

        if let Some(key) = dedup_key {
            let added: bool = conn.hset_nx(self.dedup_key(), key, id).await?;
            if !added {
                return Ok(None);
            }
        }

        let payload_str = serde_json::to_string(payload)?;
        let _: () = redis::pipe()
            .hset(self.job_key(id), "payload", payload_str)
            .ignore()
            .hset(self.job_key(id), "attempts", 0)
            .ignore()
            .hset(self.job_key(id), "priority", priority_to_str(priority))
            .ignore()
            .hset(self.job_key(id), "dedup_key", dedup_key.unwrap_or(""))
            .ignore()
            .zadd(self.scheduled_key(), id, due_at_ms + priority.score_bias_ms())
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(Some(id.to_string()))
    }

    /// Claims up to `limit` due jobs, skipping the claim entirely if the
    /// queue is paused.
    pub async fn claim(&self, limit: u32, now_ms: i64, lease: std::time::Duration) -> Result<Vec<Job>, QueueError> {
        if self.is_paused().await? {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let lease_until = now_ms + lease.as_millis() as i64;
        let ids: Vec<String> = Script::new(CLAIM_SCRIPT)
            .key(self.scheduled_key())
            .key(self.active_key())
            .arg(now_ms)
            .arg(lease_until)
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let fields: std::collections::HashMap<String, String> = conn.hgetall(self.job_key(&id)).await?;
            let payload = fields.get("payload").map(|s| serde_json::from_str(s)).transpose()?.unwrap_or(serde_json::Value::Null);
            let attempts = fields.get("attempts").and_then(|s| s.parse().ok()).unwrap_or(0);
            let priority = fields.get("priority").map(|s| priority_from_str(s)).unwrap_or(self.config.default_priority);
            let dedup_key = fields.get("dedup_key").filter(|s| !s.is_empty()).cloned();
            jobs.push(Job { id, payload, attempts, priority, dedup_key });
        }
        Ok(jobs)
    }

    /// Reclaims jobs whose worker lease expired without ack/fail (crash,
    /// hang) — immediately re-due, so the next `claim` picks them back up.
    pub async fn reclaim_expired(&self, now_ms: i64) -> Result<Vec<String>, QueueError> {
        let mut conn = self.conn.clone();
        let reclaimed: Vec<String> = Script::new(RECLAIM_SCRIPT).key(self.active_key()).key(self.scheduled_key()).arg(now_ms).invoke_async(&mut conn).await?;
        Ok(reclaimed)
    }

    /// Marks `job` terminally successful: clears its active lease and dedup
    /// key, drops its hash, and records it on the `completed` list (trimmed
    /// to spec.md §4.5's retention of 100).
    pub async fn ack(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.hdel(self.active_key(), &job.id).ignore();
        pipe.del(self.job_key(&job.id)).ignore();
        if let Some(key) = &job.dedup_key {
            pipe.hdel(self.dedup_key(), key).ignore();
        }
        pipe.lpush(self.completed_key(), &job.id).ignore();
        pipe.ltrim(self.completed_key(), 0, COMPLETED_RETENTION - 1).ignore();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// Marks `job` as having failed one attempt. Re-schedules with
    /// exponential backoff if attempts remain, otherwise moves it to the
    /// `failed` list (retention 50) and releases its dedup key so a fresh
    /// attempt can be enqueued by an operator or a later event.
    pub async fn fail(&self, job: &Job, now_ms: i64) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let next_attempts = job.attempts + 1;

        if next_attempts < self.config.max_attempts {
            let backoff_ms = self.config.backoff_base.as_millis() as i64 * 2i64.pow(job.attempts);
            let due_at = now_ms + backoff_ms;
            let mut pipe = redis::pipe();
            pipe.hdel(self.active_key(), &job.id).ignore();
            pipe.hset(self.job_key(&job.id), "attempts", next_attempts).ignore();
            pipe.zadd(self.scheduled_key(), &job.id, due_at + job.priority.score_bias_ms()).ignore();
            let _: () = pipe.query_async(&mut conn).await?;
        } else {
            let mut pipe = redis::pipe();
            pipe.hdel(self.active_key(), &job.id).ignore();
            pipe.del(self.job_key(&job.id)).ignore();
            if let Some(key) = &job.dedup_key {
                pipe.hdel(self.dedup_key(), key).ignore();
            }
            pipe.lpush(self.failed_key(), &job.id).ignore();
            pipe.ltrim(self.failed_key(), 0, FAILED_RETENTION - 1).ignore();
            let _: () = pipe.query_async(&mut conn).await?;
        }
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.paused_key(), 1).await?;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.paused_key()).await?;
        Ok(())
    }

    pub async fn is_paused(&self) -> Result<bool, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(self.paused_key()).await?)
    }

    pub async fn stats(&self, now_ms: i64) -> Result<QueueStats, QueueError> {
        let mut conn = self.conn.clone();
        let waiting: u64 = conn.zcount(self.scheduled_key(), "-inf", now_ms).await?;
        let delayed: u64 = conn.zcount(self.scheduled_key(), format!("({now_ms}"), "+inf").await?;
        let active: u64 = conn.hlen(self.active_key()).await?;
        let completed: u64 = conn.llen(self.completed_key()).await?;
        let failed: u64 = conn.llen(self.failed_key()).await?;
        let paused = self.is_paused().await?;
        Ok(QueueStats { waiting, active, completed, failed, delayed, paused })
    }
}
