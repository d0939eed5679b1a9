use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use indexer_types::Fid;

use crate::{CacheError, TargetCache, TargetSet};

/// Redis-backed `TargetCache`. `ConnectionManager` transparently reconnects
/// and is `Clone`, so one instance is shared across every worker (teacher:
/// `agent-sql`'s thin-wrapper-over-a-store style, applied to a Redis handle
/// instead of a `PgPool`).
#[derive(Clone)]
pub struct RedisTargetCache {
    conn: ConnectionManager,
}

impl RedisTargetCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TargetCache for RedisTargetCache {
    async fn add(&self, set: TargetSet, fid: Fid) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(set.key(), fid.as_i64()).await?;
        Ok(())
    }

    async fn remove(&self, set: TargetSet, fid: Fid) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.srem::<_, _, ()>(set.key(), fid.as_i64()).await?;
        Ok(())
    }

    async fn contains(&self, set: TargetSet, fid: Fid) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.sismember(set.key(), fid.as_i64()).await?;
        Ok(exists)
    }

    async fn load_all(&self, set: TargetSet) -> Result<Vec<Fid>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Vec<i64> = conn.smembers(set.key()).await?;
        Ok(raw.into_iter().filter_map(|v| Fid::new(v).ok()).collect())
    }

    async fn clear(&self, set: TargetSet) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(set.key()).await?;
        Ok(())
    }

    async fn hydrate(&self, set: TargetSet, fids: &[Fid]) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(set.key()).await?;
        if fids.is_empty() {
            return Ok(());
        }
        let values: Vec<i64> = fids.iter().map(|f| f.as_i64()).collect();
        conn.sadd::<_, _, ()>(set.key(), values).await?;
        Ok(())
    }
}
