//! Component D: the target-set cache (spec.md §4.4).
//!
//! Exposed as a trait so `indexer-core` workers depend on an interface, not
//! a concrete Redis handle — the same testability idiom as the teacher's
//! `ControlPlane` trait over `PGControlPlane`. `FakeTargetCache` is the
//! in-memory test double used where a unit test shouldn't need a live Redis.

mod fake;
mod redis_cache;

use async_trait::async_trait;
use indexer_types::Fid;

pub use fake::FakeTargetCache;
pub use redis_cache::RedisTargetCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error")]
    Backend(#[from] redis::RedisError),
}

/// Which of the two sets an operation targets (spec.md §4.4/§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSet {
    Targets,
    ClientTargets,
}

impl TargetSet {
    fn key(self) -> &'static str {
        match self {
            Self::Targets => "idx:targets",
            Self::ClientTargets => "idx:client_targets",
        }
    }
}

#[async_trait]
pub trait TargetCache: Send + Sync {
    async fn add(&self, set: TargetSet, fid: Fid) -> Result<(), CacheError>;
    async fn remove(&self, set: TargetSet, fid: Fid) -> Result<(), CacheError>;
    async fn contains(&self, set: TargetSet, fid: Fid) -> Result<bool, CacheError>;
    async fn load_all(&self, set: TargetSet) -> Result<Vec<Fid>, CacheError>;
    async fn clear(&self, set: TargetSet) -> Result<(), CacheError>;
    /// Replaces the full membership of `set` in one round trip. Used by the
    /// boot sequence (J) to hydrate the cache from the tables.
    async fn hydrate(&self, set: TargetSet, fids: &[Fid]) -> Result<(), CacheError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn fake_cache_round_trips_membership() {
        let cache = FakeTargetCache::default();
        let fid = Fid::new(42).unwrap();
        assert!(!cache.contains(TargetSet::Targets, fid).await.unwrap());
        cache.add(TargetSet::Targets, fid).await.unwrap();
        assert!(cache.contains(TargetSet::Targets, fid).await.unwrap());
        cache.remove(TargetSet::Targets, fid).await.unwrap();
        assert!(!cache.contains(TargetSet::Targets, fid).await.unwrap());
    }

    #[tokio::test]
    async fn fake_cache_keeps_sets_independent() {
        let cache = FakeTargetCache::default();
        let fid = Fid::new(7).unwrap();
        cache.add(TargetSet::ClientTargets, fid).await.unwrap();
        assert!(!cache.contains(TargetSet::Targets, fid).await.unwrap());
        assert!(cache.contains(TargetSet::ClientTargets, fid).await.unwrap());
    }
}
