use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use indexer_types::Fid;

use crate::{CacheError, TargetCache, TargetSet};

/// In-memory `TargetCache` for unit tests that shouldn't need a live Redis.
#[derive(Default)]
pub struct FakeTargetCache {
    targets: Mutex<HashSet<Fid>>,
    client_targets: Mutex<HashSet<Fid>>,
}

impl FakeTargetCache {
    fn set(&self, set: TargetSet) -> &Mutex<HashSet<Fid>> {
        match set {
            TargetSet::Targets => &self.targets,
            TargetSet::ClientTargets => &self.client_targets,
        }
    }
}

#[async_trait]
impl TargetCache for FakeTargetCache {
    async fn add(&self, set: TargetSet, fid: Fid) -> Result<(), CacheError> {
        self.set(set).lock().unwrap().insert(fid);
        Ok(())
    }

    async fn remove(&self, set: TargetSet, fid: Fid) -> Result<(), CacheError> {
        self.set(set).lock().unwrap().remove(&fid);
        Ok(())
    }

    async fn contains(&self, set: TargetSet, fid: Fid) -> Result<bool, CacheError> {
        Ok(self.set(set).lock().unwrap().contains(&fid))
    }

    async fn load_all(&self, set: TargetSet) -> Result<Vec<Fid>, CacheError> {
        Ok(self.set(set).lock().unwrap().iter().copied().collect())
    }

    async fn clear(&self, set: TargetSet) -> Result<(), CacheError> {
        self.set(set).lock().unwrap().clear();
        Ok(())
    }

    async fn hydrate(&self, set: TargetSet, fids: &[Fid]) -> Result<(), CacheError> {
        let mut guard = self.set(set).lock().unwrap();
        guard.clear();
        guard.extend(fids.iter().copied());
        Ok(())
    }
}
