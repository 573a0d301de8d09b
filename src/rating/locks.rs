use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-entity write locks shared by all submissions in this process.
///
/// Entries live only while a submission holds or waits on them.
#[derive(Default)]
pub struct EntityLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other submission in this process is writing `entity_id`
    pub async fn acquire(&self, entity_id: &str) -> EntityGuard<'_> {
        let mutex = self
            .locks
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;

        EntityGuard {
            locks: self,
            entity_id: entity_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of entities currently locked or awaited
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    entity_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map holds the last reference when nobody waits
        self.guard.take();
        self.locks
            .locks
            .remove_if(&self.entity_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
