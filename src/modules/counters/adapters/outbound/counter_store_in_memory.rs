// In memory implementation of the CounterStore port.
//
// Purpose
// - Support handler tests and local development without a database.
//
// Responsibilities
// - Store one record per counter key.
// - Enforce optimistic concurrency by checking existence and version under one write lock.
// - Offer fault injection (offline, delayed writes, forced conflicts) for tests.

use crate::modules::counters::adapters::outbound::counter_store::{
    CounterStore, CounterStoreError,
};
use crate::modules::counters::core::counter_key::CounterKey;
use crate::modules::counters::core::counter_record::{CounterRecord, Version};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCounterStore {
    inner: RwLock<HashMap<CounterKey, CounterRecord>>,
    provisioned: AtomicBool,
    offline: AtomicBool,
    delay_write_ms: AtomicU64,
    injected_conflicts: AtomicU32,
    committed_writes: AtomicU64,
    reads: AtomicU64,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `Unavailable` while offline. Writes check after
    /// their delay, so a store can drop out between a read and its write.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Sleeps this long before each conditional write takes the lock, widening
    /// the window in which concurrent writers race.
    pub fn set_delay_write_ms(&self, ms: u64) {
        self.delay_write_ms.store(ms, Ordering::SeqCst);
    }

    /// Makes the next `count` conditional writes fail with a conflict without
    /// touching the stored records.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of conditional writes that actually committed.
    pub fn committed_writes(&self) -> u64 {
        self.committed_writes.load(Ordering::SeqCst)
    }

    /// Number of `get` calls, including failed ones.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn record_count(&self) -> usize {
        self.inner.read().await.len()
    }

    fn check_online(&self) -> Result<(), CounterStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CounterStoreError::Unavailable("Counter store offline".into()));
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<(), CounterStoreError> {
        let delay = self.delay_write_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check_online()?;
        let injected = self
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(CounterStoreError::Conflict);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn ensure_container_exists(&self) -> Result<bool, CounterStoreError> {
        self.check_online()?;
        Ok(!self.provisioned.swap(true, Ordering::SeqCst))
    }

    async fn get(&self, key: &CounterKey) -> Result<Option<CounterRecord>, CounterStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn insert_if_absent(&self, record: &CounterRecord) -> Result<(), CounterStoreError> {
        self.before_write().await?;
        let mut guard = self.inner.write().await;
        if guard.contains_key(&record.key) {
            return Err(CounterStoreError::Conflict);
        }
        guard.insert(record.key.clone(), record.clone());
        self.committed_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn replace_if_version_matches(
        &self,
        record: &CounterRecord,
        expected_version: &Version,
    ) -> Result<(), CounterStoreError> {
        self.before_write().await?;
        let mut guard = self.inner.write().await;
        match guard.get_mut(&record.key) {
            Some(stored) if stored.version == *expected_version => {
                *stored = record.clone();
                self.committed_writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(CounterStoreError::Conflict),
        }
    }
}
