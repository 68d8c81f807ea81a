// Port for the key-value backend holding counter records.
//
// Any store offering single-key compare-and-swap qualifies: an insert that
// fails when the key exists and a replace that fails unless the stored
// version matches. Those two conditional writes are the whole concurrency
// contract the counter engine relies on.

use crate::modules::counters::core::counter_key::CounterKey;
use crate::modules::counters::core::counter_record::{CounterRecord, Version};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CounterStoreError {
    #[error("conditional write lost to a concurrent writer")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Creates the backing table/container when missing.
    ///
    /// Idempotent; returns `true` only for the call that actually created it.
    async fn ensure_container_exists(&self) -> Result<bool, CounterStoreError>;

    async fn get(&self, key: &CounterKey) -> Result<Option<CounterRecord>, CounterStoreError>;

    /// Fails with [`CounterStoreError::Conflict`] when a record for the key
    /// already exists.
    async fn insert_if_absent(&self, record: &CounterRecord) -> Result<(), CounterStoreError>;

    /// Fails with [`CounterStoreError::Conflict`] when the stored version is
    /// not `expected_version`, including when the record is gone.
    async fn replace_if_version_matches(
        &self,
        record: &CounterRecord,
        expected_version: &Version,
    ) -> Result<(), CounterStoreError>;
}
