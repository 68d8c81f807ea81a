// Composition root for the counters bounded context.
//
// Responsibilities
// - Read config from file and environment.
// - Instantiate the configured counter store.
// - Wire the store into the use case handler and expose the HTTP router.

pub mod config;
pub mod error;
pub mod graphql;
pub mod http;
pub mod state;

use crate::modules::counters::adapters::outbound::counter_store::{
    CounterStore, CounterStoreError,
};
use crate::modules::counters::adapters::outbound::counter_store_in_memory::InMemoryCounterStore;
use crate::modules::counters::adapters::outbound::counter_store_sqlite::SqliteCounterStore;
use crate::shell::config::{AppConfig, StoreConfig};
use crate::shell::state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn build_counter_store(
    config: &StoreConfig,
) -> Result<Arc<dyn CounterStore>, CounterStoreError> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using the in-memory counter store; counters are lost on restart");
            Ok(Arc::new(InMemoryCounterStore::new()) as Arc<dyn CounterStore>)
        }
        StoreConfig::Sqlite {
            url,
            table,
            max_connections,
        } => {
            let store = SqliteCounterStore::connect(url, table, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn CounterStore>)
        }
    }
}

pub async fn build_state(
    config: &AppConfig,
    shutdown: CancellationToken,
) -> Result<AppState, CounterStoreError> {
    let store = build_counter_store(&config.store).await?;
    Ok(AppState::new(
        store,
        config.counters.retry,
        config.counters.default_owner_id.clone(),
    )
    .with_shutdown(shutdown))
}
