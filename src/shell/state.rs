use crate::modules::counters::adapters::outbound::counter_store::CounterStore;
use crate::modules::counters::use_cases::next_counter_value::handler::NextCounterValueHandler;
use crate::modules::counters::use_cases::next_counter_value::retry_policy::RetryPolicy;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub next_counter_value_handler: Arc<NextCounterValueHandler<dyn CounterStore>>,
    pub default_owner_id: Arc<str>,
    /// Fired on shutdown; in-flight updates stop retrying once it is.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CounterStore>,
        retry_policy: RetryPolicy,
        default_owner_id: impl Into<String>,
    ) -> Self {
        Self {
            next_counter_value_handler: Arc::new(NextCounterValueHandler::new(store, retry_policy)),
            default_owner_id: Arc::from(default_owner_id.into()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}
