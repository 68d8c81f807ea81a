use crate::modules::counters::adapters::outbound::counter_store::{
    CounterStore, CounterStoreError,
};
use crate::modules::counters::core::counter_key::CounterKey;
use crate::modules::counters::core::counter_record::{CounterRecord, Version};
use crate::modules::counters::core::decide::{DecideError, Decision, decide, validate_increment};
use crate::modules::counters::use_cases::next_counter_value::command::NextCounterValue;
use crate::modules::counters::use_cases::next_counter_value::retry_policy::RetryPolicy;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("gave up after {attempts} conflicting attempts")]
    ContentionExceeded { attempts: u32 },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("cancelled before the update committed")]
    Cancelled,
}

impl From<DecideError> for EngineError {
    fn from(error: DecideError) -> Self {
        EngineError::InvalidArgument(error.to_string())
    }
}

// Conflicts are consumed by the retry loop; anything else reaching the
// caller is a backend failure.
fn store_failure(error: CounterStoreError) -> EngineError {
    match error {
        CounterStoreError::Unavailable(reason) => EngineError::StoreUnavailable(reason),
        CounterStoreError::Conflict => {
            EngineError::StoreUnavailable("unexpected conflict outside a conditional write".into())
        }
    }
}

/// Applies increments and resets to a counter with optimistic concurrency.
///
/// Each attempt reads the record, decides the new value and commits it with a
/// conditional write. A conflicting write means someone else committed in
/// between, so the attempt is thrown away and the loop re-reads. Nothing is
/// cached between calls; the only shared state is the store itself.
pub struct NextCounterValueHandler<TCounterStore>
where
    TCounterStore: CounterStore + ?Sized + 'static,
{
    store: Arc<TCounterStore>,
    retry_policy: RetryPolicy,
    provisioned: OnceCell<()>,
}

impl<TCounterStore> NextCounterValueHandler<TCounterStore>
where
    TCounterStore: CounterStore + ?Sized + 'static,
{
    pub fn new(store: Arc<TCounterStore>, retry_policy: RetryPolicy) -> Self {
        Self {
            store,
            retry_policy,
            provisioned: OnceCell::new(),
        }
    }

    pub async fn handle(&self, command: NextCounterValue) -> Result<i64, EngineError> {
        self.handle_with_cancellation(command, &CancellationToken::new())
            .await
    }

    /// Like [`Self::handle`], but stops retrying once `cancel` fires.
    ///
    /// Cancellation is only observed between attempts: a conditional write
    /// already in flight runs to completion, and if it committed its value is
    /// returned.
    pub async fn handle_with_cancellation(
        &self,
        command: NextCounterValue,
        cancel: &CancellationToken,
    ) -> Result<i64, EngineError> {
        validate_increment(command.increment)?;
        self.ensure_provisioned().await?;

        let attempts = self.retry_policy.attempts();
        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                tracing::debug!(key = %command.key, attempt, "Cancelled before attempt");
                return Err(EngineError::Cancelled);
            }

            match self.attempt(&command).await {
                Ok(value) => {
                    tracing::info!(
                        owner_id = command.key.owner_id(),
                        name = command.key.name(),
                        value,
                        attempt,
                        "Counter updated"
                    );
                    return Ok(value);
                }
                Err(AttemptError::Conflict) if attempt < attempts => {
                    let delay = self.retry_policy.delay(attempt);
                    tracing::debug!(key = %command.key, attempt, ?delay, "Write conflict, retrying");
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                Err(AttemptError::Conflict) => {}
                Err(AttemptError::Failed(error)) => return Err(error),
            }
        }

        tracing::warn!(key = %command.key, attempts, "Retry budget exhausted");
        Err(EngineError::ContentionExceeded { attempts })
    }

    /// Reads the stored value without writing; an absent counter reads as 0.
    pub async fn current_value(&self, key: &CounterKey) -> Result<i64, EngineError> {
        self.ensure_provisioned().await?;
        let current = self.store.get(key).await.map_err(store_failure)?;
        Ok(current.map_or(0, |record| record.value))
    }

    async fn ensure_provisioned(&self) -> Result<(), EngineError> {
        self.provisioned
            .get_or_try_init(|| async {
                if self.store.ensure_container_exists().await.map_err(store_failure)? {
                    tracing::info!("Created counter table");
                }
                Ok::<(), EngineError>(())
            })
            .await
            .map(|_| ())
    }

    async fn attempt(&self, command: &NextCounterValue) -> Result<i64, AttemptError> {
        let current = self
            .store
            .get(&command.key)
            .await
            .map_err(|e| AttemptError::Failed(store_failure(e)))?;

        let (record, written) = match decide(current.as_ref(), command) {
            Decision::Unchanged { value } => return Ok(value),
            Decision::Rejected { reason } => return Err(AttemptError::Failed(reason.into())),
            Decision::Insert { value } => {
                let record = CounterRecord::new(command.key.clone(), value, Version::fresh());
                let written = self.store.insert_if_absent(&record).await;
                (record, written)
            }
            Decision::Replace {
                value,
                expected_version,
            } => {
                let record = CounterRecord::new(command.key.clone(), value, Version::fresh());
                let written = self
                    .store
                    .replace_if_version_matches(&record, &expected_version)
                    .await;
                (record, written)
            }
        };

        match written {
            Ok(()) => Ok(record.value),
            Err(CounterStoreError::Conflict) => Err(AttemptError::Conflict),
            Err(e) => Err(AttemptError::Failed(store_failure(e))),
        }
    }
}

enum AttemptError {
    Conflict,
    Failed(EngineError),
}

#[cfg(test)]
mod next_counter_value_handler_tests {
    use super::*;
    use crate::modules::counters::adapters::outbound::counter_store_in_memory::InMemoryCounterStore;
    use crate::tests::fixtures::commands::next_counter_value::NextCounterValueBuilder;
    use rstest::{fixture, rstest};
    use tokio::task::JoinSet;

    type BeforeEachReturn = (
        Arc<InMemoryCounterStore>,
        NextCounterValueHandler<InMemoryCounterStore>,
    );

    #[fixture]
    fn before_each() -> BeforeEachReturn {
        let store = Arc::new(InMemoryCounterStore::new());
        let handler = NextCounterValueHandler::new(store.clone(), RetryPolicy::default());
        (store, handler)
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_create_the_counter_on_first_write(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(5).build();
        assert_eq!(handler.handle(command.clone()).await, Ok(5));
        assert_eq!(store.record_count().await, 1);
        assert_eq!(store.get(&command.key).await.unwrap().unwrap().value, 5);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_accumulate_sequential_increments(before_each: BeforeEachReturn) {
        let (_, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(2).build();
        assert_eq!(handler.handle(command.clone()).await, Ok(2));
        assert_eq!(handler.handle(command.clone()).await, Ok(4));
        assert_eq!(handler.handle(command).await, Ok(6));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reset_to_exactly_the_increment(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        handler
            .handle(NextCounterValueBuilder::new().increment(40).build())
            .await
            .unwrap();
        let command = NextCounterValueBuilder::new().increment(3).reset(true).build();
        assert_eq!(handler.handle(command.clone()).await, Ok(3));
        let key = command.key;
        assert_eq!(store.get(&key).await.unwrap().unwrap().value, 3);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_read_without_changing_the_version(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(7).build();
        handler.handle(command.clone()).await.unwrap();
        let before = store.get(&command.key).await.unwrap().unwrap();

        let read = NextCounterValue::read(command.key.clone());
        assert_eq!(handler.handle(read.clone()).await, Ok(7));
        assert_eq!(handler.handle(read).await, Ok(7));

        let after = store.get(&command.key).await.unwrap().unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(store.committed_writes(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_read_the_current_value_without_creating_it(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(4).build();
        assert_eq!(handler.current_value(&command.key).await, Ok(0));
        assert_eq!(store.record_count().await, 0);

        handler.handle(command.clone()).await.unwrap();
        assert_eq!(handler.current_value(&command.key).await, Ok(4));
        assert_eq!(store.committed_writes(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_a_negative_increment_without_touching_the_store(
        before_each: BeforeEachReturn,
    ) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(-1).build();
        let result = handler.handle(command).await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        assert_eq!(store.record_count().await, 0);
        assert_eq!(store.committed_writes(), 0);
        // Provisioning is skipped as well.
        assert!(store.ensure_container_exists().await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_retry_after_an_injected_conflict(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(1).build();
        handler.handle(command.clone()).await.unwrap();

        store.inject_conflicts(1);
        assert_eq!(handler.handle(command).await, Ok(2));
        assert_eq!(store.committed_writes(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_retry_an_insert_that_lost_a_race(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        store.inject_conflicts(1);
        let command = NextCounterValueBuilder::new().increment(4).build();
        assert_eq!(handler.handle(command).await, Ok(4));
        assert_eq!(store.committed_writes(), 1);
        assert_eq!(store.record_count().await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_give_up_when_the_retry_budget_is_exhausted() {
        let store = Arc::new(InMemoryCounterStore::new());
        let handler = NextCounterValueHandler::new(store.clone(), RetryPolicy::without_backoff(3));
        store.inject_conflicts(3);
        let command = NextCounterValueBuilder::new().build();
        assert_eq!(
            handler.handle(command).await,
            Err(EngineError::ContentionExceeded { attempts: 3 })
        );
        assert_eq!(store.record_count().await, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_when_the_store_is_offline_before_provisioning() {
        let store = Arc::new(InMemoryCounterStore::new());
        store.set_offline(true);
        let handler = NextCounterValueHandler::new(store.clone(), RetryPolicy::default());
        let result = handler.handle(NextCounterValueBuilder::new().build()).await;
        assert_eq!(
            result,
            Err(EngineError::StoreUnavailable("Counter store offline".into()))
        );
        assert_eq!(store.reads(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_a_read_without_retrying_once_the_store_goes_offline(
        before_each: BeforeEachReturn,
    ) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(2).build();
        handler.handle(command.clone()).await.unwrap();
        let reads_before = store.reads();

        store.set_offline(true);
        assert_eq!(
            handler.handle(command).await,
            Err(EngineError::StoreUnavailable("Counter store offline".into()))
        );
        assert_eq!(store.reads(), reads_before + 1);
        assert_eq!(store.committed_writes(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_a_write_without_retrying_when_the_store_drops_mid_attempt(
        before_each: BeforeEachReturn,
    ) {
        let (store, handler) = before_each;
        let command = NextCounterValueBuilder::new().increment(2).build();
        handler.handle(command.clone()).await.unwrap();
        let reads_before = store.reads();

        store.set_delay_write_ms(50);
        let outage = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            outage.set_offline(true);
        });
        assert_eq!(
            handler.handle(command.clone()).await,
            Err(EngineError::StoreUnavailable("Counter store offline".into()))
        );
        assert_eq!(store.reads(), reads_before + 1);
        assert_eq!(store.committed_writes(), 1);

        store.set_offline(false);
        assert_eq!(store.get(&command.key).await.unwrap().unwrap().value, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_not_attempt_anything_once_cancelled(before_each: BeforeEachReturn) {
        let (store, handler) = before_each;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = handler
            .handle_with_cancellation(NextCounterValueBuilder::new().build(), &cancel)
            .await;
        assert_eq!(result, Err(EngineError::Cancelled));
        assert_eq!(store.committed_writes(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_a_write_that_committed_while_cancelling(
        before_each: BeforeEachReturn,
    ) {
        let (store, handler) = before_each;
        store.set_delay_write_ms(30);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            trigger.cancel();
        });
        let result = handler
            .handle_with_cancellation(NextCounterValueBuilder::new().increment(3).build(), &cancel)
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(store.committed_writes(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_stop_retrying_when_cancelled_during_backoff() {
        let store = Arc::new(InMemoryCounterStore::new());
        let policy = RetryPolicy {
            max_attempts: 8,
            base_delay_ms: 10_000,
            max_delay_ms: 10_000,
        };
        let handler = NextCounterValueHandler::new(store.clone(), policy);
        store.inject_conflicts(8);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let started = std::time::Instant::now();
        let result = handler
            .handle_with_cancellation(NextCounterValueBuilder::new().build(), &cancel)
            .await;
        // Either the jittered sleep was short enough to reach the next
        // attempt check, or the select observed the cancellation.
        assert_eq!(result, Err(EngineError::Cancelled));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        assert_eq!(store.committed_writes(), 0);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_should_not_lose_concurrent_increments() {
        let store = Arc::new(InMemoryCounterStore::new());
        store.set_delay_write_ms(1);
        let handler = Arc::new(NextCounterValueHandler::new(
            store.clone(),
            RetryPolicy::default().with_max_attempts(1_000),
        ));

        let mut tasks = JoinSet::new();
        for _ in 0..50 {
            let handler = handler.clone();
            tasks.spawn(async move {
                handler
                    .handle(NextCounterValueBuilder::new().name("racy").build())
                    .await
            });
        }
        let mut seen = Vec::new();
        while let Some(result) = tasks.join_next().await {
            seen.push(result.unwrap().unwrap());
        }

        seen.sort_unstable();
        assert_eq!(seen, (1..=50).collect::<Vec<i64>>());
        let key = NextCounterValueBuilder::new().name("racy").build().key;
        assert_eq!(store.get(&key).await.unwrap().unwrap().value, 50);
        assert_eq!(store.committed_writes(), 50);
    }
}
