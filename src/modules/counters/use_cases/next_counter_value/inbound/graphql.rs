use async_graphql::{Context, Object, Result as GqlResult};

use crate::modules::counters::core::counter_key::CounterKey;
use crate::modules::counters::use_cases::next_counter_value::command::NextCounterValue;
use crate::shared::inbound::caller_identity::{CallerIdentity, resolve_owner_id};
use crate::shell::error::ApiError;
use crate::shell::state::AppState;

fn counter_key(context: &Context<'_>, owner_id: Option<String>, name: &str) -> GqlResult<CounterKey> {
    let state = context.data_unchecked::<AppState>();
    let header_owner = context
        .data_opt::<CallerIdentity>()
        .and_then(|identity| identity.0.as_deref());
    let owner_id = resolve_owner_id(owner_id.as_deref(), header_owner, &state.default_owner_id);
    CounterKey::new(owner_id, name).map_err(|e| async_graphql::Error::new(e.to_string()))
}

async fn run(context: &Context<'_>, command: NextCounterValue) -> GqlResult<i64> {
    let state = context.data_unchecked::<AppState>();
    state
        .next_counter_value_handler
        .handle_with_cancellation(command, &state.shutdown)
        .await
        .map_err(|e| async_graphql::Error::new(ApiError::from(e).to_string()))
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Current value of a counter, 0 when it has never been written.
    async fn counter_value(
        &self,
        context: &Context<'_>,
        name: String,
        owner_id: Option<String>,
    ) -> GqlResult<i64> {
        let key = counter_key(context, owner_id, &name)?;
        let state = context.data_unchecked::<AppState>();
        state
            .next_counter_value_handler
            .current_value(&key)
            .await
            .map_err(|e| async_graphql::Error::new(ApiError::from(e).to_string()))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn next_counter_value(
        &self,
        context: &Context<'_>,
        name: String,
        #[graphql(default = 1)] count: i64,
        #[graphql(default = false)] reset: bool,
        owner_id: Option<String>,
    ) -> GqlResult<i64> {
        let key = counter_key(context, owner_id, &name)?;
        run(context, NextCounterValue::new(key, count, reset)).await
    }
}
