use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;

use crate::modules::counters::core::counter_key::{CounterKey, CounterKeyError};
use crate::modules::counters::use_cases::next_counter_value::command::NextCounterValue;
use crate::shared::inbound::caller_identity::{FUNCTION_KEY_HEADER, resolve_owner_id};
use crate::shell::error::ApiError;
use crate::shell::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NextCounterValueParams {
    pub name: Option<String>,
    pub count: Option<String>,
    pub reset: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error(transparent)]
    Key(#[from] CounterKeyError),

    #[error("count value must be a positive integer: \"{0}\"")]
    Count(String),

    #[error("reset value must be true/false: \"{0}\"")]
    Reset(String),
}

impl From<InvalidRequest> for ApiError {
    fn from(error: InvalidRequest) -> Self {
        ApiError::BadRequest(error.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl NextCounterValueParams {
    /// Validates the raw parameters into a command.
    ///
    /// `count` defaults to 1; `reset` defaults to false and a bare `?reset`
    /// means true. The owner comes from `code`, then the function key header,
    /// then `default_owner_id`.
    pub fn into_command(
        self,
        header_owner: Option<&str>,
        default_owner_id: &str,
    ) -> Result<NextCounterValue, InvalidRequest> {
        let name = self.name.unwrap_or_default();
        let owner_id = resolve_owner_id(self.code.as_deref(), header_owner, default_owner_id);
        let key = CounterKey::new(owner_id, name)?;

        let increment = match self.count {
            None => 1,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n >= 0 => n,
                _ => return Err(InvalidRequest::Count(raw)),
            },
        };

        let reset = match self.reset {
            None => false,
            Some(raw) => match raw.trim() {
                "" => true,
                v if v.eq_ignore_ascii_case("true") => true,
                v if v.eq_ignore_ascii_case("false") => false,
                _ => return Err(InvalidRequest::Reset(raw.clone())),
            },
        };

        Ok(NextCounterValue::new(key, increment, reset))
    }
}

/// `GET|POST /next/{name}`
pub async fn handle_named(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<NextCounterValueParams>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let mut params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    params.name = Some(name);
    respond(state, params, &headers).await
}

/// `GET|POST /counter-update?name=...`
pub async fn handle(
    State(state): State<AppState>,
    query: Result<Query<NextCounterValueParams>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    match query {
        Ok(Query(params)) => respond(state, params, &headers).await,
        Err(rejection) => ApiError::from(rejection).into_response(),
    }
}

async fn respond(state: AppState, params: NextCounterValueParams, headers: &HeaderMap) -> Response {
    let header_owner = headers
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    let command = match params.into_command(header_owner, &state.default_owner_id) {
        Ok(command) => command,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state
        .next_counter_value_handler
        .handle_with_cancellation(command, &state.shutdown)
        .await
    {
        Ok(value) => (StatusCode::OK, value.to_string()).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
