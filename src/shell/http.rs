use axum::{Extension, Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::modules::counters::use_cases::next_counter_value::inbound::http as next_http;
use crate::shell::graphql::{build_schema, graphiql, graphql};
use crate::shell::state::AppState;

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    let schema = build_schema(state.clone());
    Router::new()
        .route(
            "/next/{name}",
            get(next_http::handle_named).post(next_http::handle_named),
        )
        .route(
            "/counter-update",
            get(next_http::handle).post(next_http::handle),
        )
        .route("/gql", get(graphiql).post(graphql))
        .route("/health", get(health))
        .layer(Extension(schema))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
