mod command;
mod health;
mod messages;
mod webhook;

use crate::AppState;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/webhook", axum::routing::post(webhook::webhook))
        .route("/messages", axum::routing::post(messages::message))
        .route("/command", axum::routing::post(command::command))
        .route("/health", axum::routing::get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
