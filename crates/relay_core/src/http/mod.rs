//! HTTP surface of the relay.
//!
//! The router maps the JSON API onto [`RelayService`] operations; the server
//! owns the listener, the sweeper and the shutdown signal.

mod handlers;
mod server;
mod types;

pub use server::RelayServer;
pub use types::{CommandRequest, ErrorBody};

use crate::service::RelayService;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the application router over `service`.
pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/", get(handlers::banner))
        .route("/health", get(handlers::health))
        .route("/api", get(handlers::poll).post(handlers::client_action))
        .route("/api/players", get(handlers::list_players))
        .route("/api/players/delete", post(handlers::delete_players))
        .route("/api/players/:id", delete(handlers::delete_player))
        .route("/api/command", post(handlers::enqueue_command))
        .route("/api/stats", get(handlers::stats))
        .route("/api/chat", post(handlers::append_chat))
        .route("/api/chat/:id", get(handlers::chat_history))
        .route("/api/exec-result", post(handlers::set_exec_result))
        .route("/api/exec-result/:id", get(handlers::take_exec_result))
        .route("/api/logs/:id", get(handlers::logs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}
