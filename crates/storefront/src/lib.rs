//! Ironic Gym Storefront library.
//!
//! Server-rendered storefront over the Ironic Gym store backend. The binary
//! in `main.rs` only wires configuration, logging and Sentry around
//! [`app`]; everything else lives here so it can be tested.
//!
//! # Modules
//!
//! - [`backend`] - REST client for the store backend
//! - [`storage`] - per-visitor durable key/value storage (the session)
//! - [`cart`] - persistent cart store with change events
//! - [`checkout`] - checkout handoff to the payment processor
//! - [`finalize`] - one-shot order creation after payment
//! - [`routes`] - HTTP handlers and templates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod finalize;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;

use axum::{Router, extract::Request, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Directory static assets are served from, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the storefront router with its session, request id and tracing
/// layers. Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
