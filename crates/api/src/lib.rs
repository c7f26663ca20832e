//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for wallets, deposits, transfers and history
//! - JSON and CSV encoding of ledger entries
//! - Mapping of ledger errors to HTTP responses
//!
//! The router is generic over the ledger store so it can be served from
//! Postgres in production and from memory in tests.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wallets_core::ledger::{LedgerCoordinator, LedgerStore, QueryService};
use wallets_shared::config::LedgerConfig;

pub use error::ApiError;

/// Application state shared across handlers.
pub struct AppState<S> {
    /// Writes: wallet creation, deposits and transfers.
    pub coordinator: Arc<LedgerCoordinator<S>>,
    /// Reads: wallet lookups and history.
    pub queries: Arc<QueryService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            queries: Arc::clone(&self.queries),
        }
    }
}

impl<S: LedgerStore> AppState<S> {
    /// Builds the state over `store` with the retry policy from `config`.
    #[must_use]
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            coordinator: Arc::new(
                LedgerCoordinator::new(Arc::clone(&store)).with_max_retries(config.max_retries),
            ),
            queries: Arc::new(QueryService::new(store)),
        }
    }
}

/// Creates the main application router.
pub fn create_router<S: LedgerStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
