//! API route definitions.

use axum::Router;
use wallets_core::ledger::LedgerStore;

use crate::AppState;

pub mod health;
pub mod operations;
pub mod wallets;

/// Creates the versioned API router.
pub fn api_routes<S: LedgerStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .merge(wallets::routes())
        .merge(operations::routes())
}
