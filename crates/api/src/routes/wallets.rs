//! Wallet routes: creation, lookup, deposits and transfers.

use std::future::Future;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};
use wallets_core::ledger::{
    CreateWalletRequest, DepositRequest, LedgerError, LedgerStore, TransferRequest, Wallet,
};
use wallets_shared::AppError;
use wallets_shared::types::from_minor_units;

use crate::{AppState, error::ApiError};

/// Creates the wallet routes.
pub fn routes<S: LedgerStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/wallets", post(create_wallet::<S>))
        .route("/wallets/deposit", post(deposit::<S>))
        .route("/wallets/transfer", post(transfer::<S>))
        .route("/wallets/{name}", get(get_wallet::<S>))
}

/// Response for a wallet.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    /// Wallet name.
    pub name: String,
    /// Balance as a decimal string.
    pub balance: Decimal,
    /// Balance in minor units.
    pub balance_minor_units: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            balance: from_minor_units(wallet.balance),
            balance_minor_units: wallet.balance,
            name: wallet.name,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

/// Runs a ledger write on its own task.
///
/// The write finishes or rolls back even if the client disconnects first.
async fn detached<F>(work: F) -> Result<(), ApiError>
where
    F: Future<Output = Result<(), LedgerError>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!(error = %e, "Ledger task failed");
            Err(ApiError(AppError::Internal("An error occurred".to_string())))
        }
    }
}

/// POST `/wallets` - Create a wallet. Creating an existing name is a no-op.
async fn create_wallet<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<CreateWalletRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let wallet = state.coordinator.create_wallet(&request).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "wallet": WalletResponse::from(wallet) })),
    ))
}

/// GET `/wallets/{name}` - Get a wallet and its balance.
async fn get_wallet<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet = state.queries.get_wallet(&name).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "wallet": WalletResponse::from(wallet) })),
    ))
}

/// POST `/wallets/deposit` - Add external funds to a wallet.
async fn deposit<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let wallet = request.wallet.clone();
    let amount = request.amount;

    let coordinator = state.coordinator.clone();
    detached(async move { coordinator.deposit(&request).await }).await?;

    info!(wallet = %wallet, amount = %amount, "Deposit accepted");
    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}

/// POST `/wallets/transfer` - Move funds between two wallets.
async fn transfer<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let wallet_from = request.wallet_from.clone();
    let wallet_to = request.wallet_to.clone();
    let amount = request.amount;

    let coordinator = state.coordinator.clone();
    detached(async move { coordinator.transfer(&request).await }).await?;

    info!(
        wallet_from = %wallet_from,
        wallet_to = %wallet_to,
        amount = %amount,
        "Transfer accepted"
    );
    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}
