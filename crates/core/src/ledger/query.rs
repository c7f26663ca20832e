//! Read side: wallet lookups and operation history.
//!
//! Reads take no locks. They see committed state only.

use std::sync::Arc;

use tracing::debug;

use super::error::LedgerError;
use super::store::{OperationLog, WalletStore};
use super::types::{LedgerEntry, OperationsFilter, Wallet};
use super::validation::{validate_filter, validate_wallet_name};

/// Validates filters and forwards them to the operation log.
#[derive(Debug)]
pub struct QueryService<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: WalletStore + OperationLog> QueryService<S> {
    /// Creates a query service over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns a wallet by name.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if it does not exist, or a storage error.
    pub async fn get_wallet(&self, name: &str) -> Result<Wallet, LedgerError> {
        validate_wallet_name(name)?;
        self.store
            .get_wallet(name)
            .await
            .map_err(|e| LedgerError::from_store("get_wallet", &[name], e))?
            .ok_or_else(|| LedgerError::WalletNotFound(name.to_string()))
    }

    /// Returns a page of a wallet's history, oldest first.
    ///
    /// An unknown wallet yields an empty page, not an error.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad filter, or a storage error.
    pub async fn get_operations(
        &self,
        filter: &OperationsFilter,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let query = validate_filter(filter)?;
        debug!(
            wallet = %query.wallet,
            operation_type = ?query.operation_type,
            limit = query.page.limit,
            offset = query.page.offset,
            "Querying operations"
        );

        self.store
            .query(&query)
            .await
            .map_err(|e| LedgerError::from_store("get_operations", &[query.wallet.as_str()], e))
    }
}
