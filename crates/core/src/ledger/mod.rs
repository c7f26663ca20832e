//! Wallet ledger.
//!
//! This module implements the core ledger functionality:
//! - Domain types for wallets and ledger entries
//! - Validation of inbound requests
//! - Store traits implemented by the persistence adapters
//! - The transaction coordinator for deposits and transfers
//! - The query service for wallet lookups and history

pub mod coordinator;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod query;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod coordinator_props;

pub use coordinator::{DEFAULT_MAX_RETRIES, LedgerCoordinator};
pub use error::{ErrorClass, LedgerError};
pub use query::QueryService;
pub use store::{LedgerStore, LedgerTx, OperationLog, StoreError, StoreResult, WalletStore};
pub use types::{
    CreateWalletRequest, DepositRequest, LedgerEntry, MAX_WALLET_NAME_LEN, NewLedgerEntry,
    OperationType, OperationsFilter, SYSTEM_WALLET, TransferRequest, TransferStage, Wallet,
};
pub use validation::{Deposit, OperationsQuery, Transfer};
