//! Storage traits the coordinator and query service run against.
//!
//! The core never talks to a database directly. Adapters implement these
//! traits; the Postgres one lives in `wallets-db`, an in-memory one in
//! [`super::memory`].

use async_trait::async_trait;
use thiserror::Error;

use super::types::{LedgerEntry, NewLedgerEntry, Wallet};
use super::validation::OperationsQuery;

/// Failure reported by a store adapter.
///
/// The payload is diagnostic text for logs and never reaches callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transaction aborted by a concurrent update (serialization failure or deadlock).
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// Waiting for a row lock exceeded the configured bound.
    #[error("lock wait timed out: {0}")]
    LockTimeout(String),

    /// Any other infrastructure failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Wallet lookups and creation outside of a ledger transaction.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Inserts a wallet with a zero balance if the name is free.
    ///
    /// Creating an existing name is a no-op.
    async fn create_wallet(&self, name: &str) -> StoreResult<()>;

    /// Point lookup. Absence is not an error.
    async fn get_wallet(&self, name: &str) -> StoreResult<Option<Wallet>>;
}

/// Read access to the append-only ledger.
#[async_trait]
pub trait OperationLog: Send + Sync {
    /// Entries of one wallet in ascending creation order, filtered and paged.
    async fn query(&self, query: &OperationsQuery) -> StoreResult<Vec<LedgerEntry>>;
}

/// A store that can run atomic ledger transactions.
#[async_trait]
pub trait LedgerStore: WalletStore + OperationLog {
    /// Transaction handle type.
    type Tx: LedgerTx;

    /// Opens a transaction. Nothing written through it is visible before commit.
    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// One open ledger transaction.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait LedgerTx: Send + Sized {
    /// Locks the named wallets, in the given order, until the transaction ends.
    ///
    /// Returns the wallets that exist; missing names are simply absent from
    /// the result. Blocks while another transaction holds any of the locks.
    async fn lock_wallets_for_update(&mut self, names: &[String]) -> StoreResult<Vec<Wallet>>;

    /// Adds `delta` to a wallet balance.
    ///
    /// Returns `false`, changing nothing, if the wallet is missing or the
    /// balance would become negative.
    async fn adjust_balance(&mut self, name: &str, delta: i64) -> StoreResult<bool>;

    /// Appends an entry; its timestamp is assigned by the store.
    async fn append(&mut self, entry: &NewLedgerEntry) -> StoreResult<()>;

    /// Makes every write of this transaction visible at once.
    async fn commit(self) -> StoreResult<()>;

    /// Discards every write of this transaction.
    async fn rollback(self) -> StoreResult<()>;
}
