//! Postgres implementation of the ledger store traits.
//!
//! Every deposit and transfer runs in one `DatabaseTransaction`. Row locks
//! come from `SELECT ... FOR UPDATE`, and the lock wait is bounded per
//! transaction with `SET LOCAL lock_timeout`.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, RuntimeErr,
    TransactionTrait,
};
use tracing::debug;
use wallets_core::ledger::{
    LedgerEntry, LedgerStore, LedgerTx, NewLedgerEntry, OperationLog, OperationsQuery, StoreError,
    StoreResult, Wallet, WalletStore,
};
use wallets_shared::config::{IsolationSetting, LedgerConfig};

use super::operation::OperationRepository;
use super::wallet::WalletRepository;

/// SQLSTATE for a serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for a detected deadlock.
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Maps a database error to the store error the coordinator understands.
#[must_use]
pub fn classify(err: DbErr) -> StoreError {
    let code = match &err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db))) => {
            db.code().map(|c| c.into_owned())
        }
        _ => None,
    };

    match code.as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => StoreError::Conflict(err.to_string()),
        Some(LOCK_NOT_AVAILABLE) => StoreError::LockTimeout(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

const fn isolation_level(setting: IsolationSetting) -> IsolationLevel {
    match setting {
        IsolationSetting::ReadCommitted => IsolationLevel::ReadCommitted,
        IsolationSetting::RepeatableRead => IsolationLevel::RepeatableRead,
        IsolationSetting::Serializable => IsolationLevel::Serializable,
    }
}

/// Ledger store backed by Postgres.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    wallets: WalletRepository,
    operations: OperationRepository,
    isolation: IsolationSetting,
    lock_timeout: Option<Duration>,
}

impl LedgerRepository {
    /// Creates a ledger store with the transaction settings from `config`.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &LedgerConfig) -> Self {
        Self {
            wallets: WalletRepository::new(db.clone()),
            operations: OperationRepository::new(db.clone()),
            db,
            isolation: config.isolation,
            lock_timeout: config.lock_timeout(),
        }
    }
}

#[async_trait]
impl WalletStore for LedgerRepository {
    async fn create_wallet(&self, name: &str) -> StoreResult<()> {
        let inserted = self.wallets.create(name).await.map_err(classify)?;
        debug!(wallet = %name, inserted, "Create wallet");
        Ok(())
    }

    async fn get_wallet(&self, name: &str) -> StoreResult<Option<Wallet>> {
        let wallet = self.wallets.find_by_name(name).await.map_err(classify)?;
        Ok(wallet.map(Wallet::from))
    }
}

#[async_trait]
impl OperationLog for LedgerRepository {
    async fn query(&self, query: &OperationsQuery) -> StoreResult<Vec<LedgerEntry>> {
        let rows = self.operations.query(query).await.map_err(classify)?;
        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> StoreResult<PgLedgerTx> {
        let txn = self
            .db
            .begin_with_config(Some(isolation_level(self.isolation)), None)
            .await
            .map_err(classify)?;

        if let Some(timeout) = self.lock_timeout {
            let sql = format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis());
            txn.execute_unprepared(&sql).await.map_err(classify)?;
        }

        Ok(PgLedgerTx { txn })
    }
}

/// An open Postgres ledger transaction.
///
/// Dropping it without commit rolls back.
#[derive(Debug)]
pub struct PgLedgerTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_wallets_for_update(&mut self, names: &[String]) -> StoreResult<Vec<Wallet>> {
        let rows = WalletRepository::lock_for_update(&self.txn, names)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(Wallet::from).collect())
    }

    async fn adjust_balance(&mut self, name: &str, delta: i64) -> StoreResult<bool> {
        WalletRepository::adjust_balance(&self.txn, name, delta)
            .await
            .map_err(classify)
    }

    async fn append(&mut self, entry: &NewLedgerEntry) -> StoreResult<()> {
        OperationRepository::append(&self.txn, entry)
            .await
            .map_err(classify)
    }

    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(classify)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.txn.rollback().await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_backend_failures() {
        let err = classify(DbErr::Custom("connection reset".into()));
        assert!(matches!(err, StoreError::Backend(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn test_isolation_mapping() {
        assert!(matches!(
            isolation_level(IsolationSetting::ReadCommitted),
            IsolationLevel::ReadCommitted
        ));
        assert!(matches!(
            isolation_level(IsolationSetting::Serializable),
            IsolationLevel::Serializable
        ));
    }
}
