//! Ledger transaction coordinator.
//!
//! The only writer of balances and ledger entries. Deposits and transfers run
//! as one store transaction each: lock the wallets involved, check balances,
//! mutate, append, commit. Any failure before commit rolls the transaction
//! back, so a half-applied operation is never visible.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::LedgerError;
use super::store::{LedgerStore, LedgerTx, StoreError};
use super::types::{
    CreateWalletRequest, DepositRequest, NewLedgerEntry, SYSTEM_WALLET, TransferRequest,
    TransferStage, Wallet,
};
use super::validation::{
    Deposit, Transfer, validate_deposit, validate_new_wallet_name, validate_transfer,
};

/// Retries used when none are configured.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Runs deposits and transfers as atomic, lock-ordered transactions.
#[derive(Debug)]
pub struct LedgerCoordinator<S> {
    store: Arc<S>,
    max_retries: u32,
}

impl<S> Clone for LedgerCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_retries: self.max_retries,
        }
    }
}

impl<S: LedgerStore> LedgerCoordinator<S> {
    /// Creates a coordinator over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets how many times a transaction aborted by a concurrent update is re-run.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates a wallet with a zero balance, or returns the existing one.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name, or a storage error.
    pub async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<Wallet, LedgerError> {
        const OP: &str = "create_wallet";
        let name = request.name.as_str();
        validate_new_wallet_name(name)?;

        self.store
            .create_wallet(name)
            .await
            .map_err(|e| LedgerError::from_store(OP, &[name], e))?;

        let wallet = self
            .store
            .get_wallet(name)
            .await
            .map_err(|e| LedgerError::from_store(OP, &[name], e))?
            .ok_or_else(|| LedgerError::WalletNotFound(name.to_string()))?;

        info!(wallet = %name, "Wallet ready");
        Ok(wallet)
    }

    /// Adds external funds to a wallet.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `WalletNotFound`, `BalanceOverflow`, or a
    /// storage error. Nothing is written on error.
    pub async fn deposit(&self, request: &DepositRequest) -> Result<(), LedgerError> {
        let deposit = validate_deposit(request)?;
        let wallet = deposit.wallet.as_str();

        let existing = self
            .store
            .get_wallet(wallet)
            .await
            .map_err(|e| LedgerError::from_store("deposit", &[wallet], e))?;
        if existing.is_none() {
            return Err(LedgerError::WalletNotFound(deposit.wallet.clone()));
        }

        self.retrying("deposit", &[wallet], || self.deposit_once(&deposit))
            .await?;

        info!(wallet = %wallet, amount = deposit.amount, "Deposit committed");
        Ok(())
    }

    /// Moves funds from one wallet to another.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `WalletNotFound`/`WalletsNotFound`,
    /// `InsufficientFunds`, `BalanceOverflow`, or a storage error. Both
    /// balances and the log are untouched on error.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<(), LedgerError> {
        debug!(
            wallet_from = %request.wallet_from,
            wallet_to = %request.wallet_to,
            stage = ?TransferStage::Received,
            "Transfer received"
        );
        let transfer = validate_transfer(request)?;
        debug!(stage = ?TransferStage::Validated, "Transfer validated");

        let wallets = [transfer.from.as_str(), transfer.to.as_str()];
        self.retrying("transfer", &wallets, || self.transfer_once(&transfer))
            .await?;

        info!(
            wallet_from = %transfer.from,
            wallet_to = %transfer.to,
            amount = transfer.amount,
            stage = ?TransferStage::Committed,
            "Transfer committed"
        );
        Ok(())
    }

    /// Re-runs `run` while it fails with a retryable conflict.
    async fn retrying<F, Fut>(
        &self,
        operation: &'static str,
        wallets: &[&str],
        mut run: F,
    ) -> Result<(), LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), LedgerError>>,
    {
        let mut attempt = 0;
        loop {
            match run().await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        operation,
                        wallets = ?wallets,
                        attempt,
                        error = %err,
                        "Retrying after concurrent update"
                    );
                }
                result => return result,
            }
        }
    }

    async fn deposit_once(&self, deposit: &Deposit) -> Result<(), LedgerError> {
        const OP: &str = "deposit";
        let wallet = deposit.wallet.as_str();
        let store_err = |e: StoreError| LedgerError::from_store(OP, &[wallet], e);

        let mut tx = self.store.begin().await.map_err(store_err)?;
        let result = Self::apply_deposit(&mut tx, deposit).await;
        match result {
            Ok(()) => tx.commit().await.map_err(store_err),
            Err(err) => {
                abort(tx, OP, &err).await;
                Err(err)
            }
        }
    }

    async fn apply_deposit(tx: &mut S::Tx, deposit: &Deposit) -> Result<(), LedgerError> {
        const OP: &str = "deposit";
        let wallet = deposit.wallet.as_str();
        let store_err = |e: StoreError| LedgerError::from_store(OP, &[wallet], e);

        let locked = tx
            .lock_wallets_for_update(std::slice::from_ref(&deposit.wallet))
            .await
            .map_err(store_err)?;
        let current = locked
            .iter()
            .find(|w| w.name == deposit.wallet)
            .ok_or_else(|| LedgerError::WalletNotFound(deposit.wallet.clone()))?;

        if current.balance.checked_add(deposit.amount).is_none() {
            return Err(LedgerError::BalanceOverflow {
                wallet: deposit.wallet.clone(),
            });
        }

        if !tx.adjust_balance(wallet, deposit.amount).await.map_err(store_err)? {
            return Err(LedgerError::WalletNotFound(deposit.wallet.clone()));
        }
        tx.append(&NewLedgerEntry::deposit(wallet, SYSTEM_WALLET, deposit.amount))
            .await
            .map_err(store_err)
    }

    async fn transfer_once(&self, transfer: &Transfer) -> Result<(), LedgerError> {
        const OP: &str = "transfer";
        let wallets = [transfer.from.as_str(), transfer.to.as_str()];
        let store_err = |e: StoreError| LedgerError::from_store(OP, &wallets, e);

        let mut tx = self.store.begin().await.map_err(store_err)?;
        let result = Self::apply_transfer(&mut tx, transfer).await;
        match result {
            Ok(()) => tx.commit().await.map_err(store_err),
            Err(err) => {
                abort(tx, OP, &err).await;
                Err(err)
            }
        }
    }

    async fn apply_transfer(tx: &mut S::Tx, transfer: &Transfer) -> Result<(), LedgerError> {
        const OP: &str = "transfer";
        let wallets = [transfer.from.as_str(), transfer.to.as_str()];
        let store_err = |e: StoreError| LedgerError::from_store(OP, &wallets, e);
        let amount = transfer.amount;

        // Global lock order: every transaction locks names in ascending order.
        let mut names = vec![transfer.from.clone(), transfer.to.clone()];
        names.sort();

        let locked = tx.lock_wallets_for_update(&names).await.map_err(store_err)?;
        debug!(stage = ?TransferStage::Locked, locked = locked.len(), "Wallets locked");

        let from = locked.iter().find(|w| w.name == transfer.from);
        let to = locked.iter().find(|w| w.name == transfer.to);
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            (None, None) => return Err(LedgerError::WalletsNotFound),
            (None, Some(_)) => return Err(LedgerError::WalletNotFound(transfer.from.clone())),
            (Some(_), None) => return Err(LedgerError::WalletNotFound(transfer.to.clone())),
        };

        if from.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                wallet: transfer.from.clone(),
            });
        }
        if to.balance.checked_add(amount).is_none() {
            return Err(LedgerError::BalanceOverflow {
                wallet: transfer.to.clone(),
            });
        }
        debug!(stage = ?TransferStage::BalanceChecked, "Balance checked");

        if !tx.adjust_balance(&transfer.from, -amount).await.map_err(store_err)? {
            return Err(LedgerError::InsufficientFunds {
                wallet: transfer.from.clone(),
            });
        }
        tx.append(&NewLedgerEntry::withdrawal(&transfer.from, &transfer.to, amount))
            .await
            .map_err(store_err)?;

        if !tx.adjust_balance(&transfer.to, amount).await.map_err(store_err)? {
            return Err(LedgerError::WalletNotFound(transfer.to.clone()));
        }
        tx.append(&NewLedgerEntry::deposit(&transfer.to, &transfer.from, amount))
            .await
            .map_err(store_err)?;

        debug!(stage = ?TransferStage::Mutated, "Balances updated");
        Ok(())
    }
}

/// Rolls back after a failed step. The original error is what the caller sees.
async fn abort<T: LedgerTx>(tx: T, operation: &'static str, cause: &LedgerError) {
    debug!(operation, error = %cause, "Rolling back");
    if let Err(e) = tx.rollback().await {
        warn!(operation, error = %e, "Rollback failed");
    }
}
