//! In-memory ledger store for tests.
//!
//! Row locks are emulated with one async mutex per wallet name, held by the
//! transaction until it commits or is dropped. Writes are buffered in the
//! transaction and applied to the shared state on commit, so readers never
//! see a half-applied operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{LedgerStore, LedgerTx, OperationLog, StoreError, StoreResult, WalletStore};
use super::types::{LedgerEntry, NewLedgerEntry, Wallet};
use super::validation::OperationsQuery;

#[derive(Debug, Default)]
struct State {
    wallets: BTreeMap<String, Wallet>,
    entries: Vec<LedgerEntry>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    row_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    lock_requests: Mutex<Vec<Vec<String>>>,
    accesses: AtomicUsize,
    fail_append: std::sync::Mutex<Option<StoreError>>,
}

impl Inner {
    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }

    fn take_append_failure(&self) -> Option<StoreError> {
        self.fail_append
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    async fn row_lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.row_locks.lock().await;
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Ledger store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a wallet with the given balance, bypassing the ledger.
    pub async fn seed_wallet(&self, name: &str, balance: i64) {
        let now = Utc::now();
        self.inner.state.lock().await.wallets.insert(
            name.to_string(),
            Wallet {
                name: name.to_string(),
                balance,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Number of wallets.
    pub async fn wallet_count(&self) -> usize {
        self.inner.state.lock().await.wallets.len()
    }

    /// Sum of all balances.
    pub async fn total_balance(&self) -> i128 {
        self.inner
            .state
            .lock()
            .await
            .wallets
            .values()
            .map(|w| i128::from(w.balance))
            .sum()
    }

    /// Every committed entry, in append order.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.inner.state.lock().await.entries.clone()
    }

    /// Name lists passed to `lock_wallets_for_update`, in call order.
    pub async fn lock_requests(&self) -> Vec<Vec<String>> {
        self.inner.lock_requests.lock().await.clone()
    }

    /// Number of store calls made so far. Seeding is not counted.
    #[must_use]
    pub fn access_count(&self) -> usize {
        self.inner.accesses.load(Ordering::SeqCst)
    }

    /// Makes the next `append` fail with `err`.
    pub fn fail_next_append(&self, err: StoreError) {
        *self
            .inner
            .fail_append
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn create_wallet(&self, name: &str) -> StoreResult<()> {
        self.inner.touch();
        let mut state = self.inner.state.lock().await;
        if !state.wallets.contains_key(name) {
            let now = Utc::now();
            state.wallets.insert(
                name.to_string(),
                Wallet {
                    name: name.to_string(),
                    balance: 0,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Ok(())
    }

    async fn get_wallet(&self, name: &str) -> StoreResult<Option<Wallet>> {
        self.inner.touch();
        Ok(self.inner.state.lock().await.wallets.get(name).cloned())
    }
}

#[async_trait]
impl OperationLog for MemoryStore {
    async fn query(&self, query: &OperationsQuery) -> StoreResult<Vec<LedgerEntry>> {
        self.inner.touch();
        let state = self.inner.state.lock().await;

        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| e.wallet == query.wallet)
            .filter(|e| query.operation_type.is_none_or(|t| e.operation_type == t))
            .filter(|e| query.start.is_none_or(|s| e.created_at.timestamp() >= s))
            .filter(|e| query.end.is_none_or(|end| e.created_at.timestamp() <= end))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let offset = usize::try_from(query.page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page.limit).unwrap_or(usize::MAX);
        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        self.inner.touch();
        Ok(MemoryTx {
            inner: Arc::clone(&self.inner),
            guards: HashMap::new(),
            balances: HashMap::new(),
            pending: Vec::new(),
        })
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    inner: Arc<Inner>,
    guards: HashMap<String, OwnedMutexGuard<()>>,
    balances: HashMap<String, i64>,
    pending: Vec<NewLedgerEntry>,
}

impl MemoryTx {
    async fn lock_row(&mut self, name: &str) {
        if !self.guards.contains_key(name) {
            let guard = self.inner.row_lock(name).await;
            self.guards.insert(name.to_string(), guard);
        }
    }

    async fn current_balance(&self, name: &str) -> Option<i64> {
        if let Some(balance) = self.balances.get(name) {
            return Some(*balance);
        }
        self.inner
            .state
            .lock()
            .await
            .wallets
            .get(name)
            .map(|w| w.balance)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_wallets_for_update(&mut self, names: &[String]) -> StoreResult<Vec<Wallet>> {
        self.inner.touch();
        self.inner.lock_requests.lock().await.push(names.to_vec());

        let mut locked = Vec::with_capacity(names.len());
        for name in names {
            let exists = self.inner.state.lock().await.wallets.contains_key(name);
            if !exists {
                continue;
            }
            self.lock_row(name).await;

            // Re-read after the lock: the previous holder may have committed.
            let wallet = self.inner.state.lock().await.wallets.get(name).cloned();
            if let Some(mut wallet) = wallet {
                if let Some(balance) = self.balances.get(name) {
                    wallet.balance = *balance;
                }
                locked.push(wallet);
            }
        }
        Ok(locked)
    }

    async fn adjust_balance(&mut self, name: &str, delta: i64) -> StoreResult<bool> {
        self.inner.touch();
        self.lock_row(name).await;

        let Some(current) = self.current_balance(name).await else {
            return Ok(false);
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::Backend("bigint out of range".to_string()))?;
        if updated < 0 {
            return Ok(false);
        }
        self.balances.insert(name.to_string(), updated);
        Ok(true)
    }

    async fn append(&mut self, entry: &NewLedgerEntry) -> StoreResult<()> {
        self.inner.touch();
        if let Some(err) = self.inner.take_append_failure() {
            return Err(err);
        }
        if !self.inner.state.lock().await.wallets.contains_key(&entry.wallet) {
            return Err(StoreError::Backend(format!(
                "foreign key violation: wallet {}",
                entry.wallet
            )));
        }
        self.pending.push(entry.clone());
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.inner.touch();
        let mut state = self.inner.state.lock().await;
        let now = Utc::now();

        for (name, balance) in &self.balances {
            if let Some(wallet) = state.wallets.get_mut(name) {
                wallet.balance = *balance;
                wallet.updated_at = now;
            }
        }
        for entry in self.pending {
            state.next_id += 1;
            let id = state.next_id;
            state.entries.push(LedgerEntry {
                id,
                wallet: entry.wallet,
                operation_type: entry.operation_type,
                amount: entry.amount,
                counterparty: entry.counterparty,
                created_at: now,
            });
        }
        drop(state);
        drop(self.guards);
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.inner.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::OperationType;
    use std::time::Duration;
    use wallets_shared::types::PageRequest;

    fn query(wallet: &str) -> OperationsQuery {
        OperationsQuery {
            wallet: wallet.into(),
            operation_type: None,
            start: None,
            end: None,
            page: PageRequest::default(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        store.seed_wallet("a", 100).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.adjust_balance("a", -40).await.unwrap());
        tx.append(&NewLedgerEntry::withdrawal("a", "b", 40)).await.unwrap();

        assert_eq!(store.get_wallet("a").await.unwrap().unwrap().balance, 100);
        assert!(store.query(&query("a")).await.unwrap().is_empty());

        tx.rollback().await.unwrap();
        assert_eq!(store.get_wallet("a").await.unwrap().unwrap().balance, 100);
    }

    #[tokio::test]
    async fn test_adjust_balance_refuses_negative() {
        let store = MemoryStore::new();
        store.seed_wallet("a", 10).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.adjust_balance("a", -11).await.unwrap());
        assert!(!tx.adjust_balance("ghost", 1).await.unwrap());
        assert!(tx.adjust_balance("a", -10).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.get_wallet("a").await.unwrap().unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_lock_skips_missing_wallets() {
        let store = MemoryStore::new();
        store.seed_wallet("a", 1).await;

        let mut tx = store.begin().await.unwrap();
        let locked = tx
            .lock_wallets_for_update(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].name, "a");
    }

    #[tokio::test]
    async fn test_lock_blocks_until_commit() {
        let store = MemoryStore::new();
        store.seed_wallet("a", 100).await;
        let names = vec!["a".to_string()];

        let mut first = store.begin().await.unwrap();
        first.lock_wallets_for_update(&names).await.unwrap();
        first.adjust_balance("a", -30).await.unwrap();

        let waiter = {
            let store = store.clone();
            let names = names.clone();
            tokio::spawn(async move {
                let mut second = store.begin().await.unwrap();
                let locked = second.lock_wallets_for_update(&names).await.unwrap();
                locked[0].balance
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        first.commit().await.unwrap();
        assert_eq!(waiter.await.unwrap(), 70);
    }

    #[tokio::test]
    async fn test_query_orders_and_pages() {
        let store = MemoryStore::new();
        store.seed_wallet("a", 0).await;

        for amount in 1..=5 {
            let mut tx = store.begin().await.unwrap();
            tx.append(&NewLedgerEntry::deposit("a", "system", amount)).await.unwrap();
            tx.commit().await.unwrap();
        }

        let mut q = query("a");
        q.page = PageRequest { limit: 2, offset: 1 };
        let page: Vec<i64> = store.query(&q).await.unwrap().iter().map(|e| e.amount).collect();
        assert_eq!(page, vec![2, 3]);

        q.operation_type = Some(OperationType::Withdrawal);
        assert!(store.query(&q).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_failure_injection() {
        let store = MemoryStore::new();
        store.seed_wallet("a", 0).await;
        store.fail_next_append(StoreError::Backend("boom".into()));

        let mut tx = store.begin().await.unwrap();
        let entry = NewLedgerEntry::deposit("a", "system", 1);
        assert!(tx.append(&entry).await.is_err());
        assert!(tx.append(&entry).await.is_ok());
    }
}
