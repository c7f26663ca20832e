//! Property-based tests for the transaction coordinator.
//!
//! Runs random sequences of deposits and transfers against the in-memory
//! store and checks the ledger invariants after each sequence.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use proptest::prelude::*;
use rust_decimal::Decimal;
use wallets_shared::types::PageRequest;

use super::coordinator::LedgerCoordinator;
use super::error::LedgerError;
use super::memory::MemoryStore;
use super::store::{OperationLog, WalletStore};
use super::types::{DepositRequest, OperationType, TransferRequest};
use super::validation::OperationsQuery;

const WALLETS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Deposit { wallet: usize, cents: i64 },
    Transfer { from: usize, to: usize, cents: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..WALLETS.len(), 1i64..100_000).prop_map(|(wallet, cents)| Op::Deposit { wallet, cents }),
        (0..WALLETS.len(), 0..WALLETS.len(), 1i64..150_000)
            .prop_map(|(from, to, cents)| Op::Transfer { from, to, cents }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn seeded() -> (Arc<MemoryStore>, LedgerCoordinator<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    for name in WALLETS {
        store.seed_wallet(name, 0).await;
    }
    let coordinator = LedgerCoordinator::new(Arc::clone(&store));
    (store, coordinator)
}

fn all_of(wallet: &str) -> OperationsQuery {
    OperationsQuery {
        wallet: wallet.to_string(),
        operation_type: None,
        start: None,
        end: None,
        page: PageRequest { limit: 1000, offset: 0 },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Transfers never create or destroy money, balances never go negative,
    /// and every balance equals the sum of its own history.
    #[test]
    fn prop_ledger_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..40)) {
        runtime().block_on(async {
            let (store, coordinator) = seeded().await;
            let mut deposited: i128 = 0;

            for op in ops {
                match op {
                    Op::Deposit { wallet, cents } => {
                        coordinator
                            .deposit(&DepositRequest {
                                wallet: WALLETS[wallet].into(),
                                amount: Decimal::new(cents, 2),
                            })
                            .await
                            .unwrap();
                        deposited += i128::from(cents);
                    }
                    Op::Transfer { from, to, cents } => {
                        let result = coordinator
                            .transfer(&TransferRequest {
                                wallet_from: WALLETS[from].into(),
                                wallet_to: WALLETS[to].into(),
                                amount: Decimal::new(cents, 2),
                            })
                            .await;
                        match result {
                            Ok(())
                            | Err(LedgerError::InsufficientFunds { .. } | LedgerError::SameWallets) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                }
            }

            assert_eq!(store.total_balance().await, deposited);

            for name in WALLETS {
                let wallet = store.get_wallet(name).await.unwrap().unwrap();
                assert!(wallet.balance >= 0);

                let net: i64 = store
                    .query(&all_of(name))
                    .await
                    .unwrap()
                    .iter()
                    .map(|e| match e.operation_type {
                        OperationType::Deposit => e.amount,
                        OperationType::Withdrawal => -e.amount,
                    })
                    .sum();
                assert_eq!(net, wallet.balance);
            }
        });
    }

    /// A transfer larger than the source balance changes nothing.
    #[test]
    fn prop_overdraft_leaves_no_trace(balance in 0i64..10_000, excess in 1i64..10_000) {
        runtime().block_on(async {
            let (store, coordinator) = seeded().await;
            store.seed_wallet("alice", balance).await;

            let err = coordinator
                .transfer(&TransferRequest {
                    wallet_from: "alice".into(),
                    wallet_to: "bob".into(),
                    amount: Decimal::new(balance + excess, 2),
                })
                .await
                .unwrap_err();

            assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
            assert_eq!(store.get_wallet("alice").await.unwrap().unwrap().balance, balance);
            assert_eq!(store.get_wallet("bob").await.unwrap().unwrap().balance, 0);
            assert!(store.entries().await.is_empty());
        });
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_do_not_deadlock() {
    let (store, coordinator) = seeded().await;
    store.seed_wallet("alice", 100_000).await;
    store.seed_wallet("bob", 100_000).await;

    let tasks = (0..200).map(|i| {
        let coordinator = coordinator.clone();
        let (from, to) = if i % 2 == 0 { ("alice", "bob") } else { ("bob", "alice") };
        tokio::spawn(async move {
            coordinator
                .transfer(&TransferRequest {
                    wallet_from: from.into(),
                    wallet_to: to.into(),
                    amount: Decimal::new(100, 2),
                })
                .await
        })
    });

    let results = tokio::time::timeout(Duration::from_secs(10), join_all(tasks))
        .await
        .expect("transfers deadlocked");

    for result in results {
        result.unwrap().unwrap();
    }
    assert_eq!(store.total_balance().await, 200_000);
    assert_eq!(store.get_wallet("alice").await.unwrap().unwrap().balance, 100_000);
    assert_eq!(store.entries().await.len(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    let (store, coordinator) = seeded().await;
    store.seed_wallet("alice", 1_000).await;

    let tasks = (0..50).map(|i| {
        let coordinator = coordinator.clone();
        let to = if i % 2 == 0 { "bob" } else { "carol" };
        tokio::spawn(async move {
            coordinator
                .transfer(&TransferRequest {
                    wallet_from: "alice".into(),
                    wallet_to: to.into(),
                    amount: Decimal::new(100, 2),
                })
                .await
        })
    });

    let mut succeeded = 0;
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(()) => succeeded += 1,
            Err(LedgerError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(store.get_wallet("alice").await.unwrap().unwrap().balance, 0);
    assert_eq!(store.total_balance().await, 1_000);
}
