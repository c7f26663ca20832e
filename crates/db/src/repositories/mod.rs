//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod ledger;
pub mod operation;
pub mod wallet;

pub use ledger::{LedgerRepository, PgLedgerTx, classify};
pub use operation::OperationRepository;
pub use wallet::WalletRepository;
