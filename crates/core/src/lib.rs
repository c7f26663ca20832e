//! Core ledger logic for the wallets service.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached only through the traits in [`ledger::store`].
//!
//! # Modules
//!
//! - `ledger` - Wallets, ledger entries, validation, the transaction
//!   coordinator and the history query service

pub mod ledger;
