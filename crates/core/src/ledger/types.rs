//! Ledger domain types.
//!
//! Balances and amounts are `i64` minor units. Decimal values only appear in
//! the request types that arrive from callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Counterparty recorded on deposits whose funds come from outside the system.
pub const SYSTEM_WALLET: &str = "system";

/// Longest wallet name the store accepts.
pub const MAX_WALLET_NAME_LEN: usize = 255;

/// Kind of balance change recorded by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Balance increased.
    Deposit,
    /// Balance decreased.
    Withdrawal,
}

impl OperationType {
    /// Returns the wire name of the operation type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            _ => Err(LedgerError::UnsupportedOperationType(s.to_string())),
        }
    }
}

/// A named account holding a non-negative balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique, case-sensitive name.
    pub name: String,
    /// Balance in minor units, never negative.
    pub balance: i64,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

/// An immutable record of one balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Storage-assigned id, used for ordering only.
    pub id: i64,
    /// Wallet whose balance changed.
    pub wallet: String,
    /// Direction of the change.
    pub operation_type: OperationType,
    /// Amount in minor units, always positive.
    pub amount: i64,
    /// The other wallet involved, or [`SYSTEM_WALLET`].
    pub counterparty: String,
    /// Commit-time timestamp set by the store.
    pub created_at: DateTime<Utc>,
}

/// A ledger entry that has not been appended yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// Wallet whose balance changes.
    pub wallet: String,
    /// Direction of the change.
    pub operation_type: OperationType,
    /// Amount in minor units.
    pub amount: i64,
    /// The other wallet involved.
    pub counterparty: String,
}

impl NewLedgerEntry {
    /// Entry for funds arriving in `wallet` from `counterparty`.
    #[must_use]
    pub fn deposit(wallet: &str, counterparty: &str, amount: i64) -> Self {
        Self {
            wallet: wallet.to_string(),
            operation_type: OperationType::Deposit,
            amount,
            counterparty: counterparty.to_string(),
        }
    }

    /// Entry for funds leaving `wallet` towards `counterparty`.
    #[must_use]
    pub fn withdrawal(wallet: &str, counterparty: &str, amount: i64) -> Self {
        Self {
            wallet: wallet.to_string(),
            operation_type: OperationType::Withdrawal,
            amount,
            counterparty: counterparty.to_string(),
        }
    }
}

/// Request to create a wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWalletRequest {
    /// Name of the new wallet.
    pub name: String,
}

/// Request to add external funds to a wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    /// Target wallet.
    pub wallet: String,
    /// Decimal amount, truncated to minor units.
    pub amount: Decimal,
}

/// Request to move funds between two wallets.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    /// Wallet to debit.
    pub wallet_from: String,
    /// Wallet to credit.
    pub wallet_to: String,
    /// Decimal amount, truncated to minor units.
    pub amount: Decimal,
}

/// Unvalidated history filter as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationsFilter {
    /// Wallet whose history is requested.
    #[serde(default)]
    pub wallet: String,
    /// Optional operation type name.
    #[serde(rename = "type")]
    pub operation_type: Option<String>,
    /// Inclusive lower bound on creation time, epoch seconds.
    pub start_date: Option<i64>,
    /// Inclusive upper bound on creation time, epoch seconds.
    pub end_date: Option<i64>,
    /// Page size.
    pub limit: Option<i64>,
    /// Entries to skip.
    pub offset: Option<i64>,
}

/// Stages a transfer passes through before it commits.
///
/// Any stage before `Committed` may abort; an abort leaves no trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// Request arrived.
    Received,
    /// Input passed validation.
    Validated,
    /// Both wallet rows are locked.
    Locked,
    /// Source balance covers the amount.
    BalanceChecked,
    /// Balances and entries are written, not yet visible.
    Mutated,
    /// Transaction committed.
    Committed,
}
