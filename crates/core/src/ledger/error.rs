//! Ledger error types.
//!
//! Every inbound operation fails with exactly one `LedgerError`. Each variant
//! belongs to a severity class so callers can map it to a response without
//! comparing messages.

use thiserror::Error;
use wallets_shared::AppError;

use super::store::StoreError;

/// Severity class of a ledger failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller input was rejected before any state was touched.
    BadRequest,
    /// A referenced wallet does not exist.
    NotFound,
    /// The request conflicts with current balances or concurrent work.
    Conflict,
    /// Infrastructure failure.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Wallet name is empty.
    #[error("empty wallet name")]
    EmptyWalletName,

    /// Source wallet name is empty.
    #[error("empty wallet_from")]
    EmptyWalletFrom,

    /// Destination wallet name is empty.
    #[error("empty wallet_to")]
    EmptyWalletTo,

    /// Wallet name exceeds the storage limit.
    #[error("wallet name longer than {max} characters")]
    WalletNameTooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// Wallet name collides with the system counterparty.
    #[error("wallet name '{0}' is reserved")]
    ReservedWalletName(String),

    /// Transfer source and destination are the same wallet.
    #[error("same wallets")]
    SameWallets,

    /// Amount is zero or negative after conversion to minor units.
    #[error("amount must be positive")]
    NonPositiveAmount,

    /// Amount does not fit in the minor-unit representation.
    #[error("amount is too large")]
    AmountTooLarge,

    /// Filter start bound is negative.
    #[error("start_date can't be negative")]
    NegativeStartDate,

    /// Filter end bound is negative.
    #[error("end_date can't be negative")]
    NegativeEndDate,

    /// Filter start bound is after the end bound.
    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange {
        /// Requested start, epoch seconds.
        start: i64,
        /// Requested end, epoch seconds.
        end: i64,
    },

    /// Page size outside the accepted range.
    #[error("limit must be between 1 and {max}")]
    LimitOutOfRange {
        /// Largest accepted limit.
        max: u64,
    },

    /// Filter offset is negative.
    #[error("offset can't be negative")]
    NegativeOffset,

    /// Operation type is not one of the known kinds.
    #[error("unsupported operation type: {0}")]
    UnsupportedOperationType(String),

    // ========== Wallet Errors ==========
    /// Wallet does not exist.
    #[error("wallet {0} not found")]
    WalletNotFound(String),

    /// Neither transfer wallet exists.
    #[error("wallets not found")]
    WalletsNotFound,

    /// Source balance is lower than the transfer amount.
    #[error("not enough money in wallet {wallet}")]
    InsufficientFunds {
        /// Wallet that would go negative.
        wallet: String,
    },

    /// Credit would push the balance past the representable maximum.
    #[error("balance of wallet {wallet} would overflow")]
    BalanceOverflow {
        /// Wallet being credited.
        wallet: String,
    },

    // ========== Concurrency Errors ==========
    /// Waiting for a wallet lock exceeded the configured bound.
    #[error("timed out waiting for wallet lock during {operation} ({})", .wallets.join(", "))]
    LockTimeout {
        /// Operation that was waiting.
        operation: &'static str,
        /// Wallets involved.
        wallets: Vec<String>,
    },

    /// Store aborted the transaction because of a concurrent update.
    #[error("concurrent update conflict during {operation} ({}), please retry", .wallets.join(", "))]
    Conflict {
        /// Operation that was aborted.
        operation: &'static str,
        /// Wallets involved.
        wallets: Vec<String>,
    },

    // ========== Storage Errors ==========
    /// Infrastructure failure in the backing store.
    #[error("storage failure during {operation} ({})", .wallets.join(", "))]
    Storage {
        /// Operation that failed.
        operation: &'static str,
        /// Wallets involved.
        wallets: Vec<String>,
        /// Underlying store failure, for logs only.
        #[source]
        source: StoreError,
    },
}

impl LedgerError {
    /// Wraps a store failure with the operation and wallets it affected.
    #[must_use]
    pub fn from_store(operation: &'static str, wallets: &[&str], err: StoreError) -> Self {
        let wallets = wallets.iter().map(ToString::to_string).collect();
        match err {
            StoreError::Conflict(_) => Self::Conflict { operation, wallets },
            StoreError::LockTimeout(_) => Self::LockTimeout { operation, wallets },
            StoreError::Backend(_) => Self::Storage {
                operation,
                wallets,
                source: err,
            },
        }
    }

    /// Returns the severity class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyWalletName
            | Self::EmptyWalletFrom
            | Self::EmptyWalletTo
            | Self::WalletNameTooLong { .. }
            | Self::ReservedWalletName(_)
            | Self::SameWallets
            | Self::NonPositiveAmount
            | Self::AmountTooLarge
            | Self::NegativeStartDate
            | Self::NegativeEndDate
            | Self::InvalidDateRange { .. }
            | Self::LimitOutOfRange { .. }
            | Self::NegativeOffset
            | Self::UnsupportedOperationType(_) => ErrorClass::BadRequest,

            Self::WalletNotFound(_) | Self::WalletsNotFound => ErrorClass::NotFound,

            Self::InsufficientFunds { .. }
            | Self::BalanceOverflow { .. }
            | Self::LockTimeout { .. }
            | Self::Conflict { .. } => ErrorClass::Conflict,

            Self::Storage { .. } => ErrorClass::Internal,
        }
    }

    /// Returns true if the error was raised before any storage access.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.class(), ErrorClass::BadRequest)
    }

    /// Returns true if running the whole transaction again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InsufficientFunds { .. } | LedgerError::BalanceOverflow { .. } => {
                Self::BusinessRule(message)
            }
            LedgerError::LockTimeout { .. } | LedgerError::Conflict { .. } => {
                Self::Conflict(message)
            }
            LedgerError::Storage { .. } => Self::Database(message),
            LedgerError::WalletNotFound(_) | LedgerError::WalletsNotFound => {
                Self::NotFound(message)
            }
            _ => Self::Validation(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes() {
        assert_eq!(LedgerError::SameWallets.class(), ErrorClass::BadRequest);
        assert_eq!(
            LedgerError::UnsupportedOperationType("x".into()).class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            LedgerError::WalletNotFound("a".into()).class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            LedgerError::InsufficientFunds { wallet: "a".into() }.class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            LedgerError::from_store("transfer", &["a"], StoreError::Backend("boom".into())).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_from_store_classifies_failures() {
        let err = LedgerError::from_store("transfer", &["a", "b"], StoreError::Conflict("40001".into()));
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "concurrent update conflict during transfer (a, b), please retry"
        );

        let err = LedgerError::from_store("deposit", &["a"], StoreError::LockTimeout("55P03".into()));
        assert!(matches!(err, LedgerError::LockTimeout { operation: "deposit", .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_storage_message_hides_backend_detail() {
        let err = LedgerError::from_store(
            "transfer",
            &["a", "b"],
            StoreError::Backend("password authentication failed for user".into()),
        );
        assert_eq!(err.to_string(), "storage failure during transfer (a, b)");

        let app: AppError = err.into();
        assert_eq!(app.status_code(), 500);
        assert!(!app.message().contains("password"));
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = LedgerError::InsufficientFunds { wallet: "a".into() }.into();
        assert_eq!(app, AppError::BusinessRule("not enough money in wallet a".into()));
        assert_eq!(app.status_code(), 422);

        let app: AppError = LedgerError::WalletNotFound("b".into()).into();
        assert_eq!(app.status_code(), 404);

        let app: AppError = LedgerError::EmptyWalletName.into();
        assert_eq!(app, AppError::Validation("empty wallet name".into()));

        let app: AppError = LedgerError::LockTimeout {
            operation: "transfer",
            wallets: vec!["a".into()],
        }
        .into();
        assert_eq!(app.status_code(), 409);
    }

    #[test]
    fn test_validation_flag() {
        assert!(LedgerError::NonPositiveAmount.is_validation());
        assert!(LedgerError::LimitOutOfRange { max: 1000 }.is_validation());
        assert!(!LedgerError::WalletsNotFound.is_validation());
    }
}
