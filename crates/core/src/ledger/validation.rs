//! Validation layer for inbound ledger requests.
//!
//! Every check here is pure. A request that fails validation never reaches
//! the coordinator, so it never opens a transaction or touches storage.

use rust_decimal::Decimal;
use wallets_shared::types::{PageRequest, pagination::MAX_LIMIT, to_minor_units};

use super::error::LedgerError;
use super::types::{
    DepositRequest, MAX_WALLET_NAME_LEN, OperationType, OperationsFilter, SYSTEM_WALLET,
    TransferRequest,
};

/// A deposit that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    /// Target wallet.
    pub wallet: String,
    /// Amount in minor units, positive.
    pub amount: i64,
}

/// A transfer that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Wallet to debit.
    pub from: String,
    /// Wallet to credit, never equal to `from`.
    pub to: String,
    /// Amount in minor units, positive.
    pub amount: i64,
}

/// A history filter that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationsQuery {
    /// Wallet whose entries are returned.
    pub wallet: String,
    /// Only entries of this kind, if set.
    pub operation_type: Option<OperationType>,
    /// Inclusive lower bound, epoch seconds.
    pub start: Option<i64>,
    /// Inclusive upper bound, epoch seconds. Covers the whole second.
    pub end: Option<i64>,
    /// Window applied after ordering.
    pub page: PageRequest,
}

/// Checks a wallet name used to look up an existing wallet.
///
/// # Errors
///
/// Returns `EmptyWalletName` or `WalletNameTooLong`.
pub fn validate_wallet_name(name: &str) -> Result<(), LedgerError> {
    if name.is_empty() {
        return Err(LedgerError::EmptyWalletName);
    }
    if name.chars().count() > MAX_WALLET_NAME_LEN {
        return Err(LedgerError::WalletNameTooLong {
            max: MAX_WALLET_NAME_LEN,
        });
    }
    Ok(())
}

/// Checks the name of a wallet about to be created.
///
/// # Errors
///
/// Returns the errors of [`validate_wallet_name`], or `ReservedWalletName`
/// for the system counterparty name.
pub fn validate_new_wallet_name(name: &str) -> Result<(), LedgerError> {
    validate_wallet_name(name)?;
    if name == SYSTEM_WALLET {
        return Err(LedgerError::ReservedWalletName(name.to_string()));
    }
    Ok(())
}

/// Converts a decimal amount and checks it is positive in minor units.
///
/// Truncation happens first, so `0.009` is rejected.
///
/// # Errors
///
/// Returns `NonPositiveAmount` or `AmountTooLarge`.
pub fn validate_amount(amount: Decimal) -> Result<i64, LedgerError> {
    let units = to_minor_units(amount).ok_or(LedgerError::AmountTooLarge)?;
    if units <= 0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    Ok(units)
}

/// Validates a deposit request.
///
/// # Errors
///
/// Returns a validation error describing the first rejected field.
pub fn validate_deposit(request: &DepositRequest) -> Result<Deposit, LedgerError> {
    validate_wallet_name(&request.wallet)?;
    let amount = validate_amount(request.amount)?;
    Ok(Deposit {
        wallet: request.wallet.clone(),
        amount,
    })
}

/// Validates a transfer request.
///
/// # Errors
///
/// Returns a validation error describing the first rejected field.
pub fn validate_transfer(request: &TransferRequest) -> Result<Transfer, LedgerError> {
    if request.wallet_from.is_empty() {
        return Err(LedgerError::EmptyWalletFrom);
    }
    if request.wallet_to.is_empty() {
        return Err(LedgerError::EmptyWalletTo);
    }
    validate_wallet_name(&request.wallet_from)?;
    validate_wallet_name(&request.wallet_to)?;
    if request.wallet_from == request.wallet_to {
        return Err(LedgerError::SameWallets);
    }
    let amount = validate_amount(request.amount)?;

    Ok(Transfer {
        from: request.wallet_from.clone(),
        to: request.wallet_to.clone(),
        amount,
    })
}

/// Validates a history filter and applies pagination defaults.
///
/// # Errors
///
/// Returns a validation error, or `UnsupportedOperationType` for an unknown
/// `type`.
pub fn validate_filter(filter: &OperationsFilter) -> Result<OperationsQuery, LedgerError> {
    validate_wallet_name(&filter.wallet)?;

    if filter.start_date.is_some_and(|s| s < 0) {
        return Err(LedgerError::NegativeStartDate);
    }
    if filter.end_date.is_some_and(|e| e < 0) {
        return Err(LedgerError::NegativeEndDate);
    }
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date)
        && start > end
    {
        return Err(LedgerError::InvalidDateRange { start, end });
    }

    let operation_type = filter
        .operation_type
        .as_deref()
        .map(str::parse::<OperationType>)
        .transpose()?;

    let limit = match filter.limit {
        Some(l) => Some(u64::try_from(l).map_err(|_| LedgerError::LimitOutOfRange { max: MAX_LIMIT })?),
        None => None,
    };
    let offset = match filter.offset {
        Some(o) => Some(u64::try_from(o).map_err(|_| LedgerError::NegativeOffset)?),
        None => None,
    };
    let page = PageRequest::bounded(limit, offset)
        .ok_or(LedgerError::LimitOutOfRange { max: MAX_LIMIT })?;

    Ok(OperationsQuery {
        wallet: filter.wallet.clone(),
        operation_type,
        start: filter.start_date,
        end: filter.end_date,
        page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn transfer(from: &str, to: &str, amount: Decimal) -> TransferRequest {
        TransferRequest {
            wallet_from: from.to_string(),
            wallet_to: to.to_string(),
            amount,
        }
    }

    fn filter(wallet: &str) -> OperationsFilter {
        OperationsFilter {
            wallet: wallet.to_string(),
            ..OperationsFilter::default()
        }
    }

    #[test]
    fn test_wallet_name_rules() {
        assert!(validate_wallet_name("alice").is_ok());
        assert!(matches!(validate_wallet_name(""), Err(LedgerError::EmptyWalletName)));

        let long = "x".repeat(MAX_WALLET_NAME_LEN + 1);
        assert!(matches!(
            validate_wallet_name(&long),
            Err(LedgerError::WalletNameTooLong { max: 255 })
        ));
        assert!(validate_wallet_name(&"x".repeat(MAX_WALLET_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_system_name_is_reserved_for_creation_only() {
        assert!(matches!(
            validate_new_wallet_name("system"),
            Err(LedgerError::ReservedWalletName(_))
        ));
        assert!(validate_wallet_name("system").is_ok());
        assert!(validate_new_wallet_name("System").is_ok());
    }

    #[rstest]
    #[case::whole(dec!(10), 1000)]
    #[case::cents(dec!(0.01), 1)]
    #[case::truncated(dec!(10.999), 1099)]
    fn test_valid_amounts(#[case] amount: Decimal, #[case] expected: i64) {
        assert_eq!(validate_amount(amount).unwrap(), expected);
    }

    #[rstest]
    #[case::zero(dec!(0))]
    #[case::negative(dec!(-5))]
    #[case::below_one_cent(dec!(0.009))]
    fn test_non_positive_amounts(#[case] amount: Decimal) {
        assert!(matches!(validate_amount(amount), Err(LedgerError::NonPositiveAmount)));
    }

    #[test]
    fn test_amount_too_large() {
        assert!(matches!(validate_amount(Decimal::MAX), Err(LedgerError::AmountTooLarge)));
    }

    #[test]
    fn test_validate_deposit() {
        let deposit = validate_deposit(&DepositRequest {
            wallet: "alice".into(),
            amount: dec!(12.34),
        })
        .unwrap();
        assert_eq!(deposit, Deposit { wallet: "alice".into(), amount: 1234 });

        let err = validate_deposit(&DepositRequest {
            wallet: String::new(),
            amount: dec!(1),
        })
        .unwrap_err();
        assert!(matches!(err, LedgerError::EmptyWalletName));
    }

    #[rstest]
    #[case::empty_from("", "b", dec!(1))]
    #[case::empty_to("a", "", dec!(1))]
    #[case::same("a", "a", dec!(1))]
    #[case::zero("a", "b", dec!(0))]
    fn test_transfer_rejections(#[case] from: &str, #[case] to: &str, #[case] amount: Decimal) {
        let err = validate_transfer(&transfer(from, to, amount)).unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err}");
    }

    #[test]
    fn test_transfer_error_order() {
        let err = validate_transfer(&transfer("", "", dec!(0))).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyWalletFrom));

        let err = validate_transfer(&transfer("a", "a", dec!(0))).unwrap_err();
        assert!(matches!(err, LedgerError::SameWallets));
    }

    #[test]
    fn test_validate_transfer() {
        let t = validate_transfer(&transfer("a", "b", dec!(5.5))).unwrap();
        assert_eq!(t, Transfer { from: "a".into(), to: "b".into(), amount: 550 });
    }

    #[test]
    fn test_filter_defaults() {
        let q = validate_filter(&filter("alice")).unwrap();
        assert_eq!(q.wallet, "alice");
        assert_eq!(q.operation_type, None);
        assert_eq!(q.page, PageRequest::default());
    }

    #[test]
    fn test_filter_full() {
        let q = validate_filter(&OperationsFilter {
            wallet: "alice".into(),
            operation_type: Some("withdrawal".into()),
            start_date: Some(100),
            end_date: Some(100),
            limit: Some(1000),
            offset: Some(7),
        })
        .unwrap();
        assert_eq!(q.operation_type, Some(OperationType::Withdrawal));
        assert_eq!((q.start, q.end), (Some(100), Some(100)));
        assert_eq!(q.page, PageRequest { limit: 1000, offset: 7 });
    }

    #[rstest]
    #[case::no_wallet(OperationsFilter::default())]
    #[case::negative_start(OperationsFilter { start_date: Some(-1), ..filter("a") })]
    #[case::negative_end(OperationsFilter { end_date: Some(-1), ..filter("a") })]
    #[case::inverted(OperationsFilter { start_date: Some(10), end_date: Some(9), ..filter("a") })]
    #[case::zero_limit(OperationsFilter { limit: Some(0), ..filter("a") })]
    #[case::negative_limit(OperationsFilter { limit: Some(-3), ..filter("a") })]
    #[case::huge_limit(OperationsFilter { limit: Some(1001), ..filter("a") })]
    #[case::negative_offset(OperationsFilter { offset: Some(-1), ..filter("a") })]
    fn test_filter_rejections(#[case] input: OperationsFilter) {
        let err = validate_filter(&input).unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err}");
    }

    #[test]
    fn test_filter_unknown_type() {
        let err = validate_filter(&OperationsFilter {
            operation_type: Some("refund".into()),
            ..filter("a")
        })
        .unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedOperationType(t) if t == "refund"));
    }
}
