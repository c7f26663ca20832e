//! `SeaORM` active enums mapped to Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use wallets_core::ledger::OperationType as LedgerOperationType;

/// Postgres `operation_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "operation_type")]
pub enum OperationType {
    /// Balance increased.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Balance decreased.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
}

impl From<LedgerOperationType> for OperationType {
    fn from(value: LedgerOperationType) -> Self {
        match value {
            LedgerOperationType::Deposit => Self::Deposit,
            LedgerOperationType::Withdrawal => Self::Withdrawal,
        }
    }
}

impl From<OperationType> for LedgerOperationType {
    fn from(value: OperationType) -> Self {
        match value {
            OperationType::Deposit => Self::Deposit,
            OperationType::Withdrawal => Self::Withdrawal,
        }
    }
}
