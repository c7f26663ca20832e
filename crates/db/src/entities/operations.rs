//! `SeaORM` Entity for operations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::OperationType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub wallet: String,
    #[sea_orm(column_name = "type")]
    pub operation_type: OperationType,
    pub amount: i64,
    pub other_wallet: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::Wallet",
        to = "super::wallets::Column::Name"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for wallets_core::ledger::LedgerEntry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            wallet: model.wallet,
            operation_type: model.operation_type.into(),
            amount: model.amount,
            counterparty: model.other_wallet,
            created_at: model.created_at.to_utc(),
        }
    }
}
