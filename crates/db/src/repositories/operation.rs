//! Operation log repository.
//!
//! The `operations` table is append-only: this repository inserts and reads,
//! and a trigger rejects any `UPDATE` or `DELETE`.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use wallets_core::ledger::{NewLedgerEntry, OperationsQuery};

use crate::entities::{operations, sea_orm_active_enums::OperationType};

/// Operation repository.
#[derive(Debug, Clone)]
pub struct OperationRepository {
    db: DatabaseConnection,
}

impl OperationRepository {
    /// Creates a new operation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one entry. `created_at` is set by the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn append<C: ConnectionTrait>(conn: &C, entry: &NewLedgerEntry) -> Result<(), DbErr> {
        let operation = operations::ActiveModel {
            wallet: Set(entry.wallet.clone()),
            operation_type: Set(OperationType::from(entry.operation_type)),
            amount: Set(entry.amount),
            other_wallet: Set(entry.counterparty.clone()),
            ..Default::default()
        };

        operations::Entity::insert(operation)
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    /// Returns one wallet's operations, oldest first.
    ///
    /// The end bound covers its whole second: `created_at < end + 1s`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn query(&self, query: &OperationsQuery) -> Result<Vec<operations::Model>, DbErr> {
        let mut select = operations::Entity::find()
            .filter(operations::Column::Wallet.eq(query.wallet.as_str()));

        if let Some(operation_type) = query.operation_type {
            select = select.filter(operations::Column::OperationType.eq(OperationType::from(operation_type)));
        }
        if let Some(start) = query.start {
            // Past the representable range nothing can match.
            let Some(start) = DateTime::<Utc>::from_timestamp(start, 0) else {
                return Ok(Vec::new());
            };
            select = select.filter(operations::Column::CreatedAt.gte(start));
        }
        if let Some(end) = query
            .end
            .and_then(|end| end.checked_add(1))
            .and_then(|end| DateTime::<Utc>::from_timestamp(end, 0))
        {
            select = select.filter(operations::Column::CreatedAt.lt(end));
        }

        select
            .order_by_asc(operations::Column::CreatedAt)
            .order_by_asc(operations::Column::Id)
            .limit(query.page.limit)
            .offset(query.page.offset)
            .all(&self.db)
            .await
    }
}
