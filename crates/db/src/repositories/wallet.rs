//! Wallet repository for database operations.

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::wallets;

/// Wallet repository.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a wallet with a zero balance unless the name is taken.
    ///
    /// Returns `true` if a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, name: &str) -> Result<bool, DbErr> {
        let wallet = wallets::ActiveModel {
            name: Set(name.to_string()),
            balance: Set(0),
            ..Default::default()
        };

        let inserted = wallets::Entity::insert(wallet)
            .on_conflict(
                OnConflict::column(wallets::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted > 0)
    }

    /// Finds a wallet by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<wallets::Model>, DbErr> {
        wallets::Entity::find()
            .filter(wallets::Column::Name.eq(name))
            .one(&self.db)
            .await
    }

    /// Locks the named wallets with `SELECT ... FOR UPDATE`.
    ///
    /// Rows are locked in ascending name order. Missing names are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the lock wait times out.
    pub async fn lock_for_update<C: ConnectionTrait>(
        conn: &C,
        names: &[String],
    ) -> Result<Vec<wallets::Model>, DbErr> {
        wallets::Entity::find()
            .filter(wallets::Column::Name.is_in(names.iter().cloned()))
            .order_by_asc(wallets::Column::Name)
            .lock_exclusive()
            .all(conn)
            .await
    }

    /// Adds `delta` to a balance unless the result would be negative.
    ///
    /// Returns `false` if no row matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn adjust_balance<C: ConnectionTrait>(
        conn: &C,
        name: &str,
        delta: i64,
    ) -> Result<bool, DbErr> {
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(delta),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(wallets::Column::Name.eq(name))
            .filter(wallets::Column::Balance.gte(delta.saturating_neg()))
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
