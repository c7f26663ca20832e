//! Initial database migration.
//!
//! Creates the wallet and operation tables, the operation type enum, and the
//! trigger that keeps the operation log append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(OPERATIONS_SQL).await?;

        // ============================================================
        // PART 3: TRIGGERS
        // ============================================================
        db.execute_unprepared(APPEND_ONLY_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE operation_type AS ENUM ('deposit', 'withdrawal');
";

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id          BIGSERIAL PRIMARY KEY,
    name        VARCHAR(255) NOT NULL UNIQUE,
    balance     BIGINT NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_wallets_name_not_empty CHECK (name <> ''),
    CONSTRAINT chk_wallets_balance_non_negative CHECK (balance >= 0)
);
";

const OPERATIONS_SQL: &str = r"
CREATE TABLE operations (
    id            BIGSERIAL PRIMARY KEY,
    wallet        VARCHAR(255) NOT NULL REFERENCES wallets(name),
    type          operation_type NOT NULL,
    amount        BIGINT NOT NULL,
    other_wallet  VARCHAR(255) NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_operations_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_operations_wallet_created ON operations(wallet, created_at, id);
";

const APPEND_ONLY_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_operation_modification
-- Operations are immutable once written
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_operation_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'operations are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_operation_mod
BEFORE UPDATE OR DELETE ON operations
FOR EACH ROW
EXECUTE FUNCTION prevent_operation_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_prevent_operation_mod ON operations;
DROP FUNCTION IF EXISTS prevent_operation_modification();

DROP TABLE IF EXISTS operations CASCADE;
DROP TABLE IF EXISTS wallets CASCADE;

DROP TYPE IF EXISTS operation_type CASCADE;
";
