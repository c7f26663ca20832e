//! `SeaORM` entity definitions.

pub mod operations;
pub mod sea_orm_active_enums;
pub mod wallets;
