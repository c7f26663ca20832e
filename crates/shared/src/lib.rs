//! Shared types, errors, and configuration for the wallets service.
//!
//! This crate provides common types used across all other crates:
//! - Amount codec between decimal values and integer minor units
//! - Pagination bounds for history queries
//! - Application-wide error classes
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
