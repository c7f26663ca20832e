//! Common types used across the application.

pub mod money;
pub mod pagination;

pub use money::{MINOR_UNITS_PER_MAJOR, from_minor_units, to_minor_units};
pub use pagination::PageRequest;
