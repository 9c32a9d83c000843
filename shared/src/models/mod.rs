//! Data models
//!
//! Shared between the print core and the order subsystem that feeds it.
//! Timestamps are Unix milliseconds, money is `rust_decimal::Decimal`.

pub mod order;
pub mod printer_profile;

// Re-exports
pub use order::*;
pub use printer_profile::*;
