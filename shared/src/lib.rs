//! Shared types for Comanda
//!
//! Data models exchanged between the order subsystem and the printing core:
//! printer profiles, order aggregates and table summaries.

pub mod models;
pub mod util;
pub mod validation;

// Re-exports
pub use serde::{Deserialize, Serialize};
pub use validation::{ValidationError, ValidationResult};
