//! # comanda-edge
//!
//! Restaurant print service: turns orders and table aggregates into ESC/POS
//! tickets and sends them to the USB thermal printer configured for each
//! purpose (kitchen or reception).
//!
//! ## Modules
//!
//! - [`core`] - configuration from the environment
//! - [`printing`] - consolidation, rendering, printer registry and dispatch
//! - [`utils`] - logging, money and time formatting

pub mod core;
pub mod printing;
pub mod utils;

pub use crate::core::{Config, ConfigError};
pub use printing::{
    DevicePrintDispatcher, DispatchError, PrintDispatcher, PrinterRegistry, ProfileStorage,
    ReceiptRenderer,
};

/// Load `.env` (if any) and initialise logging from the resulting configuration
pub fn setup_environment() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    let config = Config::try_from_env()?;
    utils::init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    Ok(config)
}
