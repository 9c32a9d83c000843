//! Printer library errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    /// Open or write on the device node failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The device node does not exist (printer unplugged)
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Lock wait plus write exceeded the deadline
    #[error("Write timed out on {0}")]
    Timeout(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[cfg(feature = "usb")]
    #[error("USB enumeration failed: {0}")]
    Usb(String),
}

pub type PrintResult<T> = Result<T, PrintError>;
