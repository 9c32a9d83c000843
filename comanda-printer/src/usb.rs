//! USB enumeration (best-effort presence check)
//!
//! Confirms that a printer with the configured vendor/product id is on the
//! bus. It cannot tell which `/dev/usb/lpN` node belongs to it.

use crate::error::{PrintError, PrintResult};
use nusb::MaybeFuture;
use tracing::debug;

/// One device seen on the USB bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
}

impl UsbDeviceInfo {
    /// "0x0483:0x070b"
    pub fn id_string(&self) -> String {
        format!("0x{:04x}:0x{:04x}", self.vendor_id, self.product_id)
    }
}

/// List every device on the USB bus
pub fn list_devices() -> PrintResult<Vec<UsbDeviceInfo>> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| PrintError::Usb(e.to_string()))?;

    Ok(devices
        .map(|dev| UsbDeviceInfo {
            vendor_id: dev.vendor_id(),
            product_id: dev.product_id(),
            manufacturer: dev.manufacturer_string().map(|s| s.to_string()),
            product: dev.product_string().map(|s| s.to_string()),
            serial: dev.serial_number().map(|s| s.to_string()),
        })
        .collect())
}

/// Whether a device with these ids is currently attached
pub fn is_present(vendor_id: u16, product_id: u16) -> PrintResult<bool> {
    let found = list_devices()?
        .iter()
        .any(|d| d.vendor_id == vendor_id && d.product_id == product_id);
    debug!(
        vendor_id = format!("0x{:04x}", vendor_id),
        product_id = format!("0x{:04x}", product_id),
        found,
        "USB presence check"
    );
    Ok(found)
}
