//! # comanda-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command encoding and a typed instruction builder
//! - Single-byte code page text encoding (Latin-1 / Windows-1252)
//! - USB line printer device resolution (`/dev/usb/lpN`, `/dev/lpN`)
//! - Serialized, time-bounded raw writes to device nodes
//! - USB enumeration (optional, `usb` feature)
//!
//! Business logic (WHAT to print) stays in application code:
//! - Order / table summary / kitchen ticket rendering → comanda-edge
//!
//! ## Example
//!
//! ```ignore
//! use comanda_printer::{DevicePrinter, DeviceResolver, DeviceRole, DeviceWriter, EscPosBuilder,
//!     FsProbe, TextEncoding, RECEIPT_WIDTH};
//!
//! let mut b = EscPosBuilder::new(RECEIPT_WIDTH);
//! b.center().bold().double_size().line("PEDIDO");
//! b.bold_off().reset_size().sep_single();
//! b.left().line("Mesa: 12");
//! b.feed(3).cut();
//!
//! let resolver = DeviceResolver::new(FsProbe);
//! let path = resolver.resolve(None, DeviceRole::Kitchen).expect("no printer");
//! DevicePrinter::new().write(&path, &b.build(TextEncoding::Latin1)).await?;
//! ```

mod device;
mod encoding;
mod error;
mod escpos;
mod printer;

#[cfg(feature = "usb")]
pub mod usb;

// Re-exports
pub use device::{
    DEFAULT_DEVICE_CANDIDATES, DeviceProbe, DeviceResolver, DeviceRole, FsProbe, MemoryProbe,
};
pub use encoding::{TextEncoding, encode_text, encoded_width, pad_to_width, truncate_to_width};
pub use error::{PrintError, PrintResult};
pub use escpos::{Align, EscPosBuilder, Instruction, RECEIPT_WIDTH, TextSize};
pub use printer::{DEFAULT_WRITE_TIMEOUT, DevicePrinter, DeviceWriter};

/// Raw ESC/POS command encoders
pub mod command {
    pub use crate::escpos::{align, bold, cut, init, rule_line, select_code_page, size};
}
