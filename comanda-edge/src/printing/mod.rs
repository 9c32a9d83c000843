//! Receipt printing
//!
//! - Consolidation: merges a table's orders into printed lines
//! - Rendering: orders, table summaries, kitchen and cancellation tickets
//! - Registry: printer profiles, persisted in redb
//! - Dispatch: printer selection, device resolution, serialized writes

pub mod consolidator;
pub mod dispatcher;
pub mod registry;
pub mod renderer;
pub mod storage;
pub mod types;

pub use consolidator::{ConsolidatedItem, Consolidation, consolidate};
pub use dispatcher::{DevicePrintDispatcher, DispatchError, DispatchResult, PrintDispatcher};
pub use registry::{PrinterRegistry, RegistryError, RegistryResult};
pub use renderer::{ReceiptRenderer, RenderError, RenderResult};
pub use storage::{ProfileStorage, ProfileStorageError, ProfileStorageResult};
pub use types::*;
