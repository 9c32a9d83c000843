//! Print dispatcher
//!
//! Picks the connected printer for a purpose, resolves its device node,
//! renders the ticket and hands the bytes to the device writer. Counters are
//! only touched after the writer confirms the write.

use comanda_printer::{
    DeviceProbe, DevicePrinter, DeviceResolver, DeviceRole, DeviceWriter, EscPosBuilder, FsProbe,
    RECEIPT_WIDTH, TextEncoding,
};
use shared::models::{OrderAggregate, PrinterProfile, PrinterPurpose, TableSummaryAggregate};
use shared::util::now_millis;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::registry::{PrinterRegistry, RegistryError};
use super::renderer::{ReceiptRenderer, RenderError};
use super::types::{CancellationTicket, ConnectionReport, PrintJob, PrintOutcome};
use crate::core::Config;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No {0} printer connected")]
    NoPrinterConnected(PrinterPurpose),

    #[error("Device path not found for printer '{0}'")]
    DevicePathUnresolved(String),

    #[error("Failed to write to {path}: {reason}")]
    DeviceWriteFailed { path: String, reason: String },

    #[error("Malformed aggregate: {0}")]
    MalformedAggregate(String),

    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    #[error("Printer storage error: {0}")]
    Storage(String),
}

impl From<RenderError> for DispatchError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Malformed(e) => DispatchError::MalformedAggregate(e.to_string()),
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => DispatchError::PrinterNotFound(id),
            other => DispatchError::Storage(other.to_string()),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Dispatcher wired to the real filesystem and device nodes
pub type DevicePrintDispatcher = PrintDispatcher<FsProbe, DevicePrinter>;

pub struct PrintDispatcher<P, W> {
    registry: Arc<PrinterRegistry>,
    resolver: DeviceResolver<P>,
    writer: W,
    renderer: ReceiptRenderer,
    encoding: TextEncoding,
}

impl DevicePrintDispatcher {
    /// Production wiring from configuration
    pub fn from_config(config: &Config, registry: Arc<PrinterRegistry>) -> Self {
        let resolver = DeviceResolver::new(FsProbe)
            .with_candidates(config.device_candidates.clone())
            .with_role_heuristic(config.role_heuristic);
        let writer = DevicePrinter::new().with_timeout(config.write_timeout);
        let renderer = ReceiptRenderer::new(RECEIPT_WIDTH, config.timezone)
            .with_kitchen_categories(config.kitchen_categories.clone());

        Self::new(registry, resolver, writer, renderer).with_encoding(config.text_encoding)
    }
}

impl<P: DeviceProbe, W: DeviceWriter> PrintDispatcher<P, W> {
    pub fn new(
        registry: Arc<PrinterRegistry>,
        resolver: DeviceResolver<P>,
        writer: W,
        renderer: ReceiptRenderer,
    ) -> Self {
        Self {
            registry,
            resolver,
            writer,
            renderer,
            encoding: TextEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn registry(&self) -> &Arc<PrinterRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &DeviceResolver<P> {
        &self.resolver
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn renderer(&self) -> &ReceiptRenderer {
        &self.renderer
    }

    /// Existing candidate device nodes, for the operator's setup screen
    pub fn available_paths(&self) -> Vec<String> {
        self.resolver
            .available_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    }

    /// Render only, no printer involved
    pub fn render(&self, job: &PrintJob) -> DispatchResult<Vec<u8>> {
        let profile =
            PrinterProfile::new("preview", "preview", PrinterPurpose::Reception, "0", "0");
        Ok(self
            .render_job(&profile, job)?
            .map(|b| b.build(self.encoding))
            .unwrap_or_default())
    }

    /// Print `job` on the first connected printer for `purpose`
    #[instrument(skip(self, job), fields(job = job.kind()))]
    pub async fn dispatch(
        &self,
        purpose: PrinterPurpose,
        job: &PrintJob,
    ) -> DispatchResult<PrintOutcome> {
        let profile = self
            .registry
            .find_connected(purpose)
            .ok_or(DispatchError::NoPrinterConnected(purpose))?;
        self.print_on(&profile, job).await
    }

    pub async fn print_order(
        &self,
        order: &OrderAggregate,
        purpose: PrinterPurpose,
    ) -> DispatchResult<PrintOutcome> {
        self.dispatch(purpose, &PrintJob::Order(order.clone())).await
    }

    pub async fn print_table_summary(
        &self,
        summary: &TableSummaryAggregate,
    ) -> DispatchResult<PrintOutcome> {
        self.dispatch(PrinterPurpose::Reception, &PrintJob::TableSummary(summary.clone()))
            .await
    }

    /// Succeeds without printing when the order has no kitchen items
    pub async fn print_kitchen_ticket(
        &self,
        order: &OrderAggregate,
    ) -> DispatchResult<PrintOutcome> {
        self.dispatch(PrinterPurpose::Kitchen, &PrintJob::KitchenTicket(order.clone()))
            .await
    }

    pub async fn print_cancellation(
        &self,
        ticket: &CancellationTicket,
    ) -> DispatchResult<PrintOutcome> {
        self.dispatch(PrinterPurpose::Kitchen, &PrintJob::Cancellation(ticket.clone()))
            .await
    }

    /// Print a test page on a specific printer, connected or not
    #[instrument(skip(self))]
    pub async fn print_test_page(&self, printer_id: &str) -> DispatchResult<PrintOutcome> {
        let profile = self
            .registry
            .get(printer_id)
            .ok_or_else(|| DispatchError::PrinterNotFound(printer_id.to_string()))?;
        self.print_on(&profile, &PrintJob::TestPage).await
    }

    /// Check that a printer is reachable and record the result on its profile
    #[instrument(skip(self))]
    pub fn test_connection(&self, printer_id: &str) -> DispatchResult<ConnectionReport> {
        let profile = self
            .registry
            .get(printer_id)
            .ok_or_else(|| DispatchError::PrinterNotFound(printer_id.to_string()))?;

        if let Some(message) = usb_absent(&profile) {
            let updated = self.registry.set_connection(&profile.id, false, None)?;
            return Ok(report(&updated, false, message));
        }

        let Some(path) = self.resolve_path(&profile) else {
            warn!(printer = %profile.name, "No device node found");
            let updated = self.registry.set_connection(&profile.id, false, None)?;
            return Ok(report(
                &updated,
                false,
                "Printer not found. Check that it is plugged in and powered on.".to_string(),
            ));
        };
        let path_str = path.display().to_string();

        if !self.resolver.probe().can_open(&path) {
            warn!(printer = %profile.name, path = %path_str, "Device node not writable");
            let updated = self
                .registry
                .set_connection(&profile.id, false, Some(&path_str))?;
            return Ok(report(
                &updated,
                false,
                format!(
                    "Printer found at {} but it cannot be opened (permission denied or busy)",
                    path_str
                ),
            ));
        }

        let updated = self
            .registry
            .set_connection(&profile.id, true, Some(&path_str))?;
        info!(printer = %profile.name, path = %path_str, "Printer connected");
        Ok(report(
            &updated,
            true,
            format!("Printer connected at {}", path_str),
        ))
    }

    async fn print_on(
        &self,
        profile: &PrinterProfile,
        job: &PrintJob,
    ) -> DispatchResult<PrintOutcome> {
        // An empty kitchen ticket succeeds without touching the device.
        let Some(ticket) = self.render_job(profile, job)? else {
            info!(printer = %profile.name, "Nothing to print");
            return Ok(PrintOutcome {
                printer_id: profile.id.clone(),
                printer_name: profile.name.clone(),
                purpose: profile.purpose,
                device_path: profile.device_path.clone().unwrap_or_default(),
                bytes_written: 0,
                message: "No kitchen items to print".to_string(),
            });
        };

        let path = self
            .resolve_path(profile)
            .ok_or_else(|| DispatchError::DevicePathUnresolved(profile.name.clone()))?;
        let path_str = path.display().to_string();
        let data = ticket.build(self.encoding);

        if let Err(e) = self.writer.write(&path, &data).await {
            error!(printer = %profile.name, path = %path_str, error = %e, "Print failed");
            return Err(DispatchError::DeviceWriteFailed {
                path: path_str,
                reason: e.to_string(),
            });
        }

        info!(
            printer = %profile.name,
            path = %path_str,
            bytes = data.len(),
            "Ticket printed"
        );

        // The paper is already out; a failed counter update must not turn
        // this into a print error.
        if let Err(e) = self.registry.record_print(&profile.id, &path_str, now_millis()) {
            error!(printer_id = %profile.id, error = %e, "Failed to update print counters");
        }

        Ok(PrintOutcome {
            printer_id: profile.id.clone(),
            printer_name: profile.name.clone(),
            purpose: profile.purpose,
            device_path: path_str,
            bytes_written: data.len(),
            message: format!("Printed on {}", profile.name),
        })
    }

    fn resolve_path(&self, profile: &PrinterProfile) -> Option<PathBuf> {
        let configured = profile.device_path.as_deref().map(Path::new);
        self.resolver.resolve(configured, role_for(profile.purpose))
    }

    fn render_job(
        &self,
        profile: &PrinterProfile,
        job: &PrintJob,
    ) -> DispatchResult<Option<EscPosBuilder>> {
        let ticket = match job {
            PrintJob::Order(order) => Some(self.renderer.render_order(order)?),
            PrintJob::TableSummary(summary) => Some(self.renderer.render_table_summary(summary)?),
            PrintJob::KitchenTicket(order) => self.renderer.render_kitchen_ticket(order)?,
            PrintJob::Cancellation(ticket) => Some(self.renderer.render_cancellation(ticket)?),
            PrintJob::TestPage => Some(self.renderer.render_test_page(profile, now_millis())),
        };
        Ok(ticket)
    }
}

fn role_for(purpose: PrinterPurpose) -> DeviceRole {
    match purpose {
        PrinterPurpose::Kitchen => DeviceRole::Kitchen,
        PrinterPurpose::Reception => DeviceRole::Reception,
    }
}

fn report(profile: &PrinterProfile, connected: bool, message: String) -> ConnectionReport {
    ConnectionReport {
        printer_id: profile.id.clone(),
        connected,
        device_path: profile.device_path.clone(),
        message,
    }
}

/// `Some(message)` when the profile's USB ids are not on the bus
#[cfg(feature = "usb")]
fn usb_absent(profile: &PrinterProfile) -> Option<String> {
    let (vid, pid) = match profile.usb_ids() {
        Ok(ids) => ids,
        Err(e) => return Some(e.to_string()),
    };
    match comanda_printer::usb::is_present(vid, pid) {
        Ok(true) => None,
        Ok(false) => Some(format!(
            "USB device {:04x}:{:04x} not detected",
            vid, pid
        )),
        Err(e) => {
            // Enumeration can fail without udev access; fall back to the device node check
            warn!(error = %e, "USB enumeration failed");
            None
        }
    }
}

#[cfg(not(feature = "usb"))]
fn usb_absent(_profile: &PrinterProfile) -> Option<String> {
    None
}
