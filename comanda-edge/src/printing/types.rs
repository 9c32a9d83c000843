//! Print job types

use serde::{Deserialize, Serialize};
use shared::models::{LineItem, OrderAggregate, PrinterPurpose, TableSummaryAggregate};

/// A cancelled item, printed on the kitchen printer so the cook stops it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationTicket {
    pub table_number: u32,
    pub waiter_name: String,
    pub item: LineItem,
    #[serde(default)]
    pub reason: Option<String>,
    /// Unix milliseconds
    pub cancelled_at: i64,
}

/// What to print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintJob {
    Order(OrderAggregate),
    TableSummary(TableSummaryAggregate),
    /// Kitchen copy of an order, filtered by category
    KitchenTicket(OrderAggregate),
    Cancellation(CancellationTicket),
    TestPage,
}

impl PrintJob {
    pub fn kind(&self) -> &'static str {
        match self {
            PrintJob::Order(_) => "order",
            PrintJob::TableSummary(_) => "table_summary",
            PrintJob::KitchenTicket(_) => "kitchen_ticket",
            PrintJob::Cancellation(_) => "cancellation",
            PrintJob::TestPage => "test_page",
        }
    }
}

/// Result of a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintOutcome {
    pub printer_id: String,
    pub printer_name: String,
    pub purpose: PrinterPurpose,
    pub device_path: String,
    /// 0 when nothing had to be printed
    pub bytes_written: usize,
    pub message: String,
}

impl PrintOutcome {
    pub fn printed(&self) -> bool {
        self.bytes_written > 0
    }
}

/// Result of a connection test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub printer_id: String,
    pub connected: bool,
    pub device_path: Option<String>,
    pub message: String,
}
