//! Receipt renderer
//!
//! Turns order and table aggregates into ESC/POS instruction lists for
//! 58mm thermal printers. Ticket text is Portuguese without accents so it
//! prints the same under any code page.

use chrono_tz::Tz;
use comanda_printer::{EscPosBuilder, RECEIPT_WIDTH, pad_to_width, truncate_to_width};
use rust_decimal::Decimal;
use shared::models::{LineItem, OrderAggregate, PrinterProfile, TableSummaryAggregate};
use shared::{ValidationError, ValidationResult};
use thiserror::Error;
use tracing::warn;

use super::consolidator::consolidate;
use super::types::CancellationTicket;
use crate::core::config::DEFAULT_KITCHEN_CATEGORIES;
use crate::utils::money::{format_brl, round_money};
use crate::utils::time::{DEFAULT_TIMEZONE, format_clock, format_timestamp};

/// Closing lines of the table summary
const SUMMARY_FOOTER: [&str; 2] = ["Obrigado pela preferencia!", "Volte sempre!"];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Malformed aggregate: {0}")]
    Malformed(#[from] ValidationError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Receipt renderer
#[derive(Debug, Clone)]
pub struct ReceiptRenderer {
    width: usize,
    timezone: Tz,
    kitchen_categories: Vec<String>,
}

impl ReceiptRenderer {
    /// Create a renderer with the given paper width (characters) and timezone
    pub fn new(width: usize, timezone: Tz) -> Self {
        Self {
            width,
            timezone,
            kitchen_categories: DEFAULT_KITCHEN_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// Categories that go on the kitchen ticket (matched case-insensitively)
    pub fn with_kitchen_categories(mut self, categories: Vec<String>) -> Self {
        self.kitchen_categories = categories;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn kitchen_categories(&self) -> &[String] {
        &self.kitchen_categories
    }

    /// Active item whose category is a kitchen category
    pub fn is_kitchen_item(&self, item: &LineItem) -> bool {
        !item.cancelled
            && item.category.as_deref().is_some_and(|category| {
                self.kitchen_categories
                    .iter()
                    .any(|k| k.trim().eq_ignore_ascii_case(category.trim()))
            })
    }

    /// Customer copy of a single order
    pub fn render_order(&self, order: &OrderAggregate) -> RenderResult<EscPosBuilder> {
        order.validate()?;

        let mut b = EscPosBuilder::new(self.width);

        b.center().bold().double_size().line("PEDIDO");
        b.bold_off().reset_size();
        b.sep_single();

        b.left();
        b.line(&format!("Mesa: {}", order.table_number));
        b.line(&format!("Garcom: {}", order.waiter_name));
        b.line(&format!("Data: {}", format_timestamp(order.created_at, self.timezone)));
        b.sep_single();

        b.line("ITENS:");
        b.sep_single();
        for item in order.active_items() {
            b.line(&format!("{}x {}", item.quantity, item.product_name));
            b.line(&format!("   {}", format_brl(item.unit_price)));
            if let Some(obs) = non_empty(item.observations.as_deref()) {
                b.line(&format!("   Obs: {}", obs));
            }
        }
        b.sep_single();

        b.line(&format!("Subtotal: {}", format_brl(order.subtotal)));
        b.line(&format!("Taxa Servico: {}", format_brl(order.service_charge)));
        b.bold().double_height();
        b.line(&format!("TOTAL: {}", format_brl(order.final_total)));
        b.reset_size().bold_off();
        b.sep_single();

        b.feed(3).cut();
        Ok(b)
    }

    /// Reception summary of every order of a table
    ///
    /// Prints the stored `current_total`; a mismatch with the consolidated
    /// lines plus service charges is only logged.
    pub fn render_table_summary(
        &self,
        summary: &TableSummaryAggregate,
    ) -> RenderResult<EscPosBuilder> {
        summary.validate()?;

        let consolidation = consolidate(&summary.orders)?;
        let service_total = summary
            .service_charge_total()
            .ok_or_else(|| ValidationError::invalid("service_charge", "amount out of range"))?;
        let order_count = summary.active_orders().count();

        let computed = consolidation
            .subtotal
            .checked_add(service_total)
            .map(round_money)
            .ok_or_else(|| ValidationError::invalid("orders", "amount out of range"))?;
        if computed != round_money(summary.current_total) {
            warn!(
                table = summary.table_number,
                computed = %computed,
                stored = %summary.current_total,
                "Table total does not match consolidated items"
            );
        }

        let mut b = EscPosBuilder::new(self.width);

        b.center().bold().double_size().line("RESUMO DA MESA");
        b.bold_off().reset_size();
        b.newline();
        b.sep_double();

        b.left().bold();
        b.line(&format!("Mesa: {}", summary.table_number));
        b.bold_off();
        match summary.waiter_names.as_slice() {
            [] => {}
            [one] => {
                b.line(&format!("Garcom: {}", one));
            }
            many => {
                b.line(&format!("Garcons: {}", many.join(", ")));
            }
        }
        if let Some(ts) = summary.started_at {
            b.line(&format!("Inicio: {}", format_timestamp(ts, self.timezone)));
        }
        if let Some(ts) = summary.ended_at {
            b.line(&format!("Fim: {}", format_timestamp(ts, self.timezone)));
        }
        b.newline();
        b.sep_double();

        b.bold().line("ITENS CONSUMIDOS:").bold_off();
        b.sep_single();
        for item in &consolidation.items {
            b.line(&format!("{}x {}", item.total_quantity, item.product_name));
            b.line(&format!(
                "   {} x {} = {}",
                format_brl(item.unit_price),
                item.total_quantity,
                format_brl(item.line_total)
            ));
        }
        b.newline();
        b.sep_double();

        b.right();
        b.line(&format!("Subtotal: {}", format_brl(consolidation.subtotal)));
        if service_total > Decimal::ZERO {
            b.line(&format!("Taxa Servico: {}", format_brl(service_total)));
        }
        b.sep_double();
        b.newline();

        b.center().bold().double_size();
        b.line(&format!("TOTAL: {}", format_brl(summary.current_total)));
        b.reset_size().bold_off();
        b.newline();
        b.left().sep_double();
        b.newline();

        b.center();
        b.line(&format!("Total de pedidos: {}", order_count));
        b.line(&format!("Total de itens: {}", consolidation.total_quantity));
        b.newline();
        for line in SUMMARY_FOOTER {
            b.line(line);
        }

        b.feed(3).cut();
        Ok(b)
    }

    /// Kitchen copy with kitchen-category items only; `None` when nothing qualifies
    pub fn render_kitchen_ticket(
        &self,
        order: &OrderAggregate,
    ) -> RenderResult<Option<EscPosBuilder>> {
        order.validate()?;

        let items: Vec<&LineItem> = order
            .items
            .iter()
            .filter(|item| self.is_kitchen_item(item))
            .collect();
        if items.is_empty() {
            return Ok(None);
        }

        let mut b = EscPosBuilder::new(self.width);

        b.center().double_size().bold().line("PEDIDO COZINHA");
        b.bold_off().reset_size();
        b.newline();
        b.sep_single();

        b.left();
        b.bold().line(&format!("Mesa: {}", order.table_number)).bold_off();
        b.line(&format!("Garcom: {}", order.waiter_name));
        b.line(&format!("Hora: {}", format_clock(order.created_at, self.timezone)));
        b.newline();
        b.sep_single();

        b.bold().line("ITENS:").bold_off();
        b.sep_single();
        for item in items {
            b.double_height().bold();
            b.line(&format!("{}x {}", item.quantity, item.product_name));
            b.bold_off().reset_size();
            if let Some(obs) = non_empty(item.observations.as_deref()) {
                b.line(&format!("   OBS: {}", obs));
            }
            b.newline();
        }
        b.sep_single();

        b.feed(3).cut();
        Ok(Some(b))
    }

    /// Kitchen notice that an item was cancelled
    pub fn render_cancellation(&self, ticket: &CancellationTicket) -> RenderResult<EscPosBuilder> {
        validate_cancellation(ticket)?;

        let mut b = EscPosBuilder::new(self.width);

        b.center().bold().double_size().line("CANCELAMENTO");
        b.bold_off().reset_size();
        b.newline();

        b.left();
        b.line(&format!("Mesa: {}", ticket.table_number));
        b.line(&format!("Garcom: {}", ticket.waiter_name));
        b.line(&format!(
            "Data: {}",
            format_timestamp(ticket.cancelled_at, self.timezone)
        ));
        b.sep_single();

        let price = format_brl(ticket.item.unit_price);
        let name_width = self.width.saturating_sub(price.chars().count() + 1);
        b.bold().line("ITEM CANCELADO:").bold_off();
        b.line_lr(
            &pad_to_width(
                &truncate_to_width(&ticket.item.product_name, name_width),
                name_width,
                false,
            ),
            &price,
        );
        b.line(&format!("Qtd: {}", ticket.item.quantity));
        if let Some(reason) = non_empty(ticket.reason.as_deref()) {
            b.line(&format!("Motivo: {}", reason));
        }
        b.sep_double();

        b.feed(2).cut();
        Ok(b)
    }

    /// Test page for a configured printer
    pub fn render_test_page(&self, profile: &PrinterProfile, at: i64) -> EscPosBuilder {
        let mut b = EscPosBuilder::new(self.width);

        b.center().bold().double_size().line("TESTE DE IMPRESSAO");
        b.bold_off().reset_size();
        b.newline();

        b.left();
        b.line(&format!("Impressora: {}", profile.name));
        b.line(&format!("Tipo: {}", profile.purpose.label()));
        b.line(&format!("USB: {}:{}", profile.vendor_id, profile.product_id));
        b.line(&format!("Data: {}", format_timestamp(at, self.timezone)));
        b.sep_single();

        b.center();
        b.line("Impressora funcionando corretamente!");

        b.feed(2).cut();
        b
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(RECEIPT_WIDTH, DEFAULT_TIMEZONE)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn validate_cancellation(ticket: &CancellationTicket) -> ValidationResult<()> {
    if ticket.table_number == 0 {
        return Err(ValidationError::missing("table_number"));
    }
    if ticket.waiter_name.trim().is_empty() {
        return Err(ValidationError::missing("waiter_name"));
    }
    if ticket.item.product_name.trim().is_empty() {
        return Err(ValidationError::missing("item.product_name"));
    }
    if ticket.item.quantity == 0 {
        return Err(ValidationError::invalid("item.quantity", "must be at least 1"));
    }
    Ok(())
}
