use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comanda_edge::printing::{
    CancellationTicket, DevicePrintDispatcher, PrintJob, PrintOutcome, PrinterRegistry,
    ProfileStorage,
};
use comanda_edge::{Config, setup_environment};
use serde::de::DeserializeOwned;
use shared::models::{
    OrderAggregate, PrinterProfileCreate, PrinterPurpose, PrinterSettings, TableSummaryAggregate,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "comanda-edge",
    version,
    about = "Print restaurant tickets on USB ESC/POS thermal printers"
)]
struct Cli {
    /// Working directory holding the printer database (overrides WORK_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List candidate device nodes that exist right now
    Paths,

    /// Manage printer profiles
    Printers {
        #[command(subcommand)]
        cmd: PrinterCmd,
    },

    /// Test a printer's connection and record the result
    Test { id: String },

    /// Print a test page on a printer
    TestPage { id: String },

    /// Print an order (JSON file, "-" for stdin)
    PrintOrder {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// kitchen or reception
        #[arg(long, default_value = "reception")]
        purpose: PrinterPurpose,
    },

    /// Print a table summary on the reception printer
    PrintTable {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the kitchen copy of an order
    PrintKitchen {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print an item cancellation on the kitchen printer
    PrintCancellation {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Render an order to raw ESC/POS bytes without printing
    RenderOrder {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Render a table summary to raw ESC/POS bytes without printing
    RenderTable {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// List USB devices on the bus
    #[cfg(feature = "usb")]
    UsbDevices,
}

#[derive(Subcommand, Debug)]
enum PrinterCmd {
    /// Show all profiles
    List,

    /// Add a profile
    Add {
        #[arg(long)]
        name: String,
        /// kitchen or reception
        #[arg(long)]
        purpose: PrinterPurpose,
        /// Hex, e.g. 0x0483
        #[arg(long)]
        vendor_id: String,
        /// Hex, e.g. 0x070b
        #[arg(long)]
        product_id: String,
        /// Fixed device node, e.g. /dev/usb/lp0
        #[arg(long)]
        device_path: Option<PathBuf>,
        #[arg(long, default_value_t = 58)]
        paper_width_mm: u32,
    },

    /// Delete a profile
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = setup_environment().context("Invalid configuration")?;
    if let Some(dir) = cli.work_dir {
        config = config.with_work_dir(dir);
    }

    match cli.cmd {
        Cmd::Paths => {
            let paths = preview_dispatcher(&config).available_paths();
            if paths.is_empty() {
                println!("No printer device found");
            }
            for path in paths {
                println!("{}", path);
            }
        }
        Cmd::Printers { cmd } => {
            let registry = open_registry(&config)?;
            match cmd {
                PrinterCmd::List => {
                    println!("{}", serde_json::to_string_pretty(&registry.list())?);
                }
                PrinterCmd::Add {
                    name,
                    purpose,
                    vendor_id,
                    product_id,
                    device_path,
                    paper_width_mm,
                } => {
                    let profile = registry.create(PrinterProfileCreate {
                        name,
                        purpose,
                        vendor_id,
                        product_id,
                        device_path: device_path.map(|p| p.display().to_string()),
                        settings: PrinterSettings {
                            paper_width_mm,
                            ..Default::default()
                        },
                    })?;
                    println!("{}", profile.id);
                }
                PrinterCmd::Remove { id } => {
                    let removed = registry.remove(&id)?;
                    println!("Removed {}", removed.name);
                }
            }
        }
        Cmd::Test { id } => {
            let report = device_dispatcher(&config)?.test_connection(&id)?;
            println!("{}", report.message);
            if !report.connected {
                anyhow::bail!("Printer {} is not connected", id);
            }
        }
        Cmd::TestPage { id } => {
            let outcome = device_dispatcher(&config)?.print_test_page(&id).await?;
            report_outcome(&outcome);
        }
        Cmd::PrintOrder { file, purpose } => {
            let order: OrderAggregate = read_json(&file)?;
            let outcome = device_dispatcher(&config)?
                .print_order(&order, purpose)
                .await?;
            report_outcome(&outcome);
        }
        Cmd::PrintTable { file } => {
            let summary: TableSummaryAggregate = read_json(&file)?;
            let outcome = device_dispatcher(&config)?
                .print_table_summary(&summary)
                .await?;
            report_outcome(&outcome);
        }
        Cmd::PrintKitchen { file } => {
            let order: OrderAggregate = read_json(&file)?;
            let outcome = device_dispatcher(&config)?
                .print_kitchen_ticket(&order)
                .await?;
            report_outcome(&outcome);
        }
        Cmd::PrintCancellation { file } => {
            let ticket: CancellationTicket = read_json(&file)?;
            let outcome = device_dispatcher(&config)?
                .print_cancellation(&ticket)
                .await?;
            report_outcome(&outcome);
        }
        Cmd::RenderOrder { file, out } => {
            let order: OrderAggregate = read_json(&file)?;
            let bytes = preview_dispatcher(&config).render(&PrintJob::Order(order))?;
            write_output(out.as_deref(), &bytes)?;
        }
        Cmd::RenderTable { file, out } => {
            let summary: TableSummaryAggregate = read_json(&file)?;
            let bytes = preview_dispatcher(&config).render(&PrintJob::TableSummary(summary))?;
            write_output(out.as_deref(), &bytes)?;
        }
        #[cfg(feature = "usb")]
        Cmd::UsbDevices => {
            for device in comanda_printer::usb::list_devices()? {
                println!(
                    "{}  {} {}",
                    device.id_string(),
                    device.manufacturer.as_deref().unwrap_or("-"),
                    device.product.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}

fn open_registry(config: &Config) -> Result<Arc<PrinterRegistry>> {
    let storage = ProfileStorage::open(&config.printer_db)
        .with_context(|| format!("Failed to open {}", config.printer_db.display()))?;
    Ok(Arc::new(PrinterRegistry::with_storage(storage)?))
}

fn device_dispatcher(config: &Config) -> Result<DevicePrintDispatcher> {
    Ok(DevicePrintDispatcher::from_config(config, open_registry(config)?))
}

/// Dispatcher over an empty in-memory registry, for rendering only
fn preview_dispatcher(config: &Config) -> DevicePrintDispatcher {
    DevicePrintDispatcher::from_config(config, Arc::new(PrinterRegistry::new(Vec::new())))
}

fn report_outcome(outcome: &PrintOutcome) {
    println!("{} ({} bytes to {})", outcome.message, outcome.bytes_written, outcome.device_path);
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn write_output(out: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
