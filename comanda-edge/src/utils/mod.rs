//! Utility modules

pub mod logger;
pub mod money;
pub mod time;

pub use logger::{init_logger, init_logger_with_file};
pub use money::{format_brl, round_money};
pub use time::{format_clock, format_timestamp, parse_timezone};
