use chrono_tz::Tz;
use comanda_printer::{DEFAULT_WRITE_TIMEOUT, TextEncoding};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::utils::time::{DEFAULT_TIMEZONE, parse_timezone};

/// Kitchen ticket categories when `KITCHEN_CATEGORIES` is unset
pub const DEFAULT_KITCHEN_CATEGORIES: [&str; 2] = ["PETISCOS", "SUCOS"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Print service configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/comanda | working directory |
/// | PRINTER_DB | $WORK_DIR/printers.redb | printer profile store |
/// | PRINTER_TIMEZONE | America/Sao_Paulo | receipt timestamps |
/// | PRINTER_WRITE_TIMEOUT_MS | 5000 | device write timeout |
/// | PRINTER_DEVICE_CANDIDATES | /dev/usb/lp0..3,/dev/lp0..3 | probe order |
/// | PRINTER_ROLE_HEURISTIC | true | lp0 reception / lp1 kitchen tie-break |
/// | PRINTER_TEXT_ENCODING | latin1 | latin1 or cp1252 |
/// | KITCHEN_CATEGORIES | PETISCOS,SUCOS | kitchen ticket filter |
/// | LOG_LEVEL | info | log filter |
/// | LOG_DIR | (unset) | daily rolling log files |
/// | LOG_JSON | false | JSON log lines |
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub printer_db: PathBuf,
    pub timezone: Tz,
    pub write_timeout: Duration,
    /// Empty means the built-in candidate list
    pub device_candidates: Vec<PathBuf>,
    pub role_heuristic: bool,
    pub text_encoding: TextEncoding,
    pub kitchen_categories: Vec<String>,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Load from the process environment, rejecting unparsable values
    pub fn try_from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let work_dir = get("WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/var/lib/comanda"));
        let printer_db = get("PRINTER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| work_dir.join("printers.redb"));

        let timezone = match get("PRINTER_TIMEZONE") {
            Some(raw) => parse_timezone(&raw)
                .ok_or_else(|| invalid("PRINTER_TIMEZONE", &raw, "unknown timezone"))?,
            None => DEFAULT_TIMEZONE,
        };

        let write_timeout = match get("PRINTER_WRITE_TIMEOUT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(invalid(
                        "PRINTER_WRITE_TIMEOUT_MS",
                        &raw,
                        "expected a positive number of milliseconds",
                    ));
                }
            },
            None => DEFAULT_WRITE_TIMEOUT,
        };

        let device_candidates = get("PRINTER_DEVICE_CANDIDATES")
            .map(|raw| {
                split_list(&raw)
                    .into_iter()
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let role_heuristic = match get("PRINTER_ROLE_HEURISTIC") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| invalid("PRINTER_ROLE_HEURISTIC", &raw, "expected true or false"))?,
            None => true,
        };

        let text_encoding = match get("PRINTER_TEXT_ENCODING") {
            Some(raw) => raw
                .parse::<TextEncoding>()
                .map_err(|e| invalid("PRINTER_TEXT_ENCODING", &raw, &e.to_string()))?,
            None => TextEncoding::default(),
        };

        let kitchen_categories = get("KITCHEN_CATEGORIES")
            .map(|raw| split_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_kitchen_categories);

        let log_json = match get("LOG_JSON") {
            Some(raw) => {
                parse_bool(&raw).ok_or_else(|| invalid("LOG_JSON", &raw, "expected true or false"))?
            }
            None => false,
        };

        Ok(Self {
            work_dir,
            printer_db,
            timezone,
            write_timeout,
            device_candidates,
            role_heuristic,
            text_encoding,
            kitchen_categories,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: get("LOG_DIR"),
            log_json,
        })
    }

    /// Override the working directory, moving the default profile store with it
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        if self.printer_db == self.work_dir.join("printers.redb") {
            self.printer_db = work_dir.join("printers.redb");
        }
        self.work_dir = work_dir;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let work_dir = PathBuf::from("/var/lib/comanda");
        Self {
            printer_db: work_dir.join("printers.redb"),
            work_dir,
            timezone: DEFAULT_TIMEZONE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            device_candidates: Vec::new(),
            role_heuristic: true,
            text_encoding: TextEncoding::default(),
            kitchen_categories: default_kitchen_categories(),
            log_level: "info".into(),
            log_dir: None,
            log_json: false,
        }
    }
}

fn default_kitchen_categories() -> Vec<String> {
    DEFAULT_KITCHEN_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ConfigResult<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/var/lib/comanda"));
        assert_eq!(config.printer_db, PathBuf::from("/var/lib/comanda/printers.redb"));
        assert_eq!(config.timezone, chrono_tz::America::Sao_Paulo);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert!(config.device_candidates.is_empty());
        assert!(config.role_heuristic);
        assert_eq!(config.text_encoding, TextEncoding::Latin1);
        assert_eq!(config.kitchen_categories, vec!["PETISCOS", "SUCOS"]);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("WORK_DIR", "/tmp/comanda"),
            ("PRINTER_TIMEZONE", "UTC"),
            ("PRINTER_WRITE_TIMEOUT_MS", "1500"),
            ("PRINTER_DEVICE_CANDIDATES", "/dev/usb/lp3, /dev/lp0,"),
            ("PRINTER_ROLE_HEURISTIC", "false"),
            ("PRINTER_TEXT_ENCODING", "cp1252"),
            ("KITCHEN_CATEGORIES", "PETISCOS, PRATOS"),
        ])
        .unwrap();
        assert_eq!(config.printer_db, PathBuf::from("/tmp/comanda/printers.redb"));
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.write_timeout, Duration::from_millis(1500));
        assert_eq!(
            config.device_candidates,
            vec![PathBuf::from("/dev/usb/lp3"), PathBuf::from("/dev/lp0")]
        );
        assert!(!config.role_heuristic);
        assert_eq!(config.text_encoding, TextEncoding::Windows1252);
        assert_eq!(config.kitchen_categories, vec!["PETISCOS", "PRATOS"]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = load(&[("PRINTER_WRITE_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PRINTER_WRITE_TIMEOUT_MS", .. }));

        assert!(load(&[("PRINTER_WRITE_TIMEOUT_MS", "0")]).is_err());
        assert!(load(&[("PRINTER_TIMEZONE", "Nowhere/City")]).is_err());
        assert!(load(&[("PRINTER_ROLE_HEURISTIC", "maybe")]).is_err());
        assert!(load(&[("PRINTER_TEXT_ENCODING", "utf-16")]).is_err());
    }

    #[test]
    fn test_with_work_dir_moves_default_db() {
        let config = Config::default().with_work_dir("/srv/comanda");
        assert_eq!(config.printer_db, PathBuf::from("/srv/comanda/printers.redb"));

        let pinned = load(&[("PRINTER_DB", "/data/p.redb")])
            .unwrap()
            .with_work_dir("/srv/comanda");
        assert_eq!(pinned.printer_db, PathBuf::from("/data/p.redb"));
    }
}
