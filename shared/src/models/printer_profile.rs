//! Printer Profile Model

use crate::validation::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a printer is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrinterPurpose {
    Kitchen,
    Reception,
}

impl PrinterPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrinterPurpose::Kitchen => "kitchen",
            PrinterPurpose::Reception => "reception",
        }
    }

    /// Portuguese label printed on tickets and shown to operators
    pub fn label(&self) -> &'static str {
        match self {
            PrinterPurpose::Kitchen => "cozinha",
            PrinterPurpose::Reception => "recepcao",
        }
    }
}

impl fmt::Display for PrinterPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrinterPurpose {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kitchen" | "cozinha" => Ok(PrinterPurpose::Kitchen),
            "reception" | "recepcao" => Ok(PrinterPurpose::Reception),
            other => Err(ValidationError::invalid(
                "purpose",
                format!("unknown printer purpose '{}'", other),
            )),
        }
    }
}

/// Hardware settings stored with the profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSettings {
    #[serde(default = "default_paper_width")]
    pub paper_width_mm: u32,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_paper_width() -> u32 {
    58
}

fn default_baud_rate() -> u32 {
    9600
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            paper_width_mm: default_paper_width(),
            baud_rate: default_baud_rate(),
        }
    }
}

/// USB thermal printer entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterProfile {
    pub id: String,
    pub name: String,
    pub purpose: PrinterPurpose,
    /// Hex string, e.g. "0x6868"
    pub vendor_id: String,
    /// Hex string, e.g. "0x0200"
    pub product_id: String,
    #[serde(default)]
    pub device_path: Option<String>,
    #[serde(default)]
    pub is_connected: bool,
    #[serde(default)]
    pub print_count: u64,
    #[serde(default)]
    pub last_used_at: Option<i64>,
    #[serde(default)]
    pub settings: PrinterSettings,
}

impl PrinterProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        purpose: PrinterPurpose,
        vendor_id: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            purpose,
            vendor_id: vendor_id.into(),
            product_id: product_id.into(),
            device_path: None,
            is_connected: false,
            print_count: 0,
            last_used_at: None,
            settings: PrinterSettings::default(),
        }
    }

    /// Parse `vendor_id` / `product_id` into numeric USB ids
    pub fn usb_ids(&self) -> ValidationResult<(u16, u16)> {
        Ok((
            parse_usb_id("vendor_id", &self.vendor_id)?,
            parse_usb_id("product_id", &self.product_id)?,
        ))
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::missing("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::missing("name"));
        }
        self.usb_ids()?;
        Ok(())
    }
}

/// Parse a USB id written as hex, with or without `0x` prefix ("0x0483", "0483")
pub fn parse_usb_id(field: &str, raw: &str) -> ValidationResult<u16> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::missing(field));
    }
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16)
        .map_err(|_| ValidationError::invalid(field, format!("'{}' is not a 16-bit hex id", raw)))
}

/// Create printer profile payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterProfileCreate {
    pub name: String,
    pub purpose: PrinterPurpose,
    pub vendor_id: String,
    pub product_id: String,
    pub device_path: Option<String>,
    #[serde(default)]
    pub settings: PrinterSettings,
}

/// Update printer profile payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterProfileUpdate {
    pub name: Option<String>,
    pub purpose: Option<PrinterPurpose>,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub device_path: Option<String>,
    pub settings: Option<PrinterSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usb_id() {
        assert_eq!(parse_usb_id("vendor_id", "0x6868").unwrap(), 0x6868);
        assert_eq!(parse_usb_id("vendor_id", "0483").unwrap(), 0x0483);
        assert_eq!(parse_usb_id("vendor_id", " 0X070B ").unwrap(), 0x070b);
        assert!(parse_usb_id("vendor_id", "").is_err());
        assert!(parse_usb_id("vendor_id", "0x1FFFF").is_err());
        assert!(parse_usb_id("vendor_id", "printer").is_err());
    }

    #[test]
    fn test_purpose_serde_and_parse() {
        let json = serde_json::to_string(&PrinterPurpose::Kitchen).unwrap();
        assert_eq!(json, "\"KITCHEN\"");
        let p: PrinterPurpose = serde_json::from_str("\"RECEPTION\"").unwrap();
        assert_eq!(p, PrinterPurpose::Reception);
        assert_eq!("cozinha".parse::<PrinterPurpose>().unwrap(), PrinterPurpose::Kitchen);
        assert!("bar".parse::<PrinterPurpose>().is_err());
    }

    #[test]
    fn test_profile_defaults_from_json() {
        let json = r#"{
            "id": "p1",
            "name": "Cozinha",
            "purpose": "KITCHEN",
            "vendor_id": "0x0483",
            "product_id": "0x070b"
        }"#;
        let profile: PrinterProfile = serde_json::from_str(json).unwrap();
        assert!(!profile.is_connected);
        assert_eq!(profile.print_count, 0);
        assert_eq!(profile.settings.paper_width_mm, 58);
        assert!(profile.validate().is_ok());
    }
}
