//! Code page encoding utilities for thermal printers
//!
//! Receipt text is Portuguese, so it has to reach the printer as a
//! single-byte Western code page. This module provides utilities for:
//! - Encoding UTF-8 text to Latin-1 or Windows-1252
//! - Calculating printed widths
//! - Truncating/padding strings to a column width

use crate::error::PrintError;
use std::str::FromStr;

/// Replacement byte for characters the code page cannot represent
const REPLACEMENT: u8 = b'?';

/// Text encoding sent to the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Raw Latin-1 bytes, relies on the printer's power-on code page
    #[default]
    Latin1,
    /// Windows-1252, selected explicitly with `ESC t 16`
    Windows1252,
}

impl TextEncoding {
    /// ESC/POS code table number to select after init, if any
    pub fn code_page(&self) -> Option<u8> {
        match self {
            TextEncoding::Latin1 => None,
            TextEncoding::Windows1252 => Some(16),
        }
    }

    /// Append the encoded form of `s` to `out`
    ///
    /// Control characters are replaced by spaces: the printer would read
    /// them as commands.
    pub fn encode_into(&self, s: &str, out: &mut Vec<u8>) {
        for c in s.chars() {
            if c.is_control() {
                out.push(b' ');
                continue;
            }
            match self {
                TextEncoding::Latin1 => {
                    let code = c as u32;
                    out.push(if code <= 0xFF { code as u8 } else { REPLACEMENT });
                }
                TextEncoding::Windows1252 => {
                    let mut tmp = [0u8; 4];
                    let (bytes, _, had_errors) =
                        encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
                    if had_errors {
                        out.push(REPLACEMENT);
                    } else {
                        out.extend_from_slice(&bytes);
                    }
                }
            }
        }
    }
}

impl FromStr for TextEncoding {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "cp1252" | "windows-1252" | "windows1252" => Ok(TextEncoding::Windows1252),
            other => Err(PrintError::InvalidConfig(format!(
                "Unknown text encoding: {}",
                other
            ))),
        }
    }
}

/// Encode text to the printer code page
pub fn encode_text(s: &str, encoding: TextEncoding) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    encoding.encode_into(s, &mut out);
    out
}

/// Printed width of a string in columns
///
/// Both supported code pages are single-byte, so one char is one column.
pub fn encoded_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_to_width(s: &str, width: usize, align_right: bool) -> String {
    let current_width = encoded_width(s);
    if current_width >= width {
        return truncate_to_width(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_accents() {
        assert_eq!(encode_text("Água", TextEncoding::Latin1), vec![0xC1, b'g', b'u', b'a']);
        assert_eq!(encode_text("Garçom", TextEncoding::Latin1)[3], 0xE7);
        // outside Latin-1
        assert_eq!(encode_text("€1", TextEncoding::Latin1), vec![b'?', b'1']);
    }

    #[test]
    fn test_windows1252_euro_and_fallback() {
        assert_eq!(encode_text("€", TextEncoding::Windows1252), vec![0x80]);
        assert_eq!(encode_text("ção", TextEncoding::Windows1252), vec![0xE7, 0xE3, b'o']);
        assert_eq!(encode_text("中", TextEncoding::Windows1252), vec![b'?']);
    }

    #[test]
    fn test_control_chars_are_neutralized() {
        assert_eq!(encode_text("a\x1B@b", TextEncoding::Latin1), b"a @b".to_vec());
        assert_eq!(encode_text("x\ty", TextEncoding::Windows1252), b"x y".to_vec());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("latin1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert_eq!("CP1252".parse::<TextEncoding>().unwrap(), TextEncoding::Windows1252);
        assert!("gbk".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_pad_and_truncate() {
        assert_eq!(pad_to_width("hi", 5, false), "hi   ");
        assert_eq!(pad_to_width("hi", 5, true), "   hi");
        assert_eq!(pad_to_width("Água Mineral", 4, false), "Água");
        assert_eq!(truncate_to_width("Pão de queijo", 3), "Pão");
        assert_eq!(encoded_width("Açaí"), 4);
    }
}
