//! ESC/POS command builder
//!
//! Raw command encoders plus a builder that records typed instructions and
//! renders them to bytes only in [`EscPosBuilder::build`].

use crate::encoding::{TextEncoding, encoded_width};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Receipt width in characters (58mm paper, font A)
pub const RECEIPT_WIDTH: usize = 32;

/// Text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Character size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Normal,
    DoubleHeight,
    DoubleWidth,
    Double,
}

// --- raw commands ---

/// Initialize printer (ESC @)
pub fn init() -> [u8; 2] {
    [ESC, 0x40]
}

/// Select justification (ESC a n)
pub fn align(align: Align) -> [u8; 3] {
    let n = match align {
        Align::Left => 0x00,
        Align::Center => 0x01,
        Align::Right => 0x02,
    };
    [ESC, 0x61, n]
}

/// Emphasized mode on/off (ESC E n)
pub fn bold(on: bool) -> [u8; 3] {
    [ESC, 0x45, u8::from(on)]
}

/// Select character size (GS ! n)
pub fn size(size: TextSize) -> [u8; 3] {
    let n = match size {
        TextSize::Normal => 0x00,
        TextSize::DoubleHeight => 0x01,
        TextSize::DoubleWidth => 0x10,
        TextSize::Double => 0x11,
    };
    [GS, 0x21, n]
}

/// Full cut (GS V 0)
pub fn cut() -> [u8; 3] {
    [GS, 0x56, 0x00]
}

/// Select character code table (ESC t n)
pub fn select_code_page(n: u8) -> [u8; 3] {
    [ESC, 0x74, n]
}

/// Separator line of `width` copies of `ch`
pub fn rule_line(ch: char, width: usize) -> String {
    std::iter::repeat_n(ch, width).collect()
}

/// One step of a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Init,
    Align(Align),
    Bold(bool),
    Size(TextSize),
    /// Text followed by a line feed
    Line(String),
    /// Separator line across the paper width
    Rule(char),
    /// Blank line feeds
    Feed(u8),
    Cut,
}

/// ESC/POS command builder
///
/// Records instructions in order; nothing is encoded until `build`.
#[derive(Debug, Clone)]
pub struct EscPosBuilder {
    ops: Vec<Instruction>,
    width: usize,
}

impl EscPosBuilder {
    /// New ticket for a paper `width` characters wide
    ///
    /// Starts with an init instruction.
    pub fn new(width: usize) -> Self {
        Self {
            ops: vec![Instruction::Init],
            width,
        }
    }

    /// Paper width in characters
    pub fn width(&self) -> usize {
        self.width
    }

    /// Recorded instructions, in order
    pub fn instructions(&self) -> &[Instruction] {
        &self.ops
    }

    fn push(&mut self, op: Instruction) -> &mut Self {
        self.ops.push(op);
        self
    }

    // --- text ---

    /// One text line
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.push(Instruction::Line(s.to_string()))
    }

    /// Blank line
    pub fn newline(&mut self) -> &mut Self {
        self.push(Instruction::Line(String::new()))
    }

    /// Blank lines before a cut
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.push(Instruction::Feed(lines))
    }

    // --- alignment ---

    /// Center following lines
    pub fn center(&mut self) -> &mut Self {
        self.push(Instruction::Align(Align::Center))
    }

    /// Left-align following lines
    pub fn left(&mut self) -> &mut Self {
        self.push(Instruction::Align(Align::Left))
    }

    /// Right-align following lines
    pub fn right(&mut self) -> &mut Self {
        self.push(Instruction::Align(Align::Right))
    }

    // --- style ---

    /// Bold on
    pub fn bold(&mut self) -> &mut Self {
        self.push(Instruction::Bold(true))
    }

    /// Bold off
    pub fn bold_off(&mut self) -> &mut Self {
        self.push(Instruction::Bold(false))
    }

    /// `GS ! 0x11`
    pub fn double_size(&mut self) -> &mut Self {
        self.push(Instruction::Size(TextSize::Double))
    }

    /// `GS ! 0x01`
    pub fn double_height(&mut self) -> &mut Self {
        self.push(Instruction::Size(TextSize::DoubleHeight))
    }

    /// `GS ! 0x10`
    pub fn double_width(&mut self) -> &mut Self {
        self.push(Instruction::Size(TextSize::DoubleWidth))
    }

    /// Back to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.push(Instruction::Size(TextSize::Normal))
    }

    // --- rules ---

    /// Double rule (`=`)
    pub fn sep_double(&mut self) -> &mut Self {
        self.push(Instruction::Rule('='))
    }

    /// Single rule (`-`)
    pub fn sep_single(&mut self) -> &mut Self {
        self.push(Instruction::Rule('-'))
    }

    // --- layout ---

    /// `left` and `right` on one line, padded apart; joined by a single
    /// space when they do not fit
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = encoded_width(left);
        let rw = encoded_width(right);

        if lw + rw >= self.width {
            self.line(&format!("{} {}", left, right))
        } else {
            let spaces = self.width - lw - rw;
            self.line(&format!("{}{}{}", left, " ".repeat(spaces), right))
        }
    }

    // --- paper ---

    /// Full cut
    pub fn cut(&mut self) -> &mut Self {
        self.push(Instruction::Cut)
    }

    // --- inspection ---

    /// Printed text lines in order, separators expanded, feeds omitted
    pub fn text_lines(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Instruction::Line(s) => Some(s.clone()),
                Instruction::Rule(ch) => Some(rule_line(*ch, self.width)),
                _ => None,
            })
            .collect()
    }

    // --- build ---

    /// Render the instructions to the final byte stream
    ///
    /// When the encoding needs an explicit code table it is selected after
    /// every init, since ESC @ resets it.
    pub fn build(&self, encoding: TextEncoding) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1024);
        for op in &self.ops {
            match op {
                Instruction::Init => {
                    buf.extend_from_slice(&init());
                    if let Some(n) = encoding.code_page() {
                        buf.extend_from_slice(&select_code_page(n));
                    }
                }
                Instruction::Align(a) => buf.extend_from_slice(&align(*a)),
                Instruction::Bold(on) => buf.extend_from_slice(&bold(*on)),
                Instruction::Size(s) => buf.extend_from_slice(&size(*s)),
                Instruction::Line(s) => {
                    encoding.encode_into(s, &mut buf);
                    buf.push(b'\n');
                }
                Instruction::Rule(ch) => {
                    encoding.encode_into(&rule_line(*ch, self.width), &mut buf);
                    buf.push(b'\n');
                }
                Instruction::Feed(n) => {
                    buf.extend(std::iter::repeat_n(b'\n', *n as usize));
                }
                Instruction::Cut => buf.extend_from_slice(&cut()),
            }
        }
        buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(RECEIPT_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(init(), [0x1B, 0x40]);
        assert_eq!(align(Align::Left), [0x1B, 0x61, 0x00]);
        assert_eq!(align(Align::Center), [0x1B, 0x61, 0x01]);
        assert_eq!(align(Align::Right), [0x1B, 0x61, 0x02]);
        assert_eq!(bold(true), [0x1B, 0x45, 0x01]);
        assert_eq!(bold(false), [0x1B, 0x45, 0x00]);
        assert_eq!(size(TextSize::Normal), [0x1D, 0x21, 0x00]);
        assert_eq!(size(TextSize::DoubleHeight), [0x1D, 0x21, 0x01]);
        assert_eq!(size(TextSize::DoubleWidth), [0x1D, 0x21, 0x10]);
        assert_eq!(size(TextSize::Double), [0x1D, 0x21, 0x11]);
        assert_eq!(cut(), [0x1D, 0x56, 0x00]);
    }

    #[test]
    fn test_rule_line() {
        assert_eq!(rule_line('-', RECEIPT_WIDTH).len(), 32);
        assert_eq!(rule_line('=', 4), "====");
    }

    #[test]
    fn test_builder_basic() {
        let mut b = EscPosBuilder::new(32);
        b.center().bold().double_size().line("PEDIDO").reset_size().bold_off();
        b.left().line("Mesa: 4").feed(3).cut();

        let mut expected = vec![0x1B, 0x40, 0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01, 0x1D, 0x21, 0x11];
        expected.extend_from_slice(b"PEDIDO\n");
        expected.extend_from_slice(&[0x1D, 0x21, 0x00, 0x1B, 0x45, 0x00, 0x1B, 0x61, 0x00]);
        expected.extend_from_slice(b"Mesa: 4\n\n\n\n");
        expected.extend_from_slice(&[0x1D, 0x56, 0x00]);

        assert_eq!(b.build(TextEncoding::Latin1), expected);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut b = EscPosBuilder::default();
        b.line("Água Mineral").sep_double().cut();
        assert_eq!(b.build(TextEncoding::Latin1), b.build(TextEncoding::Latin1));
    }

    #[test]
    fn test_code_page_after_init() {
        let mut b = EscPosBuilder::new(10);
        b.line("ç");
        let data = b.build(TextEncoding::Windows1252);
        assert_eq!(&data[..5], &[0x1B, 0x40, 0x1B, 0x74, 16]);
        assert_eq!(&data[5..], &[0xE7, b'\n']);
    }

    #[test]
    fn test_line_lr() {
        let mut b = EscPosBuilder::new(20);
        b.line_lr("Pastel", "R$ 12.00");
        assert_eq!(b.text_lines(), vec!["Pastel      R$ 12.00".to_string()]);

        let mut b = EscPosBuilder::new(10);
        b.line_lr("Refrigerante", "R$ 6.00");
        assert_eq!(b.text_lines(), vec!["Refrigerante R$ 6.00".to_string()]);
    }

    #[test]
    fn test_separators() {
        let mut b = EscPosBuilder::new(10);
        b.sep_double().sep_single();
        assert_eq!(b.text_lines(), vec!["==========", "----------"]);
    }
}
