//! Assembles mnemonics into a bytecode image.
//!
//! ```text
//! # comment
//! start:
//!     mov =5 R0
//!     add R0 =3 R1
//!     cmp R1 =8
//!     brn.eq @done
//!     wto =33
//! done:
//!     end
//! ```
//!
//! Operands are `R<n>` (register), `R$<n>` (RAM at the address in a register),
//! `<n>` (RAM at a literal address), `=<n>` (constant) and `@<label>` (constant
//! holding the offset of a label). `! <byte>` emits a raw byte and `!N <number>`
//! an encoded number. A numeric label such as `0x40:` pads the image up to that
//! offset.

use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::error;
use std::{fmt, str::Lines};

use crate::codec::{self, NUMBER_SIZE};
use crate::error::MachineErrorKind;
use crate::processor::operand::Operand;
use crate::processor::statement::Statement;
use crate::processor::{Condition, Instruction};

use super::Byte;

macro_rules! propagate {
    ( $res:expr ) => {
        match $res {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidAddress { address: usize },
    InvalidLiteral,
    InvalidNumber { radix: u32 },
    InvalidInstruction,
    InvalidCondition,
    InvalidOperand,
    ArityMismatch { expected: usize, found: usize },
    InvalidAddressLabel,
    DuplicateLabel,
    UnknownLabel,
    Encoding(MachineErrorKind),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidAddress { address } => {
                write!(f, "invalid address `0x{:x}`", address)
            }
            ParseErrorKind::InvalidLiteral => f.write_str("invalid literal"),
            ParseErrorKind::InvalidNumber { radix } => {
                write!(f, "failed to parse number with radix `{}`", radix)
            }
            ParseErrorKind::InvalidInstruction => f.write_str("failed to resolve instruction"),
            ParseErrorKind::InvalidCondition => f.write_str("failed to resolve condition"),
            ParseErrorKind::InvalidOperand => f.write_str("invalid operand"),
            ParseErrorKind::ArityMismatch { expected, found } => {
                write!(f, "expected {} operands, found {}", expected, found)
            }
            ParseErrorKind::InvalidAddressLabel => f.write_str("invalid address label"),
            ParseErrorKind::DuplicateLabel => f.write_str("label defined twice"),
            ParseErrorKind::UnknownLabel => f.write_str("label is never defined"),
            ParseErrorKind::Encoding(kind) => write!(f, "{}", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    /// An error without extra context
    fn bare(kind: ParseErrorKind, line_nr: usize) -> Self {
        Self {
            kind,
            context: None,
            line_nr,
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Parses an optionally negative number with a `0b`, `0o` or `0x` prefix.
/// Returns `None` for empty input and the radix on failure.
fn parse_number(text: &str) -> Option<Result<i64, u32>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (radix, offset) = match text.as_bytes() {
        [b'0', b'b', ..] => (2, 2),
        [b'0', b'o', ..] => (8, 2),
        [b'0', b'x', ..] => (16, 2),
        _ => (10, 0),
    };

    Some(
        i64::from_str_radix(&text[offset..], radix)
            .map(|value| if negative { -value } else { value })
            .map_err(|_| radix),
    )
}

/// A label operand waiting for its address
#[derive(Debug, Clone)]
struct Fixup<'a> {
    /// Image offset of the encoded payload
    offset: usize,
    label: &'a str,
    line_nr: usize,
}

#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lines: Lines<'a>,
    line_nr: usize,
    image: Vec<Byte>,
    labels: HashMap<&'a str, usize>,
    fixups: Vec<Fixup<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a str) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            image: Vec::new(),
            labels: HashMap::new(),
            fixups: Vec::new(),
        }
    }

    /// Consumes `self` and assembles every line of the source.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<Vec<Byte>, Vec<ParseError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        for fixup in std::mem::take(&mut self.fixups) {
            if let Err(err) = self.resolve(&fixup) {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(self.image)
        } else {
            Err(errors)
        }
    }

    /// Tries to parse the next line. Each statement should be located on its
    /// own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?;
        self.line_nr += 1;

        let line = match line.find('#') {
            Some(start) => &line[..start],
            None => line,
        }
        .trim();

        if line.is_empty() {
            Some(Ok(()))
        } else if line.starts_with('!') {
            self.parse_literal(line)
        } else if line.ends_with(':') {
            self.parse_address_label(line)
        } else if let Some(name) = line.strip_prefix("lbl ") {
            Some(self.define_label(name.trim()))
        } else {
            self.parse_statement(line)
        }
    }

    fn number<T>(&self, text: &str, kind: ParseErrorKind) -> Result<T>
    where
        T: TryFrom<i64>,
    {
        let value = match parse_number(text) {
            Some(Ok(value)) => value,
            Some(Err(radix)) => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidNumber { radix },
                    format!("`{}`", text),
                    self.line_nr,
                ))
            }
            None => {
                return Err(ParseError::new(
                    kind,
                    "a number needs to be set",
                    self.line_nr,
                ))
            }
        };

        T::try_from(value).map_err(|_| {
            ParseError::new(kind, format!("`{}` is out of range", text), self.line_nr)
        })
    }

    /// Tries to parse line as literal.
    ///
    /// # Examples
    ///
    /// - `! 0x22`
    /// - `!N -300`
    fn parse_literal(&mut self, line: &'a str) -> Option<Result<()>> {
        let line = line.strip_prefix('!').expect("Line is not a literal line");

        if let Some(line) = line.strip_prefix('N') {
            log::debug!("[{}] Found number literal", self.line_nr);

            let value: i32 = propagate!(self.number(line, ParseErrorKind::InvalidLiteral));
            Some(self.write_number(value))
        } else {
            log::debug!("[{}] Found byte literal", self.line_nr);

            let byte: u8 = propagate!(self.number(line, ParseErrorKind::InvalidLiteral));
            self.image.push(byte);
            Some(Ok(()))
        }
    }

    /// Tries to parse line as a label. Numeric labels move the image position.
    ///
    /// # Examples
    ///
    /// - `loop:`
    /// - `0x40:`
    fn parse_address_label(&mut self, line: &'a str) -> Option<Result<()>> {
        let line = line
            .strip_suffix(':')
            .expect("Line is not an address label")
            .trim();

        let numeric = line
            .as_bytes()
            .first()
            .map_or(false, |first| first.is_ascii_digit());
        if !numeric {
            return Some(self.define_label(line));
        }

        log::debug!("[{}] Found address label", self.line_nr);

        let address: usize = propagate!(self.number(line, ParseErrorKind::InvalidAddressLabel));
        if address > codec::MAX_MAGNITUDE as usize {
            return Some(Err(ParseError::new(
                ParseErrorKind::InvalidAddress { address },
                format!("offsets above 0x{:x} cannot be encoded", codec::MAX_MAGNITUDE),
                self.line_nr,
            )));
        }
        if address < self.image.len() {
            return Some(Err(ParseError::new(
                ParseErrorKind::InvalidAddress { address },
                format!("{} bytes were already written", self.image.len()),
                self.line_nr,
            )));
        }

        log::debug!("[{}] Address label `0x{:x}`", self.line_nr, address);

        self.image.resize(address, 0);
        Some(Ok(()))
    }

    fn define_label(&mut self, name: &'a str) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAddressLabel,
                format!("`{}`", name),
                self.line_nr,
            ));
        }

        log::debug!("[{}] Label `{}` at 0x{:x}", self.line_nr, name, self.image.len());

        if self.labels.insert(name, self.image.len()).is_some() {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateLabel,
                format!("`{}`", name),
                self.line_nr,
            ));
        }
        Ok(())
    }

    /// Tries to parse line as a statement.
    ///
    /// # Examples
    ///
    /// - `add R0 =1 R0`
    /// - `brn.ne @loop`
    /// - `end`
    fn parse_statement(&mut self, line: &'a str) -> Option<Result<()>> {
        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next()?;

        let (name, suffix) = match mnemonic.split_once('.') {
            Some((name, suffix)) => (name, Some(suffix)),
            None => (mnemonic, None),
        };

        let instruction = *propagate!(Instruction::ALL
            .iter()
            .find(|instruction| instruction.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseError::new(
                ParseErrorKind::InvalidInstruction,
                format!("no instruction named `{}`", name),
                self.line_nr
            )));

        let condition = match suffix {
            None => Condition::Always,
            Some(suffix) => propagate!(Condition::from_suffix(suffix).ok_or_else(|| {
                ParseError::new(
                    ParseErrorKind::InvalidCondition,
                    format!("`{}`", suffix),
                    self.line_nr,
                )
            })),
        };

        let tokens: Vec<&'a str> = tokens.collect();
        if tokens.len() != instruction.arity() {
            return Some(Err(ParseError::new(
                ParseErrorKind::ArityMismatch {
                    expected: instruction.arity(),
                    found: tokens.len(),
                },
                format!("for `{}`", instruction),
                self.line_nr,
            )));
        }

        let start = self.image.len();
        let mut operands = Vec::with_capacity(tokens.len());
        let mut fixups = Vec::new();
        for (index, token) in tokens.into_iter().enumerate() {
            if let Some(label) = token.strip_prefix('@') {
                fixups.push(Fixup {
                    offset: start + 2 + index * Operand::SIZE + 1,
                    label,
                    line_nr: self.line_nr,
                });
                operands.push(Operand::constant(0));
            } else {
                operands.push(propagate!(self.parse_operand(token)));
            }
        }

        log::debug!("[{}] Found statement {}", self.line_nr, instruction);

        let statement = Statement::new(instruction, condition, &operands)
            .expect("operand count was checked");
        let bytes = propagate!(statement
            .encode()
            .map_err(|kind| ParseError::bare(ParseErrorKind::Encoding(kind), self.line_nr)));
        self.image.extend_from_slice(&bytes);
        self.fixups.extend(fixups);

        Some(Ok(()))
    }

    /// Parses `R<n>`, `R$<n>`, `=<n>` or `<n>`
    fn parse_operand(&self, token: &str) -> Result<Operand> {
        let register = token
            .strip_prefix('R')
            .or_else(|| token.strip_prefix('r'));

        if let Some(rest) = register {
            if let Some(index) = rest.strip_prefix('$') {
                Ok(Operand::register_value(
                    self.number(index, ParseErrorKind::InvalidOperand)?,
                ))
            } else {
                Ok(Operand::register(
                    self.number(rest, ParseErrorKind::InvalidOperand)?,
                ))
            }
        } else if let Some(value) = token.strip_prefix('=') {
            Ok(Operand::constant(
                self.number(value, ParseErrorKind::InvalidOperand)?,
            ))
        } else {
            Ok(Operand::pointer(
                self.number(token, ParseErrorKind::InvalidOperand)?,
            ))
        }
    }

    fn write_number(&mut self, value: i32) -> Result<()> {
        let bytes = codec::encode(value)
            .map_err(|kind| ParseError::bare(ParseErrorKind::Encoding(kind), self.line_nr))?;
        self.image.extend_from_slice(&bytes);
        Ok(())
    }

    /// Patches the payload of a label operand
    fn resolve(&mut self, fixup: &Fixup<'a>) -> Result<()> {
        let address = *self.labels.get(fixup.label).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnknownLabel,
                format!("`{}`", fixup.label),
                fixup.line_nr,
            )
        })?;

        let bytes = i32::try_from(address)
            .map_err(|_| MachineErrorKind::NumberOutOfRange { value: i32::MAX })
            .and_then(codec::encode)
            .map_err(|kind| {
                ParseError::new(
                    ParseErrorKind::Encoding(kind),
                    format!("address of `{}`", fixup.label),
                    fixup.line_nr,
                )
            })?;

        self.image[fixup.offset..fixup.offset + NUMBER_SIZE].copy_from_slice(&bytes);
        Ok(())
    }
}

/// Assembles `source` into a bytecode image
pub fn assemble(source: &str) -> Result<Vec<Byte>, Vec<ParseError>> {
    Parser::new(source).parse()
}
