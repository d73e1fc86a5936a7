use std::io::{self, Read, Stdin, Stdout, Write};

use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

use crate::config::Config;
use crate::error::{MachineError, MachineErrorKind, Result};
use crate::memory::disk::Disk;
use crate::memory::{Byte, Memory};

pub mod operand;
pub mod registers;
pub mod statement;

use operand::Operand;
use registers::Registers;
use statement::Statement;

/// Most operand slots any instruction reserves
pub const MAX_OPERANDS: usize = 3;

/// Longest statement: opcode, condition and three operands
pub const MAX_STATEMENT_LEN: usize = 2 + MAX_OPERANDS * Operand::SIZE;

/// What the engine does after a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the statement at this offset
    Continue(usize),
    /// Leave the current statement stream
    Halt,
}

/// Where statements are fetched from
#[derive(Debug, Clone, Copy)]
enum Code<'a> {
    /// Bytes outside the machine, e.g. the BIOS
    Slice(&'a [Byte]),
    /// A RAM range, read at fetch time so self-written code is observed
    Ram { start: usize, len: usize },
}

impl Code<'_> {
    fn len(&self) -> usize {
        match self {
            Code::Slice(bytes) => bytes.len(),
            Code::Ram { len, .. } => *len,
        }
    }
}

/// Failure inside a single statement
enum Fault {
    /// Raised by this statement
    Kind(MachineErrorKind),
    /// Raised inside a nested execution and already located
    Nested(MachineError),
}

impl From<MachineErrorKind> for Fault {
    fn from(kind: MachineErrorKind) -> Self {
        Fault::Kind(kind)
    }
}

/// Emulates the machine: registers, compare flag, RAM, disk buffer and console
#[derive(Debug)]
pub struct Processor<R = Stdin, W = Stdout> {
    pub registers: Registers,
    pub ram: Memory,
    pub disk: Disk,
    input: R,
    output: W,
    max_depth: usize,
}

impl Processor {
    /// Creates a machine attached to the standard streams
    pub fn new(config: &Config, disk: Disk) -> Self {
        Self::with_console(config, disk, io::stdin(), io::stdout())
    }
}

impl<R: Read, W: Write> Processor<R, W> {
    /// Creates a machine reading console input from `input` and writing console
    /// output to `output`
    pub fn with_console(config: &Config, disk: Disk, input: R, output: W) -> Self {
        Self {
            registers: Registers::new(config.register_count),
            ram: Memory::new("ram", config.ram_size),
            disk,
            input,
            output,
            max_depth: config.max_depth,
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Gives back the disk buffer, e.g. to persist it
    pub fn into_disk(self) -> Disk {
        self.disk
    }

    /// Runs `bytecode` until it halts or is exhausted
    pub fn execute_bytecode(&mut self, bytecode: &[Byte]) -> Result<()> {
        let result = self.run(Code::Slice(bytecode), 0);

        let flushed = self
            .output
            .flush()
            .map_err(|err| MachineError::new(MachineErrorKind::Console(err.kind()), 0, 0));

        result.and(flushed)
    }

    /// Executes the statement of `bytecode` at `position`
    pub fn execute(&mut self, bytecode: &[Byte], position: usize) -> Result<Flow> {
        self.step(Code::Slice(bytecode), position, 0)
    }

    fn run(&mut self, code: Code<'_>, depth: usize) -> Result<()> {
        let mut position = 0;

        while position < code.len() {
            match self.step(code, position, depth)? {
                Flow::Continue(next) => position = next,
                Flow::Halt => {
                    debug!("[{}] Halted at 0x{:x}", depth, position);
                    return Ok(());
                }
            }
        }

        debug!("[{}] Exhausted after 0x{:x} bytes", depth, code.len());
        Ok(())
    }

    fn step(&mut self, code: Code<'_>, position: usize, depth: usize) -> Result<Flow> {
        match self.fetch_and_execute(code, position, depth) {
            Ok(flow) => Ok(flow),
            Err(Fault::Nested(err)) => Err(err),
            Err(Fault::Kind(kind)) => {
                let err = MachineError::new(kind, position, depth);
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Copies `len` statement bytes at `position` out of `code`
    fn fetch(
        &self,
        code: Code<'_>,
        position: usize,
        len: usize,
    ) -> Result<[Byte; MAX_STATEMENT_LEN], MachineErrorKind> {
        let available = code.len().saturating_sub(position);
        if available < len {
            return Err(MachineErrorKind::TruncatedStatement {
                needed: len,
                available,
            });
        }

        let source = match code {
            Code::Slice(bytes) => &bytes[position..position + len],
            Code::Ram { start, .. } => self.ram.read_array(start + position, len)?,
        };

        let mut buffer = [0; MAX_STATEMENT_LEN];
        buffer[..len].copy_from_slice(source);
        Ok(buffer)
    }

    fn fetch_and_execute(
        &mut self,
        code: Code<'_>,
        position: usize,
        depth: usize,
    ) -> Result<Flow, Fault> {
        let header = self.fetch(code, position, 2)?;
        let (instruction, condition) = Statement::decode_header(&header[..2])?;

        let len = instruction.statement_len();
        let next = position + len;
        let bytes = self.fetch(code, position, len)?;

        if !condition.fulfilled(self.registers.compare()) {
            trace!(
                "[{}] 0x{:x}: skip {} ({:?}, compare {})",
                depth,
                position,
                instruction,
                condition,
                self.registers.compare()
            );
            return Ok(Flow::Continue(next));
        }

        let statement = Statement::decode(&bytes[..len])?;
        debug!("[{}] 0x{:x}: {}", depth, position, statement);

        self.execute_statement(&statement, next, depth)
    }

    fn read(&self, operand: &Operand) -> Result<i32, MachineErrorKind> {
        operand.read(&self.registers, &self.ram)
    }

    fn write(&mut self, operand: &Operand, value: i32) -> Result<(), MachineErrorKind> {
        operand.write(&mut self.registers, &mut self.ram, value)
    }

    /// Applies `op` to the first two operands and stores into the third
    fn arithmetic<F>(&mut self, operands: &[Operand], op: F) -> Result<(), MachineErrorKind>
    where
        F: FnOnce(i32, i32) -> Result<i32, MachineErrorKind>,
    {
        let a = self.read(&operands[0])?;
        let b = self.read(&operands[1])?;
        let result = op(a, b)?;
        self.write(&operands[2], result)?;

        debug!("  {} {}: {}", a, b, result);
        Ok(())
    }

    /// Executes an already decoded statement whose condition holds
    fn execute_statement(
        &mut self,
        statement: &Statement,
        next: usize,
        depth: usize,
    ) -> Result<Flow, Fault> {
        let operands = statement.operands();

        match statement.instruction {
            Instruction::MOV => {
                let value = self.read(&operands[0])?;
                self.write(&operands[1], value)?;
            }
            Instruction::ADD => self.arithmetic(operands, |a, b| Ok(a.wrapping_add(b)))?,
            Instruction::SUB => self.arithmetic(operands, |a, b| Ok(a.wrapping_sub(b)))?,
            Instruction::MUL => self.arithmetic(operands, |a, b| Ok(a.wrapping_mul(b)))?,
            Instruction::DIV => self.arithmetic(operands, |a, b| match b {
                0 => Err(MachineErrorKind::DivisionByZero),
                _ => Ok(a.wrapping_div(b)),
            })?,
            Instruction::MOD => self.arithmetic(operands, |a, b| match b {
                0 => Err(MachineErrorKind::DivisionByZero),
                _ => Ok(a.wrapping_rem(b)),
            })?,
            Instruction::AND => self.arithmetic(operands, |a, b| Ok(a & b))?,
            Instruction::IOR => self.arithmetic(operands, |a, b| Ok(a | b))?,
            Instruction::XOR => self.arithmetic(operands, |a, b| Ok(a ^ b))?,
            Instruction::RFI => {
                let value = self.read_console()?;
                self.write(&operands[0], value)?;
            }
            Instruction::WTO => {
                let value = self.read(&operands[0])?;
                self.output
                    .write_all(&[value as Byte])
                    .map_err(|err| MachineErrorKind::Console(err.kind()))?;
            }
            Instruction::CMP => {
                let a = self.read(&operands[0])?;
                let b = self.read(&operands[1])?;
                let compare = a.wrapping_sub(b);
                self.registers.set_compare(compare);

                debug!("  {} {}: {}", a, b, compare);
            }
            Instruction::BRN => {
                let target = self.read(&operands[0])?;
                if target < 0 {
                    return Err(MachineErrorKind::InvalidBranchTarget { target }.into());
                }
                return Ok(Flow::Continue(target as usize));
            }
            Instruction::RHD => {
                let offset = self.read(&operands[0])?;
                let value = self.disk.read_number(offset)?;
                self.write(&operands[1], value)?;
            }
            Instruction::WHD => {
                let value = self.read(&operands[0])?;
                let offset = self.read(&operands[1])?;
                self.disk.write_number(offset, value)?;
            }
            Instruction::LHD => {
                let source = self.read(&operands[0])?;
                let destination = self.read(&operands[1])?;
                let len = self.read(&operands[2])?;
                self.load_from_disk(source, destination, len)?;
            }
            Instruction::EXE => {
                let offset = self.read(&operands[0])?;
                let len = self.read(&operands[1])?;
                self.execute_nested(offset, len, depth)?;
            }
            Instruction::END => return Ok(Flow::Halt),
        }

        Ok(Flow::Continue(next))
    }

    /// Copies `len` bytes verbatim, bypassing the number format
    fn load_from_disk(
        &mut self,
        source: i32,
        destination: i32,
        len: i32,
    ) -> Result<(), MachineErrorKind> {
        if source < 0 || len < 0 {
            return Err(MachineErrorKind::AddressOutOfRange {
                region: self.disk.name(),
                address: source.min(len) as i64,
                size: self.disk.len(),
            });
        }
        if destination < 0 {
            return Err(MachineErrorKind::AddressOutOfRange {
                region: self.ram.name(),
                address: destination as i64,
                size: self.ram.len(),
            });
        }

        let bytes = self.disk.read_array(source as usize, len as usize)?;
        self.ram.write_array(destination as usize, bytes)?;

        debug!("  {} bytes to ram 0x{:x}", len, destination);
        Ok(())
    }

    /// Reads one console byte, `-1` once the input is exhausted
    fn read_console(&mut self) -> Result<i32, MachineErrorKind> {
        let mut byte = [0; 1];
        match self.input.read_exact(&mut byte) {
            Ok(()) => Ok(byte[0] as i32),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                warn!("Console input exhausted");
                Ok(-1)
            }
            Err(err) => Err(MachineErrorKind::Console(err.kind())),
        }
    }

    /// Runs the RAM range `[offset, offset + len)` as its own statement stream
    fn execute_nested(&mut self, offset: i32, len: i32, depth: usize) -> Result<(), Fault> {
        if len == 0 {
            return Ok(());
        }
        if depth >= self.max_depth {
            return Err(MachineErrorKind::DepthExceeded {
                limit: self.max_depth,
            }
            .into());
        }
        if offset < 0 || len < 0 {
            return Err(MachineErrorKind::AddressOutOfRange {
                region: self.ram.name(),
                address: (if offset < 0 { offset } else { offset.saturating_add(len) }) as i64,
                size: self.ram.len(),
            }
            .into());
        }

        let (start, len) = (offset as usize, len as usize);
        self.ram.read_array(start, len)?;

        debug!("[{}] Executing ram 0x{:x}..0x{:x}", depth + 1, start, start + len);
        self.run(Code::Ram { start, len }, depth + 1)
            .map_err(Fault::Nested)
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal ($arity:literal) , )+ ) => {
        /// Defines the instructions.
        /// An instruction always reserves all of its operand slots, so the
        /// statement length depends on the opcode alone.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            /// Number of operand slots
            pub fn arity(&self) -> usize {
                match self {
                    $( Self::$name => $arity , )+
                }
            }

            /// Bytes from this opcode to the next statement
            pub fn statement_len(&self) -> usize {
                2 + self.arity() * Operand::SIZE
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// Copy a value
    /// @param source
    /// @param destination
    MOV = 0x01 (2),
    /// @param a
    /// @param b
    /// @param destination = a + b
    ADD = 0x02 (3),
    /// @param destination = a - b
    SUB = 0x03 (3),
    /// @param destination = a * b
    MUL = 0x04 (3),
    /// Fails on division by zero
    /// @param destination = a / b
    DIV = 0x05 (3),
    /// Fails on division by zero
    /// @param destination = a % b
    MOD = 0x06 (3),
    /// Read a byte from the console, -1 at end of input
    /// @param destination
    RFI = 0x07 (1),
    /// Write the low byte of a value to the console
    /// @param source
    WTO = 0x08 (1),
    /// @param destination = a & b
    AND = 0x09 (3),
    /// @param destination = a | b
    IOR = 0x0A (3),
    /// @param destination = a ^ b
    XOR = 0x0B (3),
    /// Set the compare flag to a - b
    /// @param a
    /// @param b
    CMP = 0x0C (2),
    /// Jump to an offset within the current statement stream
    /// @param target
    BRN = 0x0D (1),
    /// Read a number from the disk buffer
    /// @param disk offset
    /// @param destination
    RHD = 0x0E (2),
    /// Write a number to the disk buffer
    /// @param value
    /// @param disk offset
    WHD = 0x0F (2),
    /// Run a RAM range as a nested statement stream
    /// @param ram offset
    /// @param length
    EXE = 0x10 (2),
    /// Leave the current statement stream
    END = 0x11 (0),
    /// Copy raw bytes from the disk buffer into RAM
    /// @param disk offset
    /// @param ram offset
    /// @param length
    LHD = 0x12 (3),
}

/// Condition checked against the compare flag before a statement runs
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum Condition {
    Always = 0x00,
    Equal = 0x01,
    NotEqual = 0x02,
    Greater = 0x03,
    NotGreater = 0x04,
    Less = 0x05,
    NotLess = 0x06,
}

impl Condition {
    pub const ALL: &'static [Self] = &[
        Self::Always,
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::NotGreater,
        Self::Less,
        Self::NotLess,
    ];

    pub fn fulfilled(&self, compare: i32) -> bool {
        match self {
            Condition::Always => true,
            Condition::Equal => compare == 0,
            Condition::NotEqual => compare != 0,
            Condition::Greater => compare > 0,
            Condition::NotGreater => compare <= 0,
            Condition::Less => compare < 0,
            Condition::NotLess => compare >= 0,
        }
    }

    /// Mnemonic suffix, `None` for unconditional statements
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Condition::Always => None,
            Condition::Equal => Some("eq"),
            Condition::NotEqual => Some("ne"),
            Condition::Greater => Some("gt"),
            Condition::NotGreater => Some("ng"),
            Condition::Less => Some("lt"),
            Condition::NotLess => Some("nl"),
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|condition| condition.suffix() == Some(suffix))
    }
}
