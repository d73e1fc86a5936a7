use std::error;
use std::fmt;
use std::io;

/// Everything that can stop an execution scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineErrorKind {
    NumberOutOfRange { value: i32 },
    InvalidOpcode { opcode: u8 },
    InvalidCondition { condition: u8 },
    InvalidMode { mode: u8 },
    ConstantWrite,
    RegisterOutOfRange { index: i32, available: usize },
    AddressOutOfRange { region: &'static str, address: i64, size: usize },
    TruncatedStatement { needed: usize, available: usize },
    InvalidBranchTarget { target: i32 },
    DivisionByZero,
    DepthExceeded { limit: usize },
    Console(io::ErrorKind),
}

impl fmt::Display for MachineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineErrorKind::NumberOutOfRange { value } => {
                write!(f, "`{}` cannot be encoded as a machine number", value)
            }
            MachineErrorKind::InvalidOpcode { opcode } => {
                write!(f, "invalid opcode `0x{:02X}`", opcode)
            }
            MachineErrorKind::InvalidCondition { condition } => {
                write!(f, "invalid condition `0x{:02X}`", condition)
            }
            MachineErrorKind::InvalidMode { mode } => {
                write!(f, "invalid addressing mode `0x{:02X}`", mode)
            }
            MachineErrorKind::ConstantWrite => f.write_str("cannot set the value of a constant"),
            MachineErrorKind::RegisterOutOfRange { index, available } => write!(
                f,
                "register `{}` does not exist ({} available)",
                index, available
            ),
            MachineErrorKind::AddressOutOfRange {
                region,
                address,
                size,
            } => write!(
                f,
                "{} has no address `0x{:x}` (size 0x{:x})",
                region, address, size
            ),
            MachineErrorKind::TruncatedStatement { needed, available } => write!(
                f,
                "statement needs {} bytes but only {} remain",
                needed, available
            ),
            MachineErrorKind::InvalidBranchTarget { target } => {
                write!(f, "cannot branch to `{}`", target)
            }
            MachineErrorKind::DivisionByZero => f.write_str("division by zero"),
            MachineErrorKind::DepthExceeded { limit } => {
                write!(f, "nested execution deeper than {}", limit)
            }
            MachineErrorKind::Console(kind) => write!(f, "console failed: {:?}", kind),
        }
    }
}

impl error::Error for MachineErrorKind {}

/// A [`MachineErrorKind`] together with where the engine was when it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineError {
    kind: MachineErrorKind,
    position: usize,
    depth: usize,
}

impl MachineError {
    pub fn new(kind: MachineErrorKind, position: usize, depth: usize) -> Self {
        Self {
            kind,
            position,
            depth,
        }
    }

    pub fn kind(&self) -> MachineErrorKind {
        self.kind
    }

    /// Byte offset of the failing statement within its statement stream
    pub fn position(&self) -> usize {
        self.position
    }

    /// Nesting depth of the failing stream, `0` for the top level
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error [pos: 0x{:x}, depth: {}]: {}",
            self.position, self.depth, self.kind
        )
    }
}

impl error::Error for MachineError {}

pub type Result<T, E = MachineError> = std::result::Result<T, E>;
