use std::convert::TryFrom;
use std::fmt;

use super::operand::Operand;
use super::{Condition, Instruction, MAX_OPERANDS};
use crate::error::MachineErrorKind;
use crate::memory::Byte;

/// One decoded `opcode condition operand*` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Statement {
    pub instruction: Instruction,
    pub condition: Condition,
    operands: [Operand; MAX_OPERANDS],
}

impl Statement {
    /// Builds a statement; `operands` must fill exactly the instruction's slots.
    pub fn new(
        instruction: Instruction,
        condition: Condition,
        operands: &[Operand],
    ) -> Option<Self> {
        if operands.len() != instruction.arity() {
            return None;
        }

        let mut slots = [Operand::constant(0); MAX_OPERANDS];
        slots[..operands.len()].copy_from_slice(operands);

        Some(Self {
            instruction,
            condition,
            operands: slots,
        })
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands[..self.instruction.arity()]
    }

    /// Decodes the opcode and condition bytes only
    pub fn decode_header(bytes: &[Byte]) -> Result<(Instruction, Condition), MachineErrorKind> {
        if bytes.len() < 2 {
            return Err(MachineErrorKind::TruncatedStatement {
                needed: 2,
                available: bytes.len(),
            });
        }

        let instruction = Instruction::try_from(bytes[0])
            .map_err(|_| MachineErrorKind::InvalidOpcode { opcode: bytes[0] })?;
        let condition = Condition::try_from(bytes[1])
            .map_err(|_| MachineErrorKind::InvalidCondition {
                condition: bytes[1],
            })?;

        Ok((instruction, condition))
    }

    /// Decodes a whole statement from the start of `bytes`
    pub fn decode(bytes: &[Byte]) -> Result<Self, MachineErrorKind> {
        let (instruction, condition) = Self::decode_header(bytes)?;

        let len = instruction.statement_len();
        if bytes.len() < len {
            return Err(MachineErrorKind::TruncatedStatement {
                needed: len,
                available: bytes.len(),
            });
        }

        let mut operands = [Operand::constant(0); MAX_OPERANDS];
        for (slot, chunk) in operands
            .iter_mut()
            .zip(bytes[2..len].chunks_exact(Operand::SIZE))
        {
            *slot = Operand::decode(chunk)?;
        }

        Ok(Self {
            instruction,
            condition,
            operands,
        })
    }

    pub fn encode(&self) -> Result<Vec<Byte>, MachineErrorKind> {
        let mut bytes = Vec::with_capacity(self.instruction.statement_len());
        bytes.push(self.instruction.into());
        bytes.push(self.condition.into());
        for operand in self.operands() {
            bytes.extend_from_slice(&operand.encode()?);
        }
        Ok(bytes)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.instruction.name().to_lowercase())?;
        if let Some(suffix) = self.condition.suffix() {
            write!(f, ".{}", suffix)?;
        }
        for operand in self.operands() {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}
