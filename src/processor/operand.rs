//! Operand addressing.
//!
//! An operand is a mode byte followed by an encoded 4-byte payload:
//!
//! | Mode            | Read                          | Write         |
//! |-----------------|-------------------------------|---------------|
//! | `Register`      | `reg[p]`                      | `reg[p]`      |
//! | `RegisterValue` | number at RAM `reg[p]`        | same address  |
//! | `Pointer`       | number at RAM `p`             | same address  |
//! | `Constant`      | `p`                           | error         |

use std::convert::TryFrom;
use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::registers::Registers;
use crate::codec::{self, NUMBER_SIZE};
use crate::error::MachineErrorKind;
use crate::memory::{Byte, Memory};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum Mode {
    Register = 0x00,
    RegisterValue = 0x01,
    Pointer = 0x02,
    Constant = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub mode: Mode,
    pub payload: i32,
}

impl Operand {
    /// Encoded width: one mode byte plus a number
    pub const SIZE: usize = 1 + NUMBER_SIZE;

    pub fn register(index: i32) -> Self {
        Self {
            mode: Mode::Register,
            payload: index,
        }
    }

    pub fn register_value(index: i32) -> Self {
        Self {
            mode: Mode::RegisterValue,
            payload: index,
        }
    }

    pub fn pointer(address: i32) -> Self {
        Self {
            mode: Mode::Pointer,
            payload: address,
        }
    }

    pub fn constant(value: i32) -> Self {
        Self {
            mode: Mode::Constant,
            payload: value,
        }
    }

    /// Decodes the first [`Operand::SIZE`] bytes of `bytes`
    pub fn decode(bytes: &[Byte]) -> Result<Self, MachineErrorKind> {
        if bytes.len() < Self::SIZE {
            return Err(MachineErrorKind::TruncatedStatement {
                needed: Self::SIZE,
                available: bytes.len(),
            });
        }

        let mode = Mode::try_from(bytes[0])
            .map_err(|_| MachineErrorKind::InvalidMode { mode: bytes[0] })?;
        let mut payload = [0; NUMBER_SIZE];
        payload.copy_from_slice(&bytes[1..Self::SIZE]);

        Ok(Self {
            mode,
            payload: codec::decode(payload),
        })
    }

    pub fn encode(&self) -> Result<[Byte; Self::SIZE], MachineErrorKind> {
        let payload = codec::encode(self.payload)?;
        let mut bytes = [0; Self::SIZE];
        bytes[0] = self.mode.into();
        bytes[1..].copy_from_slice(&payload);
        Ok(bytes)
    }

    pub fn read(&self, registers: &Registers, ram: &Memory) -> Result<i32, MachineErrorKind> {
        match self.mode {
            Mode::Register => registers.get(self.payload),
            Mode::RegisterValue => ram.read_number(registers.get(self.payload)?),
            Mode::Pointer => ram.read_number(self.payload),
            Mode::Constant => Ok(self.payload),
        }
    }

    pub fn write(
        &self,
        registers: &mut Registers,
        ram: &mut Memory,
        value: i32,
    ) -> Result<(), MachineErrorKind> {
        match self.mode {
            Mode::Register => registers.set(self.payload, value),
            Mode::RegisterValue => ram.write_number(registers.get(self.payload)?, value),
            Mode::Pointer => ram.write_number(self.payload, value),
            Mode::Constant => Err(MachineErrorKind::ConstantWrite),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Register => write!(f, "R{}", self.payload),
            Mode::RegisterValue => write!(f, "R${}", self.payload),
            Mode::Pointer => write!(f, "{}", self.payload),
            Mode::Constant => write!(f, "={}", self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    fn state() -> (Registers, Memory) {
        (Registers::new(4), Memory::new("ram", 64))
    }

    #[test]
    fn test_register() -> Result<()> {
        let (mut registers, mut ram) = state();
        let operand = Operand::register(2);

        operand.write(&mut registers, &mut ram, -9)?;
        assert_eq!(operand.read(&registers, &ram)?, -9);
        assert_eq!(registers.get(2)?, -9);
        assert_eq!(ram, Memory::new("ram", 64));

        Ok(())
    }

    #[test]
    fn test_register_value() -> Result<()> {
        let (mut registers, mut ram) = state();
        registers.set(1, 13)?;
        let operand = Operand::register_value(1);

        operand.write(&mut registers, &mut ram, 500)?;
        assert_eq!(operand.read(&registers, &ram)?, 500);
        assert_eq!(ram.read_number(13)?, 500);
        assert_eq!(registers.get(1)?, 13);

        Ok(())
    }

    #[test]
    fn test_pointer() -> Result<()> {
        let (mut registers, mut ram) = state();
        let operand = Operand::pointer(7);

        operand.write(&mut registers, &mut ram, 1234)?;
        assert_eq!(operand.read(&registers, &ram)?, 1234);
        assert_eq!(ram.read_number(7)?, 1234);

        Ok(())
    }

    #[test]
    fn test_constant() -> Result<()> {
        let (mut registers, mut ram) = state();
        let operand = Operand::constant(42);

        assert_eq!(operand.read(&registers, &ram)?, 42);
        assert_eq!(
            operand.write(&mut registers, &mut ram, 1),
            Err(MachineErrorKind::ConstantWrite)
        );

        Ok(())
    }

    #[test]
    fn test_out_of_range() {
        let (mut registers, mut ram) = state();

        assert!(Operand::register(4).read(&registers, &ram).is_err());
        assert!(Operand::pointer(61).read(&registers, &ram).is_err());
        assert!(Operand::pointer(-1).write(&mut registers, &mut ram, 0).is_err());
        assert!(Operand::register_value(9).read(&registers, &ram).is_err());
    }

    #[test]
    fn test_decode() -> Result<()> {
        let operand = Operand::decode(&[0x01, 0, 0, 0, 3, 0xFF])?;
        assert_eq!(operand, Operand::register_value(3));

        assert_eq!(
            Operand::decode(&[0x04, 0, 0, 0, 0]),
            Err(MachineErrorKind::InvalidMode { mode: 0x04 })
        );
        assert!(Operand::decode(&[0x00, 0, 0]).is_err());

        Ok(())
    }

    #[test]
    fn test_encode() -> Result<()> {
        assert_eq!(Operand::constant(-3).encode()?, [0x03, 8, 0, 0, 3]);
        assert_eq!(Operand::pointer(0x100).encode()?, [0x02, 0, 1, 0, 0]);

        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(Operand::register(0).to_string(), "R0");
        assert_eq!(Operand::register_value(2).to_string(), "R$2");
        assert_eq!(Operand::pointer(40).to_string(), "40");
        assert_eq!(Operand::constant(-1).to_string(), "=-1");
    }
}
