use std::ops::Range;

use crate::codec::{self, NUMBER_SIZE};
use crate::error::MachineErrorKind;

pub mod disk;
pub mod parse;

pub type Byte = u8;

/// A fixed-size, bounds-checked byte store. Used for RAM and the disk buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory {
    /// Name used in error messages
    name: &'static str,
    /// The actual data of the memory
    data: Vec<Byte>,
}

impl Memory {
    /// Allocates zeroed memory of `size` bytes
    pub fn new(name: &'static str, size: usize) -> Self {
        Self::from_bytes(name, vec![0; size])
    }

    /// Wraps existing bytes; the size never changes afterwards
    pub fn from_bytes(name: &'static str, data: Vec<Byte>) -> Self {
        Memory { name, data }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[Byte] {
        &self.data
    }

    /// Resolves `len` bytes starting at `address` to an index range
    fn span(&self, address: i64, len: usize) -> Result<Range<usize>, MachineErrorKind> {
        let out_of_range = MachineErrorKind::AddressOutOfRange {
            region: self.name,
            address,
            size: self.data.len(),
        };

        if address < 0 {
            return Err(out_of_range);
        }
        let start = address as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(out_of_range),
        }
    }

    /// Reads a byte from the memory
    pub fn read_byte(&self, address: i32) -> Result<Byte, MachineErrorKind> {
        let range = self.span(address as i64, 1)?;
        Ok(self.data[range.start])
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, address: i32, value: Byte) -> Result<(), MachineErrorKind> {
        let range = self.span(address as i64, 1)?;
        self.data[range.start] = value;
        Ok(())
    }

    /// Reads an encoded number at any (unaligned) address
    pub fn read_number(&self, address: i32) -> Result<i32, MachineErrorKind> {
        let range = self.span(address as i64, NUMBER_SIZE)?;
        let mut bytes = [0; NUMBER_SIZE];
        bytes.copy_from_slice(&self.data[range]);
        Ok(codec::decode(bytes))
    }

    /// Encodes `value` and writes it at any (unaligned) address
    pub fn write_number(&mut self, address: i32, value: i32) -> Result<(), MachineErrorKind> {
        let range = self.span(address as i64, NUMBER_SIZE)?;
        let bytes = codec::encode(value)?;
        self.data[range].copy_from_slice(&bytes);
        Ok(())
    }

    /// Borrows `len` bytes starting at `address`
    pub fn read_array(&self, address: usize, len: usize) -> Result<&[Byte], MachineErrorKind> {
        let range = self.span(address as i64, len)?;
        Ok(&self.data[range])
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, address: usize, data: &[Byte]) -> Result<(), MachineErrorKind> {
        let range = self.span(address as i64, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }
}
