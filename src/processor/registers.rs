use crate::error::MachineErrorKind;

/// Index-addressed integer registers plus the compare flag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Registers {
    regs: Vec<i32>,
    /// Result of the last `CMP`, read by every conditional statement
    compare: i32,
}

impl Registers {
    /// Creates `count` zeroed registers
    pub fn new(count: usize) -> Self {
        Self {
            regs: vec![0; count],
            compare: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    fn slot(&self, index: i32) -> Result<usize, MachineErrorKind> {
        if index >= 0 && (index as usize) < self.regs.len() {
            Ok(index as usize)
        } else {
            Err(MachineErrorKind::RegisterOutOfRange {
                index,
                available: self.regs.len(),
            })
        }
    }

    pub fn get(&self, index: i32) -> Result<i32, MachineErrorKind> {
        let slot = self.slot(index)?;
        Ok(self.regs[slot])
    }

    pub fn set(&mut self, index: i32, value: i32) -> Result<(), MachineErrorKind> {
        let slot = self.slot(index)?;
        self.regs[slot] = value;
        Ok(())
    }

    pub fn compare(&self) -> i32 {
        self.compare
    }

    pub fn set_compare(&mut self, value: i32) {
        self.compare = value;
    }
}
