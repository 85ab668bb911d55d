use thiserror::Error;

use crate::constants::{Address, Word, MEMORY_SIZE};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was out of bounds
    #[error("invalid address {0:#04x}")]
    InvalidAddress(Address),

    /// The data does not fit in memory
    #[error("{size} bytes do not fit in memory")]
    TooLarge { size: usize },
}

/// Holds the memory cells of the computer.
///
/// It has 256 cells, all zeroed on startup
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Box<[Word; MEMORY_SIZE as usize]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: Box::new([0; MEMORY_SIZE as usize]),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory([...; {MEMORY_SIZE}])")
    }
}

impl Memory {
    /// Build a memory with the given bytes placed at address 0
    ///
    /// # Errors
    ///
    /// It fails if the bytes do not fit in memory.
    pub fn with_program(program: &[Word]) -> Result<Self, MemoryError> {
        let mut memory = Self::default();
        memory.load(program)?;
        Ok(memory)
    }

    /// Copy the given bytes at the beginning of the memory
    ///
    /// # Errors
    ///
    /// It fails if the bytes do not fit in memory.
    pub fn load(&mut self, program: &[Word]) -> Result<(), MemoryError> {
        let target = self
            .inner
            .get_mut(..program.len())
            .ok_or(MemoryError::TooLarge {
                size: program.len(),
            })?;
        target.copy_from_slice(program);
        Ok(())
    }

    /// Read the cell at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get(&self, address: Address) -> Result<Word, MemoryError> {
        self.inner
            .get(usize::from(address))
            .copied()
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Get a mutable reference to a cell at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get_mut(&mut self, address: Address) -> Result<&mut Word, MemoryError> {
        self.inner
            .get_mut(usize::from(address))
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Write a value at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn set(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        *self.get_mut(address)? = value;
        Ok(())
    }

    /// Iterate over all the cells with their address
    pub fn iter(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        (0..MEMORY_SIZE).zip(self.inner.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_test() {
        let memory = Memory::default();
        assert!(memory.iter().all(|(_, cell)| cell == 0));
        assert_eq!(memory.iter().count(), 256);
    }

    #[test]
    fn read_write_test() {
        let mut memory = Memory::default();
        memory.set(0x42, 8).unwrap();
        memory.set(0xFF, 1).unwrap();
        assert_eq!(memory.get(0x42), Ok(8));
        assert_eq!(memory.get(0xFF), Ok(1));
        // Cells are independent from each other
        assert_eq!(memory.get(0x41), Ok(0));
        assert_eq!(memory.get(0x43), Ok(0));
    }

    #[test]
    fn out_of_bounds_test() {
        let mut memory = Memory::default();
        assert_eq!(memory.get(256), Err(MemoryError::InvalidAddress(256)));
        assert_eq!(memory.set(300, 1), Err(MemoryError::InvalidAddress(300)));
    }

    #[test]
    fn load_test() {
        let memory = Memory::with_program(&[0b1000_0010, 0, 8, 1]).unwrap();
        assert_eq!(memory.get(0), Ok(130));
        assert_eq!(memory.get(2), Ok(8));
        assert_eq!(memory.get(3), Ok(1));
        assert_eq!(memory.get(4), Ok(0));

        assert!(Memory::with_program(&[0; 256]).is_ok());
        assert_eq!(
            Memory::with_program(&[0; 257]),
            Err(MemoryError::TooLarge { size: 257 })
        );
    }
}
