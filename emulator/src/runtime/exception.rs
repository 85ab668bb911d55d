use thiserror::Error;

use crate::constants::{Address, Word};

use super::memory::MemoryError;
use super::registers::RegisterError;

/// Faults raised while executing a program
///
/// None of them is recoverable: the current run stops on the first one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    #[error("unsupported operation {opcode:#010b} at address {address:#04x}")]
    UnsupportedOperation { opcode: Word, address: Address },

    #[error("division by zero")]
    DivisionByZero,

    #[error("out of bounds memory access ({0})")]
    InvalidMemoryAccess(#[from] MemoryError),

    #[error("out of bounds register access ({0})")]
    InvalidRegisterAccess(#[from] RegisterError),
}

impl Exception {
    /// Whether this is an out of bounds access, to memory or to a register
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Exception::InvalidMemoryAccess(_) | Exception::InvalidRegisterAccess(_)
        )
    }
}
