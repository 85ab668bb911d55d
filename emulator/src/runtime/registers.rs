use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants::{self as C, Word};

bitflags! {
    /// The `FL` register, only the three low bits are meaningful
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: Word {
        const EQUAL   = 0b001;
        const GREATER = 0b010;
        const LESS    = 0b100;
    }
}

impl std::fmt::Debug for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#05b}", self.bits())
    }
}

/// Represents errors related to register manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid register index {0}")]
    InvalidRegister(u8),
}

/// Index of a general purpose register, as found in an instruction operand
///
/// The index is not checked on construction: programs can reference any
/// byte, and the error is raised when the register is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("R{0}")]
pub struct Reg(pub u8);

impl Reg {
    pub const IM: Reg = Reg(C::INTERRUPT_MASK);
    pub const IS: Reg = Reg(C::INTERRUPT_STATUS);
    pub const SP: Reg = Reg(C::STACK_POINTER);

    /// Iterate over all valid registers
    pub fn all() -> impl Iterator<Item = Reg> {
        (0..C::REGISTER_COUNT).map(Reg)
    }
}

#[derive(Error, Debug)]
#[error("could not parse register")]
pub struct RegisterParseError;

impl std::str::FromStr for Reg {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "im" => Ok(Reg::IM),
            "is" => Ok(Reg::IS),
            "sp" => Ok(Reg::SP),
            other => other
                .strip_prefix('r')
                .and_then(|index| index.parse::<u8>().ok())
                .filter(|&index| index < C::REGISTER_COUNT)
                .map(Reg)
                .ok_or(RegisterParseError),
        }
    }
}

/// The register file: eight general purpose registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    inner: [Word; C::REGISTER_COUNT as usize],
}

impl Default for Registers {
    fn default() -> Self {
        let mut inner = [0; C::REGISTER_COUNT as usize];
        inner[usize::from(C::STACK_POINTER)] = C::STACK_START;
        Self { inner }
    }
}

impl Registers {
    /// Get the value of a register
    ///
    /// # Errors
    ///
    /// It fails if the register index is out of bounds.
    pub fn get(&self, reg: Reg) -> Result<Word, RegisterError> {
        self.inner
            .get(usize::from(reg.0))
            .copied()
            .ok_or(RegisterError::InvalidRegister(reg.0))
    }

    /// Set the value of a register
    ///
    /// # Errors
    ///
    /// It fails if the register index is out of bounds.
    pub fn set(&mut self, reg: Reg, value: Word) -> Result<(), RegisterError> {
        let cell = self
            .inner
            .get_mut(usize::from(reg.0))
            .ok_or(RegisterError::InvalidRegister(reg.0))?;
        *cell = value;
        Ok(())
    }

    /// Value of the stack pointer
    #[must_use]
    pub fn sp(&self) -> Word {
        self.inner[usize::from(C::STACK_POINTER)]
    }

    pub(crate) fn set_sp(&mut self, value: Word) {
        self.inner[usize::from(C::STACK_POINTER)] = value;
    }

    /// Raw view over the register file
    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.inner
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, value) in self.inner.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            if index == usize::from(C::STACK_POINTER) {
                write!(f, "SP={value:02X}")?;
            } else {
                write!(f, "R{index}={value:02X}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test() {
        let registers = Registers::default();
        assert_eq!(registers.as_slice(), &[0, 0, 0, 0, 0, 0, 0, 0xF4]);
        assert_eq!(registers.sp(), 0xF4);
    }

    #[test]
    fn independent_registers_test() {
        let mut registers = Registers::default();
        registers.set(Reg(2), 42).unwrap();
        assert_eq!(registers.get(Reg(2)), Ok(42));
        assert_eq!(registers.get(Reg(1)), Ok(0));
        assert_eq!(registers.get(Reg(3)), Ok(0));
    }

    #[test]
    fn invalid_register_test() {
        let mut registers = Registers::default();
        assert_eq!(
            registers.get(Reg(8)),
            Err(RegisterError::InvalidRegister(8))
        );
        assert_eq!(
            registers.set(Reg(255), 1),
            Err(RegisterError::InvalidRegister(255))
        );
    }

    #[test]
    fn parse_register_test() {
        assert_eq!("r0".parse::<Reg>().unwrap(), Reg(0));
        assert_eq!("R7".parse::<Reg>().unwrap(), Reg(7));
        assert_eq!("sp".parse::<Reg>().unwrap(), Reg::SP);
        assert_eq!("IM".parse::<Reg>().unwrap(), Reg(5));
        assert!("r8".parse::<Reg>().is_err());
        assert!("x1".parse::<Reg>().is_err());
    }

    #[test]
    fn display_test() {
        assert_eq!(Reg(3).to_string(), "R3");
        let mut registers = Registers::default();
        registers.set(Reg(0), 8).unwrap();
        assert_eq!(
            registers.to_string(),
            "R0=08 R1=00 R2=00 R3=00 R4=00 R5=00 R6=00 SP=F4"
        );
    }
}
