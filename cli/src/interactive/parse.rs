use std::str::FromStr;

use ls8_emulator::constants::{Address, Word, MEMORY_SIZE};
use ls8_emulator::runtime::{Computer, Reg};
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{alphanumeric1, digit1};
use nom::combinator::{all_consuming, map, map_res};
use nom::error::{convert_error, VerboseError};
use nom::sequence::preceded;
use nom::{Finish, IResult};
use thiserror::Error;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A number, either in decimal, hexadecimal (`0x`) or binary (`0b`)
fn parse_number(input: &str) -> Res<u16> {
    alt((
        map_res(
            preceded(tag_no_case("0x"), take_while1(|c: char| c.is_ascii_hexdigit())),
            |digits| u16::from_str_radix(digits, 16),
        ),
        map_res(
            preceded(tag_no_case("0b"), take_while1(|c: char| c == '0' || c == '1')),
            |digits| u16::from_str_radix(digits, 2),
        ),
        map_res(digit1, str::parse),
    ))(input)
}

fn parse_register(input: &str) -> Res<Reg> {
    map_res(alphanumeric1, str::parse)(input)
}

fn parse_all<'a, T>(
    input: &'a str,
    parser: impl FnMut(&'a str) -> Res<'a, T>,
) -> Result<T, ParseArgumentError> {
    all_consuming(parser)(input)
        .finish()
        .map(|(_, ret)| ret)
        .map_err(|e| ParseArgumentError(convert_error(input, e)))
}

#[derive(Debug, Error)]
#[error("could not parse argument: {0}")]
pub struct ParseArgumentError(String);

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("address {0:#x} is out of memory")]
    InvalidAddress(u16),

    #[error("value {0} does not fit in a byte")]
    InvalidValue(u16),

    #[error(transparent)]
    Register(#[from] ls8_emulator::runtime::RegisterError),
}

/// A literal number or the value held by a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Literal(u16),
    Register(Reg),
}

impl Argument {
    fn evaluate(self, computer: &Computer) -> Result<u16, EvaluationError> {
        match self {
            Argument::Literal(value) => Ok(value),
            Argument::Register(reg) => Ok(u16::from(computer.registers.get(reg)?)),
        }
    }

    /// Evaluate the argument as a memory address
    pub fn address(self, computer: &Computer) -> Result<Address, EvaluationError> {
        let value = self.evaluate(computer)?;
        if value < MEMORY_SIZE {
            Ok(value)
        } else {
            Err(EvaluationError::InvalidAddress(value))
        }
    }

    /// Evaluate the argument as a byte
    pub fn word(self, computer: &Computer) -> Result<Word, EvaluationError> {
        let value = self.evaluate(computer)?;
        Word::try_from(value).map_err(|_| EvaluationError::InvalidValue(value))
    }
}

impl FromStr for Argument {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_all(
            s,
            alt((
                map(parse_number, Argument::Literal),
                map(parse_register, Argument::Register),
            )),
        )
    }
}

/// Where a `set` command writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    Address(u16),
    Register(Reg),
}

impl FromStr for AssignmentTarget {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_all(
            s,
            alt((
                map(parse_number, AssignmentTarget::Address),
                map(parse_register, AssignmentTarget::Register),
            )),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_argument_test() {
        assert_eq!("42".parse::<Argument>().unwrap(), Argument::Literal(42));
        assert_eq!("0xF4".parse::<Argument>().unwrap(), Argument::Literal(0xF4));
        assert_eq!(
            "0b1000_0010".parse::<Argument>().ok(),
            None,
            "underscores are not allowed"
        );
        assert_eq!(
            "0b10000010".parse::<Argument>().unwrap(),
            Argument::Literal(130)
        );
        assert_eq!("r3".parse::<Argument>().unwrap(), Argument::Register(Reg(3)));
        assert_eq!("SP".parse::<Argument>().unwrap(), Argument::Register(Reg::SP));
        assert!("r9".parse::<Argument>().is_err());
        assert!("".parse::<Argument>().is_err());
    }

    #[test]
    fn parse_target_test() {
        assert_eq!(
            "0x10".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(16)
        );
        assert_eq!(
            "R0".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Register(Reg(0))
        );
    }

    #[test]
    fn evaluate_test() {
        let mut computer = Computer::default();
        computer.registers.set(Reg(1), 0x20).unwrap();

        assert_eq!(Argument::Register(Reg(1)).address(&computer).unwrap(), 0x20);
        assert_eq!(Argument::Register(Reg::SP).word(&computer).unwrap(), 0xF4);
        assert!(Argument::Literal(256).address(&computer).is_err());
        assert!(Argument::Literal(300).word(&computer).is_err());
        assert_eq!(Argument::Literal(255).word(&computer).unwrap(), 255);
    }
}
