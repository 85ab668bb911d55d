//! The arithmetic and logic unit
//!
//! Every ALU instruction works on two registers: the result is stored in the first one, the
//! second one is left untouched. Results wrap around the 8-bit width of the registers.

use parse_display::Display;
use tracing::debug;

use super::exception::Exception;
use super::registers::{Flags, Reg, Registers};

/// Operations handled by the ALU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "UPPERCASE")]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
}

impl AluOp {
    /// Apply the operation on the `a` and `b` registers
    ///
    /// # Errors
    ///
    /// Fails on a division by zero, or if one of the registers does not exist. The registers
    /// and flags are left untouched in that case.
    pub fn apply(
        self,
        registers: &mut Registers,
        flags: &mut Flags,
        a: Reg,
        b: Reg,
    ) -> Result<(), Exception> {
        let x = registers.get(a)?;
        let y = registers.get(b)?;

        let res = match self {
            AluOp::Add => x.wrapping_add(y),
            AluOp::Sub => x.wrapping_sub(y),
            AluOp::Mul => x.wrapping_mul(y),
            AluOp::Div => x.checked_div(y).ok_or(Exception::DivisionByZero)?,
            AluOp::Cmp => {
                *flags = match x.cmp(&y) {
                    std::cmp::Ordering::Less => Flags::LESS,
                    std::cmp::Ordering::Equal => Flags::EQUAL,
                    std::cmp::Ordering::Greater => Flags::GREATER,
                };
                debug!("cmp({}, {}) => {:?}", x, y, flags);
                return Ok(());
            }
        };

        debug!("{} {} {} = {}", x, self, y, res);
        registers.set(a, res)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registers(x: u8, y: u8) -> Registers {
        let mut registers = Registers::default();
        registers.set(Reg(0), x).unwrap();
        registers.set(Reg(1), y).unwrap();
        registers
    }

    fn apply(op: AluOp, x: u8, y: u8) -> Result<(u8, u8, Flags), Exception> {
        let mut registers = registers(x, y);
        let mut flags = Flags::default();
        op.apply(&mut registers, &mut flags, Reg(0), Reg(1))?;
        Ok((
            registers.get(Reg(0)).unwrap(),
            registers.get(Reg(1)).unwrap(),
            flags,
        ))
    }

    #[test]
    fn arithmetic_test() {
        assert_eq!(apply(AluOp::Add, 8, 9), Ok((17, 9, Flags::empty())));
        assert_eq!(apply(AluOp::Sub, 9, 8), Ok((1, 8, Flags::empty())));
        assert_eq!(apply(AluOp::Mul, 8, 9), Ok((72, 9, Flags::empty())));
        assert_eq!(apply(AluOp::Div, 72, 9), Ok((8, 9, Flags::empty())));
        // Integer division rounds down
        assert_eq!(apply(AluOp::Div, 7, 2), Ok((3, 2, Flags::empty())));
    }

    #[test]
    fn wrapping_test() {
        assert_eq!(apply(AluOp::Add, 200, 100), Ok((44, 100, Flags::empty())));
        assert_eq!(apply(AluOp::Sub, 1, 2), Ok((255, 2, Flags::empty())));
        assert_eq!(apply(AluOp::Mul, 16, 17), Ok((16, 17, Flags::empty())));
    }

    #[test]
    fn exhaustive_arithmetic_test() {
        for x in [0u8, 1, 7, 100, 128, 255] {
            for y in [0u8, 1, 3, 64, 200, 255] {
                let sum = u8::try_from((u16::from(x) + u16::from(y)) % 256).unwrap();
                let product = u8::try_from((u16::from(x) * u16::from(y)) % 256).unwrap();
                let difference = u8::try_from((256 + u16::from(x) - u16::from(y)) % 256).unwrap();
                assert_eq!(apply(AluOp::Add, x, y).unwrap().0, sum);
                assert_eq!(apply(AluOp::Mul, x, y).unwrap().0, product);
                assert_eq!(apply(AluOp::Sub, x, y).unwrap().0, difference);
            }
        }
    }

    #[test]
    fn division_by_zero_test() {
        let mut registers = registers(8, 0);
        let mut flags = Flags::default();
        let res = AluOp::Div.apply(&mut registers, &mut flags, Reg(0), Reg(1));
        assert_eq!(res, Err(Exception::DivisionByZero));
        assert_eq!(registers.get(Reg(0)), Ok(8));
    }

    #[test]
    fn compare_test() {
        assert_eq!(apply(AluOp::Cmp, 5, 5), Ok((5, 5, Flags::EQUAL)));
        assert_eq!(apply(AluOp::Cmp, 6, 5), Ok((6, 5, Flags::GREATER)));
        assert_eq!(apply(AluOp::Cmp, 4, 5), Ok((4, 5, Flags::LESS)));
    }

    #[test]
    fn compare_resets_flags_test() {
        let mut registers = registers(1, 2);
        let mut flags = Flags::all();
        AluOp::Cmp
            .apply(&mut registers, &mut flags, Reg(0), Reg(1))
            .unwrap();
        assert_eq!(flags, Flags::LESS);
    }

    #[test]
    fn same_register_test() {
        let mut registers = registers(12, 0);
        let mut flags = Flags::default();
        AluOp::Add
            .apply(&mut registers, &mut flags, Reg(0), Reg(0))
            .unwrap();
        assert_eq!(registers.get(Reg(0)), Ok(24));
    }

    #[test]
    fn invalid_register_test() {
        let mut registers = registers(1, 2);
        let mut flags = Flags::default();
        let res = AluOp::Add.apply(&mut registers, &mut flags, Reg(0), Reg(9));
        assert!(matches!(res, Err(Exception::InvalidRegisterAccess(_))));
    }

    #[test]
    fn display_test() {
        assert_eq!(AluOp::Add.to_string(), "ADD");
        assert_eq!(AluOp::Cmp.to_string(), "CMP");
    }
}
