use super::Computer;

/// One-line dump of the computer state, for debugging
///
/// It shows the program counter, the flags, the three bytes at the program counter and all
/// the registers, in hexadecimal. Bytes past the end of memory are shown as `--`.
pub struct Trace<'a> {
    computer: &'a Computer,
}

impl<'a> Trace<'a> {
    pub(crate) fn new(computer: &'a Computer) -> Self {
        Self { computer }
    }
}

impl std::fmt::Display for Trace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let computer = self.computer;
        write!(
            f,
            "TRACE: {:02X} | {:02X} |",
            computer.pc,
            computer.flags.bits()
        )?;

        for offset in 0..3 {
            match computer.memory.get(computer.pc + offset) {
                Ok(byte) => write!(f, " {byte:02X}")?,
                Err(_) => write!(f, " --")?,
            }
        }

        write!(f, " |")?;

        for value in computer.registers.as_slice() {
            write!(f, " {value:02X}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{Computer, Flags, Reg};

    #[test]
    fn trace_test() {
        let mut computer = Computer::with_program(&[0b1000_0010, 0, 8]).unwrap();
        insta::assert_snapshot!(
            computer.trace().to_string(),
            @"TRACE: 00 | 00 | 82 00 08 | 00 00 00 00 00 00 00 F4"
        );

        computer.pc = 0xFE;
        computer.flags = Flags::GREATER;
        computer.registers.set(Reg(1), 0xAB).unwrap();
        insta::assert_snapshot!(
            computer.trace().to_string(),
            @"TRACE: FE | 02 | 00 00 -- | 00 AB 00 00 00 00 00 F4"
        );
    }
}
