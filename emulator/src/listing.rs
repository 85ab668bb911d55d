//! Disassembly of the memory content
//!
//! Memory is walked sequentially from a start address, each opcode telling how many operand
//! bytes follow it. Bytes which do not decode to a known instruction are shown as raw data.

use crate::constants::{Address, Word};
use crate::runtime::{Instruction, Memory, RawInstruction};

/// A disassembled line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Address of the first byte
    pub address: Address,

    /// Bytes covered by this line
    pub bytes: Vec<Word>,

    /// The decoded instruction, if the bytes make one
    pub instruction: Option<Instruction>,
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes: Vec<String> = self.bytes.iter().map(|b| format!("{b:02X}")).collect();
        write!(f, "{:02X}: {:<8}  ", self.address, bytes.join(" "))?;
        match (&self.instruction, self.bytes.first()) {
            (Some(instruction), _) => write!(f, "{instruction}"),
            (None, Some(byte)) => write!(f, "DB   {byte:#010b}"),
            (None, None) => Ok(()),
        }
    }
}

/// Iterator over the disassembled lines of a memory region
pub struct Listing<'a> {
    memory: &'a Memory,
    address: Address,
    end: Address,
}

impl<'a> Listing<'a> {
    /// Disassemble the memory from `start` up to `end` (excluded)
    #[must_use]
    pub fn new(memory: &'a Memory, start: Address, end: Address) -> Self {
        Self {
            memory,
            address: start,
            end,
        }
    }

    fn decode_at(&self, address: Address) -> Option<Line> {
        let opcode = self.memory.get(address).ok()?;
        let raw = RawInstruction {
            address,
            opcode,
            operands: [0, 0],
        };

        let operands: Option<Vec<Word>> = (1..raw.size())
            .map(|offset| self.memory.get(address + offset).ok())
            .collect();

        let decoded = operands.and_then(|operands| {
            let mut raw = raw;
            for (slot, operand) in raw.operands.iter_mut().zip(&operands) {
                *slot = *operand;
            }
            let instruction = raw.decode().ok()?;
            Some((operands, instruction))
        });

        let line = match decoded {
            Some((operands, instruction)) => Line {
                address,
                bytes: std::iter::once(opcode).chain(operands).collect(),
                instruction: Some(instruction),
            },
            None => Line {
                address,
                bytes: vec![opcode],
                instruction: None,
            },
        };

        Some(line)
    }
}

impl Iterator for Listing<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        if self.address >= self.end {
            return None;
        }

        let line = self.decode_at(self.address)?;
        let size = Address::try_from(line.bytes.len()).ok()?;
        self.address += size;
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn listing(program: &[Word]) -> String {
        let memory = Memory::with_program(program).unwrap();
        let end = Address::try_from(program.len()).unwrap();
        Listing::new(&memory, 0, end)
            .map(|line| format!("{line}\n"))
            .collect()
    }

    #[test]
    fn listing_test() {
        let program = [
            0b1000_0010, 0, 8, // LDI R0, 8
            0b1000_0010, 1, 9, // LDI R1, 9
            0b1010_0010, 0, 1, // MUL R0, R1
            0b0100_0111, 0, // PRN R0
            0b0000_0001, // HLT
        ];
        assert_eq!(
            listing(&program),
            indoc! {"
                00: 82 00 08  LDI  R0, 8
                03: 82 01 09  LDI  R1, 9
                06: A2 00 01  MUL  R0, R1
                09: 47 00     PRN  R0
                0B: 01        HLT
            "}
        );
    }

    #[test]
    fn invalid_bytes_test() {
        assert_eq!(
            listing(&[0, 0b1010_1111, 0b0101_0000, 2]),
            indoc! {"
                00: 00        DB   0b00000000
                01: AF        DB   0b10101111
                02: 50 02     CALL R2
            "}
        );
    }

    #[test]
    fn end_of_memory_test() {
        let mut memory = Memory::default();
        memory.set(0xFF, 0b1000_0010).unwrap();
        let lines: Vec<Line> = Listing::new(&memory, 0xFF, 0x100).collect();
        assert_eq!(
            lines,
            vec![Line {
                address: 0xFF,
                bytes: vec![0b1000_0010],
                instruction: None,
            }]
        );
    }
}
