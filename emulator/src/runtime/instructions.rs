use std::io::Write;

use parse_display::Display;
use tracing::{debug, info};

use crate::constants::{Address, Word};

use super::{
    alu::AluOp,
    exception::Exception,
    memory::{Memory, MemoryError},
    registers::{Flags, Reg},
    Computer, ProcessorError,
};

/// Every opcode known by the processor
///
/// The two high bits of an opcode hold its number of operands, bit 5 marks ALU instructions
/// and bit 4 marks instructions that set the program counter themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "UPPERCASE")]
pub enum Opcode {
    Hlt,
    Ret,
    Push,
    Pop,
    Prn,
    Call,
    Jmp,
    Jeq,
    Jne,
    Ldi,
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
}

impl Opcode {
    pub const ALL: [Opcode; 15] = [
        Opcode::Hlt,
        Opcode::Ret,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Call,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Ldi,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Cmp,
    ];

    /// The encoded value of the opcode
    #[must_use]
    pub const fn byte(self) -> Word {
        match self {
            Opcode::Hlt => 0b0000_0001,
            Opcode::Ret => 0b0001_0001,
            Opcode::Push => 0b0100_0101,
            Opcode::Pop => 0b0100_0110,
            Opcode::Prn => 0b0100_0111,
            Opcode::Call => 0b0101_0000,
            Opcode::Jmp => 0b0101_0100,
            Opcode::Jeq => 0b0101_0101,
            Opcode::Jne => 0b0101_0110,
            Opcode::Ldi => 0b1000_0010,
            Opcode::Add => 0b1010_0000,
            Opcode::Sub => 0b1010_0001,
            Opcode::Mul => 0b1010_0010,
            Opcode::Div => 0b1010_0011,
            Opcode::Cmp => 0b1010_0111,
        }
    }

    /// Find the opcode encoded by a byte
    #[must_use]
    pub fn from_byte(byte: Word) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.byte() == byte)
    }

    /// The ALU operation behind this opcode, if any
    #[must_use]
    pub const fn alu(self) -> Option<AluOp> {
        match self {
            Opcode::Add => Some(AluOp::Add),
            Opcode::Sub => Some(AluOp::Sub),
            Opcode::Mul => Some(AluOp::Mul),
            Opcode::Div => Some(AluOp::Div),
            Opcode::Cmp => Some(AluOp::Cmp),
            _ => None,
        }
    }
}

/// An instruction as fetched from memory: the opcode and the two bytes following it
///
/// Both operand bytes are always read, even if the instruction uses less.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInstruction {
    pub address: Address,
    pub opcode: Word,
    pub operands: [Word; 2],
}

impl RawInstruction {
    /// Fetch the instruction at the given address
    ///
    /// # Errors
    ///
    /// Fails if the opcode or one of the two bytes following it is out of memory.
    pub fn fetch(memory: &Memory, address: Address) -> Result<Self, MemoryError> {
        Ok(Self {
            address,
            opcode: memory.get(address)?,
            operands: [memory.get(address + 1)?, memory.get(address + 2)?],
        })
    }

    /// Number of operands used by the instruction
    #[must_use]
    pub const fn operand_count(&self) -> u8 {
        self.opcode >> 6
    }

    /// Whether the instruction is handled by the ALU
    #[must_use]
    pub const fn is_alu(&self) -> bool {
        (self.opcode >> 5) & 1 == 1
    }

    /// Whether the instruction sets the program counter by itself
    #[must_use]
    pub const fn sets_pc(&self) -> bool {
        (self.opcode >> 4) & 1 == 1
    }

    /// Size of the instruction in memory, opcode included
    #[must_use]
    pub fn size(&self) -> Address {
        Address::from(self.operand_count()) + 1
    }

    fn unsupported(&self) -> Exception {
        Exception::UnsupportedOperation {
            opcode: self.opcode,
            address: self.address,
        }
    }

    /// Decode the instruction
    ///
    /// # Errors
    ///
    /// Fails if the opcode is unknown.
    pub fn decode(&self) -> Result<Instruction, Exception> {
        let [a, b] = self.operands;
        let opcode = Opcode::from_byte(self.opcode);

        if self.is_alu() {
            return opcode
                .and_then(Opcode::alu)
                .map(|op| Instruction::Alu(op, Reg(a), Reg(b)))
                .ok_or_else(|| self.unsupported());
        }

        let instruction = match opcode {
            Some(Opcode::Hlt) => Instruction::Hlt,
            Some(Opcode::Ret) => Instruction::Ret,
            Some(Opcode::Push) => Instruction::Push(Reg(a)),
            Some(Opcode::Pop) => Instruction::Pop(Reg(a)),
            Some(Opcode::Prn) => Instruction::Prn(Reg(a)),
            Some(Opcode::Call) => Instruction::Call(Reg(a)),
            Some(Opcode::Jmp) => Instruction::Jmp(Reg(a)),
            Some(Opcode::Jeq) => Instruction::Jeq(Reg(a)),
            Some(Opcode::Jne) => Instruction::Jne(Reg(a)),
            Some(Opcode::Ldi) => Instruction::Ldi(Reg(a), b),
            Some(Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Cmp) | None => {
                return Err(self.unsupported())
            }
        };

        Ok(instruction)
    }
}

/// What the execution loop should do after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Halt,
}

/// A decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Halt the computer
    Hlt,

    /// Pop the return address from the stack and jump to it
    Ret,

    /// Push a register on the stack
    Push(Reg),

    /// Pop the top of the stack into a register
    Pop(Reg),

    /// Print the decimal value of a register
    Prn(Reg),

    /// Push the address of the next instruction and jump to the address held by a register
    Call(Reg),

    /// Unconditional jump
    Jmp(Reg),

    /// Jump if equal
    Jeq(Reg),

    /// Jump if not equal
    Jne(Reg),

    /// Load an immediate value in a register
    Ldi(Reg, Word),

    /// Arithmetic or comparison between two registers
    Alu(AluOp, Reg, Reg),
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hlt => write!(f, "HLT"),
            Self::Ret => write!(f, "RET"),
            Self::Push(reg) => write!(f, "PUSH {reg}"),
            Self::Pop(reg) => write!(f, "POP  {reg}"),
            Self::Prn(reg) => write!(f, "PRN  {reg}"),
            Self::Call(reg) => write!(f, "CALL {reg}"),
            Self::Jmp(reg) => write!(f, "JMP  {reg}"),
            Self::Jeq(reg) => write!(f, "JEQ  {reg}"),
            Self::Jne(reg) => write!(f, "JNE  {reg}"),
            Self::Ldi(reg, value) => write!(f, "LDI  {reg}, {value}"),
            Self::Alu(op, a, b) => write!(f, "{:4} {a}, {b}", op.to_string()),
        }
    }
}

impl Instruction {
    /// Execute the instruction
    ///
    /// The program counter is only touched by instructions which set it themselves, the
    /// execution loop takes care of advancing it for the others.
    #[tracing::instrument(skip(computer, out))]
    pub(crate) fn execute(
        &self,
        computer: &mut Computer,
        out: &mut dyn Write,
    ) -> Result<Outcome, ProcessorError> {
        use Instruction::{Alu, Call, Hlt, Jeq, Jmp, Jne, Ldi, Pop, Prn, Push, Ret};

        match *self {
            Hlt => {
                info!(address = computer.pc, "Halting");
                return Ok(Outcome::Halt);
            }

            Ldi(reg, value) => {
                computer.registers.set(reg, value)?;
            }

            Prn(reg) => {
                let value = computer.registers.get(reg)?;
                writeln!(out, "{value}")?;
            }

            Push(reg) => {
                let value = computer.registers.get(reg)?;
                debug!("push({})", value);
                computer.push(value)?;
            }

            Pop(reg) => {
                // Check the register before moving the stack pointer
                computer.registers.get(reg)?;
                let value = computer.pop()?;
                debug!("pop => {}", value);
                computer.registers.set(reg, value)?;
            }

            Call(reg) => {
                let target = computer.registers.get(reg)?;
                let ret = computer.pc + 2;
                let ret = Word::try_from(ret).map_err(|_| MemoryError::InvalidAddress(ret))?;
                computer.push(ret)?;
                computer.jump(target);
            }

            Ret => {
                let ret = computer.pop()?;
                debug!("Returning to {:#04x}", ret);
                computer.jump(ret);
            }

            Jmp(reg) => {
                let target = computer.registers.get(reg)?;
                computer.jump(target);
            }

            Jeq(reg) => {
                computer.branch(reg, computer.flags.contains(Flags::EQUAL))?;
            }

            Jne(reg) => {
                computer.branch(reg, !computer.flags.contains(Flags::EQUAL))?;
            }

            Alu(op, a, b) => {
                op.apply(&mut computer.registers, &mut computer.flags, a, b)?;
            }
        }

        Ok(Outcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(opcode: Word, a: Word, b: Word) -> RawInstruction {
        RawInstruction {
            address: 0,
            opcode,
            operands: [a, b],
        }
    }

    #[test]
    fn opcode_table_test() {
        let table: Vec<(String, Word)> = Opcode::ALL
            .iter()
            .map(|op| (op.to_string(), op.byte()))
            .collect();
        let expected: Vec<(String, Word)> = [
            ("HLT", 1),
            ("RET", 17),
            ("PUSH", 69),
            ("POP", 70),
            ("PRN", 71),
            ("CALL", 80),
            ("JMP", 84),
            ("JEQ", 85),
            ("JNE", 86),
            ("LDI", 130),
            ("ADD", 160),
            ("SUB", 161),
            ("MUL", 162),
            ("DIV", 163),
            ("CMP", 167),
        ]
        .into_iter()
        .map(|(name, byte)| (name.to_string(), byte))
        .collect();
        assert_eq!(table, expected);

        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(op));
        }
        assert_eq!(Opcode::from_byte(0), None);
    }

    #[test]
    fn opcode_bits_test() {
        for op in Opcode::ALL {
            let raw = raw(op.byte(), 0, 0);
            assert_eq!(raw.is_alu(), op.alu().is_some(), "{op}");
        }

        let ldi = raw(Opcode::Ldi.byte(), 0, 8);
        assert_eq!(ldi.operand_count(), 2);
        assert_eq!(ldi.size(), 3);
        assert!(!ldi.sets_pc());

        let prn = raw(Opcode::Prn.byte(), 0, 0);
        assert_eq!(prn.operand_count(), 1);
        assert!(!prn.sets_pc());

        for op in [Opcode::Call, Opcode::Ret, Opcode::Jmp, Opcode::Jeq, Opcode::Jne] {
            assert!(raw(op.byte(), 0, 0).sets_pc(), "{op}");
        }

        let hlt = raw(Opcode::Hlt.byte(), 0, 0);
        assert_eq!(hlt.operand_count(), 0);
        assert_eq!(hlt.size(), 1);
    }

    #[test]
    fn decode_test() {
        assert_eq!(
            raw(0b1000_0010, 0, 8).decode(),
            Ok(Instruction::Ldi(Reg(0), 8))
        );
        assert_eq!(raw(0b0100_0111, 3, 99).decode(), Ok(Instruction::Prn(Reg(3))));
        assert_eq!(
            raw(0b1010_0111, 1, 2).decode(),
            Ok(Instruction::Alu(AluOp::Cmp, Reg(1), Reg(2)))
        );
        assert_eq!(raw(0b0000_0001, 4, 5).decode(), Ok(Instruction::Hlt));
    }

    #[test]
    fn decode_unsupported_test() {
        // Nothing at address 0
        assert_eq!(
            raw(0, 0, 0).decode(),
            Err(Exception::UnsupportedOperation {
                opcode: 0,
                address: 0
            })
        );

        // ALU bit set, but not a known ALU operation
        assert_eq!(
            raw(0b1010_1111, 0, 1).decode(),
            Err(Exception::UnsupportedOperation {
                opcode: 0b1010_1111,
                address: 0
            })
        );
    }

    #[test]
    fn fetch_test() {
        let memory = Memory::with_program(&[0b1000_0010, 0, 8, 1]).unwrap();
        assert_eq!(
            RawInstruction::fetch(&memory, 0),
            Ok(RawInstruction {
                address: 0,
                opcode: 0b1000_0010,
                operands: [0, 8]
            })
        );

        assert_eq!(
            RawInstruction::fetch(&memory, 254),
            Err(MemoryError::InvalidAddress(256))
        );
    }

    #[test]
    fn display_test() {
        assert_eq!(Instruction::Hlt.to_string(), "HLT");
        assert_eq!(Instruction::Ldi(Reg(0), 8).to_string(), "LDI  R0, 8");
        assert_eq!(Instruction::Push(Reg(1)).to_string(), "PUSH R1");
        assert_eq!(Instruction::Pop(Reg(1)).to_string(), "POP  R1");
        assert_eq!(
            Instruction::Alu(AluOp::Mul, Reg(0), Reg(1)).to_string(),
            "MUL  R0, R1"
        );
    }
}
