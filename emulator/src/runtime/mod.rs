use std::io::Write;

use thiserror::Error;
use tracing::{debug, info};

use crate::constants::{self as C, Address, Word};

mod alu;
mod exception;
mod instructions;
mod memory;
mod registers;
mod trace;

pub use self::alu::AluOp;
pub use self::exception::Exception;
pub use self::instructions::{Instruction, Opcode, Outcome, RawInstruction};
pub use self::memory::{Memory, MemoryError};
pub use self::registers::{Flags, Reg, RegisterError, RegisterParseError, Registers};
pub use self::trace::Trace;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("CPU exception: {0}")]
    Exception(#[from] Exception),

    #[error("could not write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("the computer is halted")]
    Halted,

    #[error("step budget exhausted after {steps} instructions")]
    BudgetExhausted { steps: u64 },
}

// Implement MemoryError/RegisterError -> ProcessorError conversions to simplify code
impl From<MemoryError> for ProcessorError {
    fn from(e: MemoryError) -> Self {
        Self::Exception(Exception::InvalidMemoryAccess(e))
    }
}

impl From<RegisterError> for ProcessorError {
    fn from(e: RegisterError) -> Self {
        Self::Exception(Exception::InvalidRegisterAccess(e))
    }
}

type Result<T> = std::result::Result<T, ProcessorError>;

/// State of the execution loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Waiting to fetch the instruction at `pc`
    #[default]
    Fetching,

    /// An instruction was decoded and is being executed
    Executing,

    /// A `HLT` instruction was executed, nothing will be fetched anymore
    Halted,
}

#[derive(Default, Clone)]
pub struct Computer {
    pub registers: Registers,
    pub memory: Memory,
    pub flags: Flags,
    pub pc: Address,
    pub state: State,
    pub steps: u64,
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ pc: {}, flags: {:?}, registers: {:?}, state: {:?}, memory: [...] }}",
            self.pc, self.flags, self.registers, self.state
        )
    }
}

impl Computer {
    /// Build a computer with a program loaded at the start of its memory
    ///
    /// # Errors
    ///
    /// Fails if the program does not fit in memory.
    pub fn with_program(program: &[Word]) -> std::result::Result<Self, MemoryError> {
        Ok(Self {
            memory: Memory::with_program(program)?,
            pc: C::PROGRAM_START,
            ..Default::default()
        })
    }

    /// Whether a `HLT` instruction was executed
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state == State::Halted
    }

    /// Format the current state of the computer on a single line
    #[must_use]
    pub fn trace(&self) -> Trace<'_> {
        Trace::new(self)
    }

    fn jump(&mut self, address: Word) {
        debug!("Jumping to address {:#04x}", address);
        self.pc = Address::from(address);
    }

    /// Jump to the address held by `reg` if `condition` holds, else skip the operand
    fn branch(&mut self, reg: Reg, condition: bool) -> Result<()> {
        let target = self.registers.get(reg)?;
        if condition {
            self.jump(target);
        } else {
            self.pc += 2;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn push(&mut self, value: Word) -> std::result::Result<(), Exception> {
        let sp = self.registers.sp().wrapping_sub(1);
        self.registers.set_sp(sp);

        // And write it on memory
        self.memory.set(Address::from(sp), value)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn pop(&mut self) -> std::result::Result<Word, Exception> {
        // First read the value
        let sp = self.registers.sp();
        let val = self.memory.get(Address::from(sp))?;
        // Then move the SP
        self.registers.set_sp(sp.wrapping_add(1));
        Ok(val)
    }

    #[tracing::instrument(skip(self), err, level = "trace")]
    fn decode_instruction(
        &self,
    ) -> std::result::Result<(RawInstruction, Instruction), Exception> {
        let raw = RawInstruction::fetch(&self.memory, self.pc)?;
        let inst = raw.decode()?;
        Ok((raw, inst))
    }

    /// Fetch, decode and execute a single instruction
    ///
    /// # Errors
    ///
    /// Fails if the instruction raised an exception, if the computer is already halted or if
    /// writing to `out` failed.
    #[tracing::instrument(skip(self, out), level = "debug", fields(pc = self.pc))]
    pub fn step(&mut self, out: &mut dyn Write) -> Result<Outcome> {
        if self.is_halted() {
            return Err(ProcessorError::Halted);
        }

        let (raw, inst) = self.decode_instruction()?;
        self.state = State::Executing;
        debug!(address = raw.address, "Executing instruction \"{}\"", inst);

        let outcome = match inst.execute(self, out) {
            Ok(outcome) => outcome,
            Err(e) => {
                // A fault leaves the state as it was before the instruction
                self.state = State::Fetching;
                return Err(e);
            }
        };
        self.steps += 1;

        match outcome {
            Outcome::Halt => self.state = State::Halted,
            Outcome::Continue => {
                if !raw.sets_pc() {
                    self.pc += raw.size();
                }
                self.state = State::Fetching;
            }
        }

        debug!("Register state {:?}", self.registers);
        Ok(outcome)
    }

    /// Run the program until it halts
    ///
    /// When `max_steps` is given, at most this number of instructions is executed.
    ///
    /// # Errors
    ///
    /// Fails on the first exception, or if the budget is exhausted before the program halts.
    pub fn run(&mut self, out: &mut dyn Write, max_steps: Option<u64>) -> Result<()> {
        self.run_with(out, max_steps, |_| Ok(()))
    }

    /// Run the program until it halts, calling `inspect` before each instruction
    ///
    /// # Errors
    ///
    /// Same as [`Computer::run`], and also fails if `inspect` fails.
    #[tracing::instrument(skip(self, out, inspect))]
    pub fn run_with<F>(
        &mut self,
        out: &mut dyn Write,
        max_steps: Option<u64>,
        mut inspect: F,
    ) -> Result<()>
    where
        F: FnMut(&Computer) -> std::io::Result<()>,
    {
        let mut steps = 0;
        loop {
            if max_steps.is_some_and(|max| steps >= max) {
                return Err(ProcessorError::BudgetExhausted { steps });
            }

            inspect(&*self)?;
            if self.step(out)? == Outcome::Halt {
                info!(steps = self.steps, "Program halted");
                return Ok(());
            }

            steps += 1;
        }
    }
}
