/// Memory addresses, wide enough to hold `PC + 2` past the end of memory
pub type Address = u16;

/// Content of a memory cell or a register
pub type Word = u8;

/// Total size of the computer memory
pub const MEMORY_SIZE: Address = 256;

/// Number of general purpose registers
pub const REGISTER_COUNT: u8 = 8;

/// Initial value of the stack pointer
pub const STACK_START: Word = 0xF4;

/// Address where programs are loaded and execution starts
pub const PROGRAM_START: Address = 0;

/// Register holding the interrupt mask
pub const INTERRUPT_MASK: u8 = 5;

/// Register holding the interrupt status
pub const INTERRUPT_STATUS: u8 = 6;

/// Register holding the stack pointer
pub const STACK_POINTER: u8 = 7;
