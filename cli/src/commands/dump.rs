use std::io::Write;

use ls8_emulator::listing::Listing;
use ls8_emulator::{Computer, Program};
use tracing::debug;

/// Print the disassembled program on stdout
pub fn print_listing(program: &Program) -> anyhow::Result<()> {
    debug!("Disassembling program");
    let computer = Computer::with_program(&program.bytes)?;
    let mut stdout = std::io::stdout().lock();
    for line in Listing::new(&computer.memory, 0, program.end()) {
        writeln!(stdout, "{line}")?;
    }

    Ok(())
}
