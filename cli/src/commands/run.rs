use std::io::Write;
use std::process::exit;

use camino::Utf8PathBuf;
use clap::{ArgAction, Args, ValueHint};
use ls8_emulator::load;
use ls8_emulator::loader::{LoadError, NativeFilesystem};
use tracing::{debug, info};

use crate::commands::dump::print_listing;
use crate::interactive::run_interactive;

#[derive(Args, Debug)]
pub struct RunOpt {
    /// Program file to load
    #[arg(
        value_name = "PROGRAM",
        value_hint = ValueHint::FilePath,
        required_unless_present = "completions"
    )]
    input: Option<Utf8PathBuf>,

    /// Print the state of the computer before each instruction
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with_all = ["dump", "interactive"])]
    trace: bool,

    /// Stop after executing this number of instructions
    #[arg(long, value_name = "N", env = "LS8_MAX_STEPS")]
    max_steps: Option<u64>,

    /// Print the disassembled program instead of running it
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with = "interactive")]
    dump: bool,

    /// Run the program in interactive mode
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub interactive: bool,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let Some(input) = self.input else {
            anyhow::bail!("no program to load");
        };

        info!(path = %input, "Reading program");
        let program = match load(&NativeFilesystem, input.as_std_path()) {
            Ok(p) => p,
            Err(LoadError::Parse(e)) => {
                let report = miette::Report::new(e);
                eprintln!("{report:?}");
                exit(1);
            }
            Err(e) => return Err(e.into()),
        };

        if self.dump {
            return print_listing(&program);
        }

        debug!(size = program.bytes.len(), "Building computer");
        let mut computer = program.into_computer()?;

        info!("Running program");
        if self.interactive {
            return run_interactive(&mut computer);
        }

        let mut stdout = std::io::stdout().lock();
        if self.trace {
            let mut stderr = std::io::stderr();
            computer.run_with(&mut stdout, self.max_steps, |computer| {
                writeln!(stderr, "{}", computer.trace())
            })?;
        } else {
            computer.run(&mut stdout, self.max_steps)?;
        }
        stdout.flush()?;

        info!(registers = %computer.registers, steps = computer.steps, "End of program");

        Ok(())
    }
}
