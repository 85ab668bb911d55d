//! This module implements the TTY interactive interface.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use std::collections::HashSet;
use std::io::Write;

use clap::Parser;
use ls8_emulator::constants::{self as C, Address};
use ls8_emulator::listing::{Line, Listing};
use ls8_emulator::runtime::{Computer, Outcome, Reg};
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
mod parse;
use self::helper::RunHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
/// Interactive mode commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of steps to execute
        #[clap(value_parser, default_value = "1")]
        number: u64,
    },

    /// Exit the emulator
    Exit,

    /// Show the state of registers
    Registers {
        #[clap(value_parser)]
        register: Option<Reg>,
    },

    /// Show the content of a block in memory
    Memory {
        /// The address to show. Can be a number literal or a register holding the address.
        #[clap(value_parser)]
        address: parse::Argument,

        /// Number of memory cells to show.
        #[clap(value_parser, default_value = "1")]
        number: u16,
    },

    /// Set a value in memory or in a register
    Set {
        /// The address or register to set.
        #[clap(value_parser)]
        target: parse::AssignmentTarget,

        /// The value to set
        #[clap(value_parser)]
        value: parse::Argument,
    },

    /// Show the next few instructions
    List {
        /// Number of instructions to show.
        #[clap(value_parser, default_value = "10")]
        number: usize,
    },

    /// Set a breakpoint
    Break {
        /// The address where to set the breakpoint
        #[clap(value_parser)]
        address: parse::Argument,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The address of the breakpoint to remove
        #[clap(value_parser)]
        address: parse::Argument,
    },

    /// Continue the program until the next breakpoint or the end of the program
    #[command(alias = "c")]
    Continue,

    /// Show the state of the computer on a single line
    Trace,

    /// Show informations about the current debugging session
    Info {
        #[clap(subcommand)]
        sub: Option<InfoCommand>,
    },
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,

    /// Show the number of instructions executed since the beginning of the program
    Steps,
}

/// Holds informations about a interactive session
#[derive(Debug, Default)]
struct Session {
    /// List of active breakpoints
    breakpoints: HashSet<Address>,

    /// Current address for the `list` command
    list_address: Option<Address>,
}

impl Session {
    /// Add a breakpoint
    fn add_breakpoint(&mut self, address: Address) {
        if self.breakpoints.insert(address) {
            info!(address, "Setting a breakpoint");
        } else {
            warn!(address, "A breakpoint was already set");
        }
    }

    /// Remove a breakpoint
    fn remove_breakpoint(&mut self, address: Address) {
        if self.breakpoints.remove(&address) {
            info!(address, "Removing breakpoint");
        } else {
            warn!(address, "No breakpoint was set here");
        }
    }

    /// Checks if the given address has a breakpoint
    fn has_breakpoint(&self, address: Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Reset the `list` command (after running an instruction)
    fn reset_list(&mut self) {
        self.list_address = None;
    }

    /// Display the next `count` instructions and move the `list` cursor after them
    fn list(&mut self, computer: &Computer, count: usize) {
        let start = self.list_address.unwrap_or(computer.pc);
        let mut next = start;
        for line in Listing::new(&computer.memory, start, C::MEMORY_SIZE).take(count) {
            next = line.address + Address::try_from(line.bytes.len()).unwrap_or(1);
            self.display_line(computer, &line);
        }

        if next == start {
            info!("End of memory");
        }
        self.list_address = Some(next);
    }

    /// Display the list of breakpoints
    fn display_breakpoints(&self, computer: &Computer) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{} breakpoints:", x),
        }

        let mut bp: Vec<_> = self.breakpoints.iter().copied().collect();
        bp.sort_unstable();
        for addr in bp {
            self.display_instruction(computer, addr);
        }
    }

    /// Display the instruction at specified address
    fn display_instruction(&self, computer: &Computer, address: Address) {
        match Listing::new(&computer.memory, address, address + 1).next() {
            Some(line) => self.display_line(computer, &line),
            None => info!("   {:02X}: –", address),
        }
    }

    fn display_line(&self, computer: &Computer, line: &Line) {
        let is_current_line = computer.pc == line.address;
        let has_breakpoint = self.has_breakpoint(line.address);

        let gutter = match (has_breakpoint, is_current_line) {
            (true, true) => "B>",
            (true, false) => "B ",
            (false, true) => " >",
            (false, false) => "  ",
        };

        info!("{gutter:<2} {line}");
    }

    fn display_steps(computer: &Computer) {
        info!("Steps: {}", computer.steps);
    }
}

/// Execute one instruction, returns `true` if the computer stopped
fn step(computer: &mut Computer, out: &mut dyn Write) -> bool {
    match computer.step(out) {
        Ok(Outcome::Continue) => false,
        Ok(Outcome::Halt) => {
            info!(steps = computer.steps, "Program halted");
            true
        }
        Err(e) => {
            warn!(error = &e as &dyn std::error::Error, "Halted");
            true
        }
    }
}

#[allow(clippy::too_many_lines)]
pub(crate) fn run_interactive(computer: &mut Computer) -> anyhow::Result<()> {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let mut session = Session::default();

    let h: RunHelper<Command> = RunHelper::new();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));

    let mut stdout = std::io::stdout();
    let mut last_command: Option<Command> = None;
    let mut halted = computer.is_halted();

    'read: loop {
        // A macro to unwrap an error, log it and continue the loop
        macro_rules! warn_and_continue {
            ($e:expr) => {
                match $e {
                    Ok(o) => o,
                    Err(e) => {
                        tracing::warn!(error = %e);
                        continue 'read;
                    }
                }
            };
        }

        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if readline.is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = warn_and_continue!(Command::try_parse_from(words));
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        match (command, halted) {
            (Command::Exit, _) => break,
            (Command::Step { number }, false) => {
                session.reset_list();

                for _ in 0..number {
                    if step(computer, &mut stdout) {
                        halted = true;
                        break;
                    }
                }
                stdout.flush()?;
            }

            (Command::Registers { register }, _) => {
                if let Some(reg) = register {
                    let value = warn_and_continue!(computer.registers.get(reg));
                    info!("Register {} = {:#04x} ({})", reg, value, value);
                } else {
                    info!("PC = {:#04x} | FL = {:?}", computer.pc, computer.flags);
                    info!("Registers: {}", computer.registers);
                }
            }

            (Command::Memory { address, number }, _) => {
                let address = warn_and_continue!(address.address(computer));
                for i in 0..number {
                    let address = address + i;
                    let value = warn_and_continue!(computer.memory.get(address));
                    info!("{address:02X}: {value:#04x} ({value:#010b})");
                }
            }

            (Command::Set { target, value }, false) => match target {
                parse::AssignmentTarget::Address(address) => {
                    let value = warn_and_continue!(value.word(computer));
                    info!("Setting memory at address {address:#04x} to {value:#04x}");
                    warn_and_continue!(computer.memory.set(address, value));
                }

                parse::AssignmentTarget::Register(reg) => {
                    let value = warn_and_continue!(value.word(computer));
                    info!("Setting register {reg} to {value:#04x}");
                    warn_and_continue!(computer.registers.set(reg, value));
                }
            },

            (Command::List { number }, _) => {
                session.list(computer, number);
            }

            (Command::Break { address }, _) => {
                let address = warn_and_continue!(address.address(computer));
                session.add_breakpoint(address);
            }

            (Command::Unbreak { address }, _) => {
                let address = warn_and_continue!(address.address(computer));
                session.remove_breakpoint(address);
            }

            (Command::Continue, false) => {
                session.reset_list();

                loop {
                    if step(computer, &mut stdout) {
                        halted = true;
                        break;
                    }

                    if session.has_breakpoint(computer.pc) {
                        info!(address = computer.pc, "Stopped at a breakpoint");
                        break;
                    }
                }
                stdout.flush()?;
            }

            (Command::Trace, _) => {
                info!("{}", computer.trace());
            }

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => {
                    session.display_breakpoints(computer);
                }
                Some(InfoCommand::Steps) => {
                    Session::display_steps(computer);
                }
                None => {
                    session.display_breakpoints(computer);
                    info!("–");
                    Session::display_steps(computer);
                }
            },

            (_, true) => {
                // Computer is halted but the user asked to continue, we just warn
                warn!("Computer is halted. Use \"exit\" to quit");
            }
        }
    }

    Ok(())
}
