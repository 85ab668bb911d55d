//! Program loading
//!
//! Programs are text files holding one byte per line, written in binary. The bytes are placed
//! in memory one after the other, starting at address 0.

// Looks like the miette error derive generates unused assignments
#![allow(unused_assignments)]

use std::io::Read;
use std::path::{Path, PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::{Address, Word, MEMORY_SIZE};
use crate::runtime::{Computer, MemoryError};

mod fs;
mod line;

pub use self::fs::{Filesystem, InMemoryFilesystem, NativeFilesystem};

/// A line of the program could not be parsed
#[derive(Debug, Error, Diagnostic)]
#[error("invalid instruction on line {line}: {content:?}")]
#[diagnostic(
    code(ls8::parse),
    help("instructions are written as 8 binary digits, e.g. `10000010 # LDI`")
)]
pub struct ParseError {
    /// Line number, starting at 1
    pub line: usize,

    /// Content of the offending line
    pub content: String,

    #[source_code]
    source_code: NamedSource<String>,

    #[label("expected 8 binary digits")]
    span: SourceSpan,
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("file not found: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("program is too large: {size} bytes do not fit in memory")]
    ProgramTooLarge { size: usize },

    #[error("could not place the program in memory: {0}")]
    Memory(#[source] MemoryError),
}


/// A loaded program, ready to be placed in memory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub bytes: Vec<Word>,
}

impl Program {
    /// Address right after the last byte of the program
    #[must_use]
    pub fn end(&self) -> Address {
        Address::try_from(self.bytes.len()).unwrap_or(MEMORY_SIZE)
    }

    /// Build a computer with this program in memory
    ///
    /// # Errors
    ///
    /// Fails if the program does not fit in memory.
    pub fn into_computer(self) -> Result<Computer, LoadError> {
        Computer::with_program(&self.bytes).map_err(|e| match e {
            MemoryError::TooLarge { size } => LoadError::ProgramTooLarge { size },
            e @ MemoryError::InvalidAddress(_) => LoadError::Memory(e),
        })
    }
}

/// Parse the text of a program
///
/// `name` is only used when reporting errors.
///
/// # Errors
///
/// Fails on the first invalid line, or if the program does not fit in memory.
#[tracing::instrument(skip(source))]
pub fn parse(name: &str, source: &str) -> Result<Program, LoadError> {
    let mut bytes = Vec::new();
    let mut offset = 0;

    for (index, raw_line) in source.split_inclusive('\n').enumerate() {
        let line = raw_line.trim_end_matches(['\n', '\r']);

        match self::line::parse_line(line) {
            Ok(Some(byte)) => {
                debug!(line = index + 1, byte, "Loaded byte");
                bytes.push(byte);
            }
            Ok(None) => {
                if !line.split('#').next().unwrap_or_default().trim().is_empty() {
                    debug!(line = index + 1, content = line, "Skipping line");
                }
            }
            Err(column) => {
                return Err(ParseError {
                    line: index + 1,
                    content: line.to_owned(),
                    source_code: NamedSource::new(name, source.to_owned()),
                    span: (offset + column, line.len() - column).into(),
                }
                .into());
            }
        }

        offset += raw_line.len();
    }

    if bytes.len() > usize::from(MEMORY_SIZE) {
        return Err(LoadError::ProgramTooLarge { size: bytes.len() });
    }

    Ok(Program { bytes })
}

/// Read and parse a program file
///
/// # Errors
///
/// Fails if the file can't be read, or if it is not a valid program.
#[tracing::instrument(skip(fs))]
pub fn load<FS: Filesystem>(fs: &FS, path: &Path) -> Result<Program, LoadError> {
    let content = {
        let mut f = fs.open(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let mut buf = String::new();
        f.read_to_string(&mut buf).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        buf
    };

    let program = parse(&path.display().to_string(), &content)?;
    info!(size = program.bytes.len(), "Program loaded");
    Ok(program)
}
