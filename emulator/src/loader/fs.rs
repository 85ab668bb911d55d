use std::{
    collections::HashMap,
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

/// Where program files are read from
pub trait Filesystem {
    type File: Read;

    /// Open a file for reading
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist or can't be opened.
    fn open(&self, path: &Path) -> std::io::Result<Self::File>;
}

/// A set of files held in memory, mostly useful for tests
#[derive(Debug, Default)]
pub struct InMemoryFilesystem {
    files: HashMap<PathBuf, String>,
}

impl InMemoryFilesystem {
    #[must_use]
    pub const fn new(files: HashMap<PathBuf, String>) -> Self {
        InMemoryFilesystem { files }
    }

    /// Add a file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl Filesystem for InMemoryFilesystem {
    type File = Cursor<String>;

    fn open(&self, path: &Path) -> std::io::Result<Self::File> {
        self.files
            .get(path)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"))
            .map(|content| Cursor::new(content.clone()))
    }
}

/// The filesystem of the host
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFilesystem;

impl Filesystem for NativeFilesystem {
    type File = std::fs::File;

    fn open(&self, path: &Path) -> std::io::Result<Self::File> {
        std::fs::File::open(path)
    }
}
