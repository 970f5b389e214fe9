use crate::errors::SaveTheoryError;
use crate::parallel::{EnvParallelContext, ParallelContext};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, SaveTheoryError>;
    /// Opens `path` for line-by-line reading.
    fn open_lines(&self, path: &Path) -> Result<Box<dyn BufRead>, SaveTheoryError>;
}

pub trait Terminal: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), SaveTheoryError>;
    /// Stdin as a line source; lines become available as the writer sends them.
    fn stdin_lines(&self) -> Box<dyn BufRead>;
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, SaveTheoryError> {
        std::fs::read_to_string(path)
            .map_err(|e| SaveTheoryError::Io(format!("{}: {e}", path.display())))
    }

    fn open_lines(&self, path: &Path) -> Result<Box<dyn BufRead>, SaveTheoryError> {
        let file = std::fs::File::open(path)
            .map_err(|e| SaveTheoryError::Io(format!("{}: {e}", path.display())))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn write_line(&self, line: &str) -> Result<(), SaveTheoryError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| SaveTheoryError::Io(e.to_string()))
    }

    fn stdin_lines(&self) -> Box<dyn BufRead> {
        Box::new(std::io::stdin().lock())
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
    pub parallel: Arc<dyn ParallelContext>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
            parallel: Arc::new(EnvParallelContext::from_process_env()),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    fail_next: Arc<Mutex<Option<SaveTheoryError>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.insert(path, contents);
        fs
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
    }

    pub fn set_fail_next(&self, error: SaveTheoryError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    fn maybe_fail(&self) -> Result<(), SaveTheoryError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, SaveTheoryError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| SaveTheoryError::Io(format!("missing file {}", path.display())))
    }

    fn open_lines(&self, path: &Path) -> Result<Box<dyn BufRead>, SaveTheoryError> {
        let text = self.read_to_string(path)?;
        Ok(Box::new(Cursor::new(text.into_bytes())))
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    stdin: Arc<Mutex<String>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn with_stdin(stdin: impl Into<String>) -> Self {
        Self {
            stdin: Arc::new(Mutex::new(stdin.into())),
            ..Self::default()
        }
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn write_line(&self, line: &str) -> Result<(), SaveTheoryError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }

    fn stdin_lines(&self) -> Box<dyn BufRead> {
        let text = std::mem::take(&mut *self.stdin.lock().expect("stdin lock"));
        Box::new(Cursor::new(text.into_bytes()))
    }
}
