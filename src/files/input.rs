use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A readable, line-oriented resource with a name.
///
/// The name is only used to derive the output name and in diagnostics.
pub trait InputSource: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self) -> Result<Box<dyn BufRead + Send>>;
}

/// An input file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    path: PathBuf,
    name: String,
}

impl FileInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InputSource for FileInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(&self.path).with_context(|| format!("Failed to open {}", self.path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }
}
