use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Directory receiving export files. Every write goes to a temp file first and
/// is renamed into place, so readers never observe a half-written export.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory if needed and probe that it accepts files.
    pub fn ensure(&self) -> Result<(), PersistError> {
        if self.path.exists() {
            let meta =
                fs::metadata(&self.path).map_err(|e| PersistError::OutputDir(e.to_string()))?;
            if !meta.is_dir() {
                return Err(PersistError::OutputDir(format!(
                    "{} is not a directory",
                    self.path.display()
                )));
            }
        } else {
            fs::create_dir_all(&self.path).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        }
        NamedTempFile::new_in(&self.path).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        Ok(())
    }

    pub fn write_atomic(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        self.ensure()?;

        let target = self.path.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.path)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
