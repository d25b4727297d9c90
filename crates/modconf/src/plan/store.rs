use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use super::MergePlan;
use crate::error::{ConfigError, Result};

/// Persisted merge plan file.
#[derive(Debug, Clone)]
pub struct MergePlanStore {
    path: PathBuf,
}

impl MergePlanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted plan, `None` when it was never written.
    pub fn load(&self) -> Result<Option<MergePlan>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        MergePlan::from_json(&content).map(Some)
    }

    /// Write `plan` unless the file already holds the same content.
    ///
    /// Returns whether the file was written.
    pub fn write_if_changed(&self, plan: &MergePlan) -> Result<bool> {
        let content = plan.to_json()?;

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let result = self.write_locked(&directory, &content);
        let unlock = FileExt::unlock(&lock_file);
        let written = result?;
        unlock?;

        if written {
            log::info!("Merge plan written to {}", self.path.display());
        } else {
            log::debug!("Merge plan {} is up to date", self.path.display());
        }
        Ok(written)
    }

    /// Compare and replace; the caller holds the lock.
    fn write_locked(&self, directory: &Path, content: &str) -> Result<bool> {
        let old_content = if self.path.is_file() {
            fs::read_to_string(&self.path)?
        } else {
            String::new()
        };
        if normalize_line_endings(&old_content) == normalize_line_endings(content) {
            return Ok(false);
        }

        let mut file = NamedTempFile::new_in(directory)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| ConfigError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(true)
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

pub(crate) fn normalize_line_endings(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}
