//! Directory-backed folder
//!
//! Each blob is a file. Writes land in a temporary sibling first and are
//! renamed into place, so a crash leaves either the old or the new bytes.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

use super::Folder;

/// Suffix for in-flight writes; never matches `<name>.<digits>.db`
const TEMP_SUFFIX: &str = ".tmp";

/// A [`Folder`] stored as a directory on disk
#[derive(Debug)]
pub struct DirFolder {
    /// Directory holding every file
    path: PathBuf,

    /// fsync file and directory after each write
    sync_writes: bool,
}

impl DirFolder {
    /// Open or create the directory
    pub fn open(path: &Path, sync_writes: bool) -> Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sync_writes,
        })
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> Result<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> Result<()> {
        Ok(())
    }
}

impl Folder for DirFolder {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.file_path(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let target = self.file_path(name);
        let temp = self.file_path(&format!("{}{}", name, TEMP_SUFFIX));

        {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            if self.sync_writes {
                file.sync_all()?;
            }
        }

        fs::rename(&temp, &target)?;
        if self.sync_writes {
            self.sync_dir()?;
        }

        debug!(file = name, bytes = data.len(), "wrote file");
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.file_path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        if self.sync_writes {
            self.sync_dir()?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}
