//! In-memory mirror of the disk image.
//!
//! The image is read once in full and written back once in full. Nothing in
//! between touches the file, so it stays stale until [`Disk::persist`].

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use log::*;

use super::{Byte, Memory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    path: PathBuf,
    buffer: Memory,
}

impl Disk {
    /// Loads the whole image at `path`. The file has to exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .wrap_err_with(|| format!("Failed to initialize hard disk `{}`", path.display()))?;

        info!("Loaded {} bytes from disk `{}`", data.len(), path.display());

        Ok(Self::with_bytes(path, data))
    }

    /// Creates a disk backed by `path` without reading it
    pub fn with_bytes<P: AsRef<Path>>(path: P, data: Vec<Byte>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buffer: Memory::from_bytes("disk", data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the image file with the whole buffer
    pub fn persist(&self) -> Result<()> {
        fs::write(&self.path, self.buffer.as_bytes())
            .wrap_err_with(|| format!("Failed to write hard disk `{}`", self.path.display()))?;

        info!(
            "Persisted {} bytes to disk `{}`",
            self.buffer.len(),
            self.path.display()
        );

        Ok(())
    }
}

impl Deref for Disk {
    type Target = Memory;

    fn deref(&self) -> &Memory {
        &self.buffer
    }
}

impl DerefMut for Disk {
    fn deref_mut(&mut self) -> &mut Memory {
        &mut self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_load_and_persist() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("harddisk");
        fs::write(&path, [0u8; 16])?;

        let mut disk = Disk::load(&path)?;
        assert_eq!(disk.len(), 16);

        disk.write_number(4, 42)?;
        // nothing reaches the file before persisting
        assert_eq!(fs::read(&path)?, vec![0u8; 16]);

        disk.persist()?;
        let reloaded = Disk::load(&path)?;
        assert_eq!(reloaded.read_number(4)?, 42);
        assert_eq!(reloaded.len(), 16);

        Ok(())
    }

    #[test]
    fn test_load_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(Disk::load(dir.path().join("missing")).is_err());

        Ok(())
    }
}
