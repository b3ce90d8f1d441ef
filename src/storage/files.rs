//! Named heap files.
//!
//! A [`FileManager`] owns a base directory and maps heap-file names to
//! storage files inside it. It is the only component that touches file
//! names; everything above it works with an opened [`FileStorage`].

use std::path::{Path, PathBuf};

use super::error::StorageError;
use super::io::FileStorage;

/// Storage reserved for a heap-file name, including the trailing NUL.
///
/// Names are limited to `MAX_NAME_SIZE - 1` bytes so that the header page
/// can store them NUL-terminated in a fixed-size field.
pub const MAX_NAME_SIZE: usize = 64;

/// Creates, opens and destroys named heap files inside a base directory.
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Creates a file manager rooted at `base_dir`. The directory must
    /// already exist.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The directory heap files live in.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves a validated name to its path under the base directory.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.base_dir.join(name))
    }

    /// Returns true if a heap file with this name exists.
    pub fn exists(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => path.exists(),
            Err(_) => false,
        }
    }

    /// Creates a new heap file. Fails if one with this name exists.
    pub async fn create(&self, name: &str) -> Result<FileStorage, StorageError> {
        FileStorage::create(self.path_of(name)?).await
    }

    /// Opens an existing heap file.
    pub async fn open(&self, name: &str) -> Result<FileStorage, StorageError> {
        FileStorage::open(self.path_of(name)?).await
    }

    /// Removes a heap file from disk.
    pub async fn destroy(&self, name: &str) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.path_of(name)?).await?;
        Ok(())
    }
}

/// A name is valid if it is non-empty, fits the header field, and cannot
/// escape the base directory.
fn validate_name(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_SIZE - 1
        && !name.contains(&['/', '\\', '\0'][..]);
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
