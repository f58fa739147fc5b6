//! Durable key/blob storage for trained model artifacts.
//!
//! The filesystem store replaces each blob with a rename, so a reader sees
//! either the old or the new artifact, never a partial one. Writers and
//! readers also coordinate through a lock file in the artifact directory,
//! which serializes concurrent writers.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Lock file shared by every store opened on the same directory
const LOCK_FILE: &str = ".artifacts.lock";

/// Key/blob store for persisted artifacts
pub trait ArtifactStore {
    /// Fetch a blob; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write or replace a blob
    fn put(&mut self, key: &str, blob: &[u8]) -> Result<()>;

    /// Delete a blob if present
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Directory-backed store, one `<key>.json` file per artifact
#[derive(Clone, Debug)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Config(format!("Invalid artifact key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Open the directory-wide lock file
    fn lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        Ok(file)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        // Shared lock: readers never overlap a writer
        let lock = self.lock_file()?;
        lock.lock_shared()?;

        let read = std::fs::read(&path);
        lock.unlock()?;
        let contents = read?;

        tracing::debug!("Read artifact '{}' ({} bytes) from {:?}", key, contents.len(), path);
        Ok(Some(contents))
    }

    /// Writes the blob by:
    /// 1. Taking the exclusive directory lock
    /// 2. Writing and syncing a temp file in the same directory
    /// 3. Renaming it over the original
    fn put(&mut self, key: &str, blob: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let written = write_atomic(&self.dir, &path, blob);
        lock.unlock()?;
        written?;

        tracing::debug!("Saved artifact '{}' to {:?}", key, path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed artifact {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_atomic(dir: &Path, path: &Path, blob: &[u8]) -> Result<()> {
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(blob)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// In-process store for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct MemoryArtifactStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn put(&mut self, key: &str, blob: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.blobs.remove(key);
        Ok(())
    }
}
