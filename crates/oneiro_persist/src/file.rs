//! File-based persistence adapter.

use crate::adapter::PersistenceAdapter;
use crate::error::{PersistError, PersistResult};
use fs2::FileExt;
use oneiro_model::{Dream, Mutation};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const DREAMS_FILE: &str = "dreams.json";
const REMOTE_CACHE_FILE: &str = "remote_cache.json";
const MUTATIONS_FILE: &str = "mutations.json";
const LOCK_FILE: &str = ".journal.lock";

/// A file-based persistence adapter.
///
/// Stores the three journal documents as JSON files in a single directory.
/// Data survives process restarts.
///
/// # Durability
///
/// Every save writes to a temporary file in the same directory, syncs it,
/// then renames it over the document. The rename is the commit point, so a
/// crash mid-save never leaves a torn document.
///
/// # Exclusivity
///
/// The directory is guarded by an exclusive lock file held for the lifetime
/// of the adapter. A second process opening the same directory gets
/// [`PersistError::Locked`].
#[derive(Debug)]
pub struct FileAdapter {
    dir: PathBuf,
    // Held for the adapter's lifetime; released on drop.
    _lock: File,
    // Serializes temp-file writes within this process.
    write_guard: Mutex<()>,
}

impl FileAdapter {
    /// Opens a journal directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Locked`] if another process holds the
    /// directory, or an I/O error if the directory cannot be created.
    pub fn open(dir: &Path) -> PersistResult<Self> {
        fs::create_dir_all(dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|_| PersistError::Locked)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            write_guard: Mutex::new(()),
        })
    }

    /// Returns the journal directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_document<T: DeserializeOwned>(&self, name: &str) -> PersistResult<Vec<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_document<T: Serialize>(&self, name: &str, items: &[T]) -> PersistResult<()> {
        let _guard = self.write_guard.lock();

        let tmp_path = self.dir.join(format!("{name}.tmp"));
        let bytes = serde_json::to_vec_pretty(items)?;

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, self.dir.join(name))?;
        Ok(())
    }
}

impl PersistenceAdapter for FileAdapter {
    fn saved_dreams(&self) -> PersistResult<Vec<Dream>> {
        self.read_document(DREAMS_FILE)
    }

    fn save_dreams(&self, dreams: &[Dream]) -> PersistResult<()> {
        self.write_document(DREAMS_FILE, dreams)
    }

    fn cached_remote_dreams(&self) -> PersistResult<Vec<Dream>> {
        self.read_document(REMOTE_CACHE_FILE)
    }

    fn save_cached_remote_dreams(&self, dreams: &[Dream]) -> PersistResult<()> {
        self.write_document(REMOTE_CACHE_FILE, dreams)
    }

    fn pending_mutations(&self) -> PersistResult<Vec<Mutation>> {
        self.read_document(MUTATIONS_FILE)
    }

    fn save_pending_mutations(&self, mutations: &[Mutation]) -> PersistResult<()> {
        self.write_document(MUTATIONS_FILE, mutations)
    }
}
