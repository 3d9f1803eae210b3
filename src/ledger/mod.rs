//! Dedup ledger of processed listing ids
//!
//! The ledger is the only state shared by every segment worker. It holds an
//! in-memory set of ids behind a single mutex and an append-only text file,
//! one id per line, that survives restarts.
//!
//! # Claim and commit
//!
//! - `try_claim` inserts an id into the in-memory set and reports whether
//!   this caller won it. Ids are catalog-wide, so a claim made by one segment
//!   blocks every other segment.
//! - `release` undoes a claim whose item could not be fetched.
//! - `commit` appends ids to the durable file. Only committed ids are seen
//!   by the next run.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors raised by the ledger file
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Persisted set of listing ids that have already been harvested
#[derive(Debug)]
pub struct ProcessedIdLedger {
    path: PathBuf,
    ids: Mutex<HashSet<String>>,
}

impl ProcessedIdLedger {
    /// Loads the ledger file into memory
    ///
    /// A missing file is treated as an empty ledger. Blank lines are skipped
    /// and duplicate lines collapse into one entry.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the append-only id file
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessedIdLedger)` - Ledger with every previously committed id
    /// * `Err(LedgerError)` - The file exists but could not be read
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();

        let ids = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(source) => return Err(LedgerError::Io { path, source }),
        };

        tracing::info!("Loaded {} processed ids from {}", ids.len(), path.display());

        Ok(Self {
            path,
            ids: Mutex::new(ids),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `id` is claimed or committed
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    /// Atomically checks for `id` and inserts it
    ///
    /// Returns false if the id was already present. For any id, at most one
    /// concurrent caller observes `true`.
    pub fn try_claim(&self, id: &str) -> bool {
        self.lock().insert(id.to_string())
    }

    /// Drops an in-memory claim that was never committed
    pub fn release(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Durably appends `ids` to the ledger file
    ///
    /// The ids are also inserted into the in-memory set so a commit without
    /// a prior claim is still visible to `contains`. The file and its parent
    /// directory are created on first use. Nothing is written for an empty
    /// slice.
    pub fn commit(&self, ids: &[String]) -> Result<(), LedgerError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut set = self.lock();
        self.append(ids).map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;
        set.extend(ids.iter().cloned());

        tracing::debug!("Committed {} ids to {}", ids.len(), self.path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn append(&self, ids: &[String]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for id in ids {
            writeln!(writer, "{}", id)?;
        }
        writer.flush()?;
        writer.get_ref().sync_data()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave the set half-updated
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
