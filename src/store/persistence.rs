//! Snapshot storage port and its backends.

use std::io;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::StorageError;

/// Key of the single persisted snapshot record.
pub const SNAPSHOT_KEY: &str = "ai-generator-state";
const TREE_STATE: &str = "generator_state";

/// Durable storage for one serialized snapshot.
pub trait SnapshotStorage: Send + Sync {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;
    fn write(&self, bytes: &[u8]) -> Result<(), StorageError>;
    /// Delete the record entirely.
    fn remove(&self) -> Result<(), StorageError>;
}

/// Sled-backed snapshot storage
pub struct SledSnapshotStorage {
    state: sled::Tree,
}

impl SledSnapshotStorage {
    /// Open (or create) the database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let state = db.open_tree(TREE_STATE).map_err(to_storage_io)?;
        Ok(Self { state })
    }
}

impl SnapshotStorage for SledSnapshotStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self
            .state
            .get(SNAPSHOT_KEY.as_bytes())
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        self.state
            .insert(SNAPSHOT_KEY.as_bytes(), bytes)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        self.state.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        self.state
            .remove(SNAPSHOT_KEY.as_bytes())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        self.state.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

/// In-process snapshot storage, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySnapshotStorage {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-existing (possibly malformed) contents.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Mutex::new(Some(bytes.into())),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.slot.lock().clone()
    }
}

impl SnapshotStorage for MemorySnapshotStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.slot.lock().clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        *self.slot.lock() = Some(bytes.to_vec());
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
