use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::Result;
use crate::scheduler::StoreSnapshot;

/// Durable home for the whole swarm store.
///
/// Every save replaces the previous snapshot in full, so a completed save is
/// always self-consistent. Implementations block; callers on the runtime
/// should go through [`SnapshotWriter`](super::SnapshotWriter).
pub trait SnapshotGateway: Send + Sync {
    /// Read the last saved snapshot. `Ok(None)` means nothing was saved yet;
    /// an error means the stored data is unreadable or corrupt.
    fn load(&self) -> Result<Option<StoreSnapshot>>;

    fn save(&self, snapshot: &StoreSnapshot) -> Result<()>;
}

/// Stores the snapshot as a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotGateway for JsonFileGateway {
    fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        tracing::debug!(path = %self.path.display(), "Loading snapshot");
        let contents = fs::read_to_string(&self.path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;
        snapshot.validate()?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let contents = serde_json::to_vec(snapshot)?;
        write_atomic(&self.path, &contents)?;
        tracing::trace!(path = %self.path.display(), swarms = snapshot.swarms.len(), "Snapshot written");
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Keeps the serialized snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    contents: Mutex<Option<String>>,
    saves: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously serialized (possibly corrupt) contents.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotGateway for MemoryGateway {
    fn load(&self) -> Result<Option<StoreSnapshot>> {
        match self.contents() {
            None => Ok(None),
            Some(contents) => {
                let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;
                snapshot.validate()?;
                Ok(Some(snapshot))
            }
        }
    }

    fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let contents = serde_json::to_string(snapshot)?;
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(contents);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
