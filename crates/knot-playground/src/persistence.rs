//! Session snapshots: local autosave and on-demand sharing.
//!
//! Persistence is best effort. Failures are logged and never reach the user.

use std::fmt;
use std::fs;
use std::hash::Hasher;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use knot_session::SessionState;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PlaygroundConfig;

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Failure of a snapshot backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed.
    #[error("snapshot io error: {0}")]
    Io(#[from] io::Error),

    /// The stored payload is not a snapshot.
    #[error("invalid snapshot payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The id cannot name a share file.
    #[error("invalid share id '{0}'")]
    InvalidShareId(String),
}

/// Persisted form of a session: file contents by name plus the selected name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Contents by file name, in tab order.
    pub files: IndexMap<String, String>,
    /// Name of the selected file.
    pub current: String,
    /// Format version, see [`SNAPSHOT_FORMAT_VERSION`].
    #[serde(default = "default_format_version")]
    pub version: u32,
}

impl Snapshot {
    /// Creates a snapshot in the current format.
    pub fn new(files: IndexMap<String, String>, current: impl Into<String>) -> Self {
        Self {
            files,
            current: current.into(),
            version: SNAPSHOT_FORMAT_VERSION,
        }
    }

    /// Captures `state`. Returns `None` when nothing is selected.
    ///
    /// Files sharing a name collapse into one entry holding the last content,
    /// at the position of the first.
    pub fn capture<H>(state: &SessionState<H>) -> Option<Self> {
        let current = state.selected_record()?.name.to_string();
        let files = state
            .files_with_contents()
            .map(|(record, content)| (record.name.to_string(), content.to_string()))
            .collect();
        Some(Snapshot::new(files, current))
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot written by [`Snapshot::to_json`].
    pub fn from_json(text: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

/// Identifier returned by a [`ShareStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareId(String);

impl ShareId {
    /// Wraps a store-issued id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for the autosaved session.
pub trait SnapshotStore {
    /// Returns the stored snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    /// Replaces the stored snapshot.
    fn store(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// Storage for shared sessions.
pub trait ShareStore {
    /// Publishes `snapshot` and returns its id.
    fn share(&mut self, snapshot: &Snapshot) -> Result<ShareId, PersistenceError>;

    /// Looks up a shared snapshot. `None` if the id is unknown.
    fn fetch(&self, id: &ShareId) -> Result<Option<Snapshot>, PersistenceError>;
}

/// Front door for snapshot persistence.
///
/// Errors from the backends are logged here and swallowed.
#[derive(Default)]
pub struct PersistenceGateway {
    local: Option<Box<dyn SnapshotStore>>,
    share: Option<Box<dyn ShareStore>>,
    last_saved: Option<Snapshot>,
}

impl PersistenceGateway {
    /// Creates a gateway over the given backends. Either may be absent.
    pub fn new(
        local: Option<Box<dyn SnapshotStore>>,
        share: Option<Box<dyn ShareStore>>,
    ) -> Self {
        Self {
            local,
            share,
            last_saved: None,
        }
    }

    /// A gateway that persists nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// File-backed autosave and share directory from the application config.
    pub fn from_config(config: &PlaygroundConfig) -> Self {
        let local: Option<Box<dyn SnapshotStore>> = if config.autosave.enabled {
            Some(Box::new(FileSnapshotStore::new(&config.autosave.path)))
        } else {
            None
        };
        let share: Box<dyn ShareStore> = Box::new(ShareDirectory::new(&config.share.directory));
        Self::new(local, Some(share))
    }

    /// Serializes the session, or `None` if nothing is selected.
    pub fn serialize<H>(state: &SessionState<H>) -> Option<Snapshot> {
        Snapshot::capture(state)
    }

    /// Loads the autosaved snapshot.
    pub fn restore(&mut self) -> Option<Snapshot> {
        let store = self.local.as_ref()?;
        match store.load() {
            Ok(snapshot) => {
                self.last_saved.clone_from(&snapshot);
                snapshot
            }
            Err(err) => {
                warn!("failed to restore session snapshot: {err}");
                None
            }
        }
    }

    /// Loads a shared snapshot.
    pub fn restore_shared(&self, id: &ShareId) -> Option<Snapshot> {
        let store = self.share.as_ref()?;
        match store.fetch(id) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("failed to load shared session '{id}': {err}");
                None
            }
        }
    }

    /// Writes `snapshot` to the local store unless it matches the last write.
    /// Returns true if a write happened.
    pub fn autosave(&mut self, snapshot: Snapshot) -> bool {
        let Some(store) = self.local.as_mut() else {
            return false;
        };
        if self.last_saved.as_ref() == Some(&snapshot) {
            debug!("autosave skipped: snapshot unchanged");
            return false;
        }
        match store.store(&snapshot) {
            Ok(()) => {
                debug!("session autosaved ({} files)", snapshot.files.len());
                self.last_saved = Some(snapshot);
                true
            }
            Err(err) => {
                warn!("autosave failed: {err}");
                false
            }
        }
    }

    /// Publishes `snapshot`. Returns `None` if sharing is unavailable or failed.
    pub fn share(&mut self, snapshot: &Snapshot) -> Option<ShareId> {
        let Some(store) = self.share.as_mut() else {
            warn!("share requested but no share store is configured");
            return None;
        };
        match store.share(snapshot) {
            Ok(id) => {
                info!("session shared as {id}");
                Some(id)
            }
            Err(err) => {
                warn!("share failed: {err}");
                None
            }
        }
    }
}

impl fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("local_configured", &self.local.is_some())
            .field("share_configured", &self.share.is_some())
            .field("has_saved", &self.last_saved.is_some())
            .finish()
    }
}

/// Autosave file on disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Stores the autosave at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        read_snapshot(&self.path)
    }

    fn store(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        write_atomic(&self.path, snapshot.to_json()?.as_bytes())?;
        Ok(())
    }
}

/// Shared snapshots stored as `<id>.json`, where the id is derived from the
/// snapshot contents. Sharing the same session twice yields the same id.
#[derive(Debug, Clone)]
pub struct ShareDirectory {
    root: PathBuf,
}

impl ShareDirectory {
    /// Stores shares under `root`, created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &ShareId) -> Result<PathBuf, PersistenceError> {
        let valid = !id.as_str().is_empty()
            && id.as_str().chars().all(|ch| ch.is_ascii_alphanumeric());
        if !valid {
            return Err(PersistenceError::InvalidShareId(id.to_string()));
        }
        Ok(self.root.join(format!("{id}.json")))
    }
}

impl ShareStore for ShareDirectory {
    fn share(&mut self, snapshot: &Snapshot) -> Result<ShareId, PersistenceError> {
        let payload = snapshot.to_json()?;
        let mut hasher = FxHasher::default();
        hasher.write(payload.as_bytes());
        let id = ShareId::new(format!("{:016x}", hasher.finish()));
        write_atomic(&self.path_for(&id)?, payload.as_bytes())?;
        Ok(id)
    }

    fn fetch(&self, id: &ShareId) -> Result<Option<Snapshot>, PersistenceError> {
        read_snapshot(&self.path_for(id)?)
    }
}

/// Keeps snapshots in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    saved: Option<Snapshot>,
    shared: Vec<Snapshot>,
    writes: usize,
}

impl InMemoryStore {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds an autosave.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: Some(snapshot),
            ..Self::default()
        }
    }

    /// The last autosaved snapshot.
    pub fn saved(&self) -> Option<&Snapshot> {
        self.saved.as_ref()
    }

    /// Number of successful autosave writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SnapshotStore for InMemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(self.saved.clone())
    }

    fn store(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.saved = Some(snapshot.clone());
        self.writes += 1;
        Ok(())
    }
}

impl ShareStore for InMemoryStore {
    fn share(&mut self, snapshot: &Snapshot) -> Result<ShareId, PersistenceError> {
        self.shared.push(snapshot.clone());
        Ok(ShareId::new(self.shared.len().to_string()))
    }

    fn fetch(&self, id: &ShareId) -> Result<Option<Snapshot>, PersistenceError> {
        let index: usize = id
            .as_str()
            .parse()
            .map_err(|_| PersistenceError::InvalidShareId(id.to_string()))?;
        Ok(index
            .checked_sub(1)
            .and_then(|index| self.shared.get(index))
            .cloned())
    }
}

fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(Snapshot::from_json(&contents)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PersistenceError::Io(err)),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
