//! Session store and its transition function.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::{is_settings_file, SETTINGS_FILE_NAME};

/// Identifier of a file within a session.
///
/// Ids are allocated in increasing order and never reused, even after the
/// file they named has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A file in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// The file id.
    pub id: FileId,
    /// The user-visible file name. Not required to be unique.
    pub name: SmolStr,
}

impl FileRecord {
    /// Returns true if this record is the reserved settings file.
    pub fn is_settings(&self) -> bool {
        is_settings_file(&self.name)
    }
}

/// A session transition.
///
/// `H` is the engine handle type. Engine calls happen before an action is
/// dispatched, so actions only carry the handles those calls produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<H> {
    /// Append a new file and select it.
    Add {
        /// File name.
        name: SmolStr,
        /// Initial content.
        content: String,
        /// Engine handle, or `None` for the settings file.
        handle: Option<H>,
    },
    /// Replace the content of a file.
    Change {
        /// Target file.
        id: FileId,
        /// New content.
        content: String,
    },
    /// Rename a file in place and rebind its handle.
    Rename {
        /// Target file.
        id: FileId,
        /// New file name.
        name: SmolStr,
        /// Handle opened under the new name, or `None`.
        handle: Option<H>,
    },
    /// Remove a file.
    Remove {
        /// Target file.
        id: FileId,
    },
    /// Select a file by id.
    SelectFile {
        /// Target file.
        id: FileId,
    },
    /// Select the first file with the given name, or clear the selection.
    SelectFileByName {
        /// File name to look up.
        name: SmolStr,
    },
}

impl<H> Action<H> {
    /// Shorthand for [`Action::Add`].
    pub fn add(name: impl Into<SmolStr>, content: impl Into<String>, handle: Option<H>) -> Self {
        Action::Add {
            name: name.into(),
            content: content.into(),
            handle,
        }
    }

    /// Shorthand for [`Action::Change`].
    pub fn change(id: FileId, content: impl Into<String>) -> Self {
        Action::Change {
            id,
            content: content.into(),
        }
    }

    /// Shorthand for [`Action::Rename`].
    pub fn rename(id: FileId, name: impl Into<SmolStr>, handle: Option<H>) -> Self {
        Action::Rename {
            id,
            name: name.into(),
            handle,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Change { .. } => "change",
            Action::Rename { .. } => "rename",
            Action::Remove { .. } => "remove",
            Action::SelectFile { .. } => "select_file",
            Action::SelectFileByName { .. } => "select_file_by_name",
        }
    }
}

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState<H> {
    pub(crate) index: Vec<FileRecord>,
    pub(crate) contents: FxHashMap<FileId, String>,
    pub(crate) handles: FxHashMap<FileId, Option<H>>,
    pub(crate) selected: Option<FileId>,
    pub(crate) next_id: u32,
    pub(crate) revision: u64,
}

impl<H> Default for SessionState<H> {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            contents: FxHashMap::default(),
            handles: FxHashMap::default(),
            selected: None,
            next_id: 0,
            revision: 0,
        }
    }
}

impl<H> SessionState<H> {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `action` and returns the resulting state.
    ///
    /// Actions naming an unknown file id leave the state untouched.
    #[must_use]
    pub fn reduce(mut self, action: Action<H>) -> Self {
        match action {
            Action::Add {
                name,
                content,
                mut handle,
            } => {
                if is_settings_file(&name) {
                    if self.settings_file().is_some() {
                        warn!("add of a second '{}' file ignored", SETTINGS_FILE_NAME);
                        return self;
                    }
                    handle = settings_handle(handle);
                }
                let id = FileId(self.next_id);
                self.next_id += 1;
                self.index.push(FileRecord { id, name });
                self.contents.insert(id, content);
                self.handles.insert(id, handle);
                self.selected = Some(id);
                self.bump();
            }
            Action::Change { id, content } => {
                let Some(slot) = self.contents.get_mut(&id) else {
                    warn!("change for unknown file {:?}", id);
                    return self;
                };
                *slot = content;
                self.bump();
            }
            Action::Rename {
                id,
                name,
                mut handle,
            } => {
                if is_settings_file(&name) {
                    if self.settings_file().is_some_and(|settings| settings.id != id) {
                        warn!("rename onto an existing '{}' file ignored", SETTINGS_FILE_NAME);
                        return self;
                    }
                    handle = settings_handle(handle);
                }
                let Some(record) = self.index.iter_mut().find(|record| record.id == id) else {
                    warn!("rename for unknown file {:?}", id);
                    return self;
                };
                record.name = name;
                self.handles.insert(id, handle);
                self.bump();
            }
            Action::Remove { id } => {
                let Some(position) = self.position(id) else {
                    warn!("remove for unknown file {:?}", id);
                    return self;
                };
                if self.selected == Some(id) {
                    self.selected = self.neighbour_of(position);
                }
                self.contents.remove(&id);
                self.handles.remove(&id);
                self.index.remove(position);
                self.bump();
            }
            Action::SelectFile { id } => {
                if self.position(id).is_some() {
                    self.selected = Some(id);
                } else {
                    warn!("select for unknown file {:?}", id);
                }
            }
            Action::SelectFileByName { name } => {
                self.selected = self.file_by_name(&name);
            }
        }
        self
    }

    /// Files in display order.
    pub fn files(&self) -> &[FileRecord] {
        &self.index
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the session has no files.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The selected file id.
    pub fn selected(&self) -> Option<FileId> {
        self.selected
    }

    /// The selected file record.
    pub fn selected_record(&self) -> Option<&FileRecord> {
        self.selected.and_then(|id| self.record(id))
    }

    /// Looks up a record by id.
    pub fn record(&self, id: FileId) -> Option<&FileRecord> {
        self.index.iter().find(|record| record.id == id)
    }

    /// Display position of a file.
    pub fn position(&self, id: FileId) -> Option<usize> {
        self.index.iter().position(|record| record.id == id)
    }

    /// Id of the first file named `name`.
    pub fn file_by_name(&self, name: &str) -> Option<FileId> {
        self.index
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.id)
    }

    /// The settings file, if the session has one.
    pub fn settings_file(&self) -> Option<&FileRecord> {
        self.index.iter().find(|record| record.is_settings())
    }

    /// Current content of a file.
    pub fn content(&self, id: FileId) -> Option<&str> {
        self.contents.get(&id).map(String::as_str)
    }

    /// Engine handle of a file. `None` for unknown files and files without a handle.
    pub fn handle(&self, id: FileId) -> Option<&H> {
        self.handles.get(&id).and_then(Option::as_ref)
    }

    /// Returns true if the file has an engine handle.
    pub fn has_handle(&self, id: FileId) -> bool {
        self.handle(id).is_some()
    }

    /// Iterates `(record, content)` pairs in display order.
    pub fn files_with_contents(&self) -> impl Iterator<Item = (&FileRecord, &str)> {
        self.index.iter().filter_map(|record| {
            self.contents
                .get(&record.id)
                .map(|content| (record, content.as_str()))
        })
    }

    /// Revision counter; bumped by every mutating transition.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The id the next added file will receive.
    pub fn next_file_id(&self) -> FileId {
        FileId(self.next_id)
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    /// Selection after removing the file at `position`: the predecessor,
    /// else the successor, else nothing.
    fn neighbour_of(&self, position: usize) -> Option<FileId> {
        if position > 0 {
            return self.index.get(position - 1).map(|record| record.id);
        }
        self.index.get(position + 1).map(|record| record.id)
    }
}

/// The settings file never keeps an engine handle.
fn settings_handle<H>(handle: Option<H>) -> Option<H> {
    if handle.is_some() {
        warn!("engine handle dropped for '{}' file", SETTINGS_FILE_NAME);
    }
    None
}

/// Owner of the current [`SessionState`].
///
/// Each [`dispatch`](SessionStore::dispatch) swaps in the state produced by
/// [`SessionState::reduce`], so readers never see a half-applied transition.
#[derive(Debug, Clone)]
pub struct SessionStore<H> {
    state: SessionState<H>,
}

impl<H> Default for SessionStore<H> {
    fn default() -> Self {
        Self {
            state: SessionState::default(),
        }
    }
}

impl<H> SessionStore<H> {
    /// Creates a store with an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an action.
    pub fn dispatch(&mut self, action: Action<H>) {
        debug!(action = action.label(), "session dispatch");
        let previous = std::mem::take(&mut self.state);
        self.state = previous.reduce(action);
        debug_assert!(
            self.state.check_invariants().is_ok(),
            "session invariants violated: {:?}",
            self.state.check_invariants()
        );
    }

    /// The current state.
    pub fn state(&self) -> &SessionState<H> {
        &self.state
    }
}
