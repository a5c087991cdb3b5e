//! Structural checks over a [`SessionState`].

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::store::{FileId, SessionState};
use crate::SETTINGS_FILE_NAME;

/// A broken session invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// An indexed file has no content entry.
    #[error("file {0:?} has no content")]
    MissingContent(FileId),

    /// An indexed file has no handle entry.
    #[error("file {0:?} has no handle entry")]
    MissingHandle(FileId),

    /// Content is stored for a file that is not indexed.
    #[error("content stored for unknown file {0:?}")]
    OrphanContent(FileId),

    /// A handle entry exists for a file that is not indexed.
    #[error("handle stored for unknown file {0:?}")]
    OrphanHandle(FileId),

    /// The same id appears twice in the index.
    #[error("file {0:?} is indexed more than once")]
    DuplicateId(FileId),

    /// An indexed id was never allocated.
    #[error("file {0:?} was not allocated by this session")]
    UnallocatedId(FileId),

    /// The selection points at a file that is not indexed.
    #[error("selection {0:?} is not in the index")]
    DanglingSelection(FileId),

    /// More than one settings file.
    #[error("more than one '{}' file", SETTINGS_FILE_NAME)]
    MultipleSettingsFiles,

    /// The settings file is bound to an engine handle.
    #[error("'{}' file {:?} has an engine handle", SETTINGS_FILE_NAME, .0)]
    SettingsFileHasHandle(FileId),
}

impl<H> SessionState<H> {
    /// Verifies the session invariants, returning the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = FxHashSet::default();
        let mut settings_files = 0usize;
        for record in &self.index {
            if !seen.insert(record.id) {
                return Err(InvariantViolation::DuplicateId(record.id));
            }
            if record.id.0 >= self.next_id {
                return Err(InvariantViolation::UnallocatedId(record.id));
            }
            if !self.contents.contains_key(&record.id) {
                return Err(InvariantViolation::MissingContent(record.id));
            }
            let Some(handle) = self.handles.get(&record.id) else {
                return Err(InvariantViolation::MissingHandle(record.id));
            };
            if record.is_settings() {
                settings_files += 1;
                if handle.is_some() {
                    return Err(InvariantViolation::SettingsFileHasHandle(record.id));
                }
            }
        }
        if settings_files > 1 {
            return Err(InvariantViolation::MultipleSettingsFiles);
        }
        if let Some(id) = self.contents.keys().find(|id| !seen.contains(*id)) {
            return Err(InvariantViolation::OrphanContent(*id));
        }
        if let Some(id) = self.handles.keys().find(|id| !seen.contains(*id)) {
            return Err(InvariantViolation::OrphanHandle(*id));
        }
        if let Some(selected) = self.selected {
            if !seen.contains(&selected) {
                return Err(InvariantViolation::DanglingSelection(selected));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Action;

    #[test]
    fn empty_session_is_valid() {
        assert_eq!(SessionState::<u8>::new().check_invariants(), Ok(()));
    }

    #[test]
    fn detects_settings_file_with_handle() {
        let state = SessionState::new().reduce(Action::add(SETTINGS_FILE_NAME, "{}", Some(1u8)));
        assert_eq!(
            state.check_invariants(),
            Err(InvariantViolation::SettingsFileHasHandle(FileId(0)))
        );
    }

    #[test]
    fn detects_second_settings_file() {
        let state = SessionState::<u8>::new()
            .reduce(Action::add(SETTINGS_FILE_NAME, "{}", None))
            .reduce(Action::add(SETTINGS_FILE_NAME, "{}", None));
        assert_eq!(
            state.check_invariants(),
            Err(InvariantViolation::MultipleSettingsFiles)
        );
    }

    #[test]
    fn detects_orphan_content() {
        let mut state = SessionState::<u8>::new().reduce(Action::add("a.py", "", Some(1)));
        state.contents.insert(FileId(7), String::new());
        assert_eq!(
            state.check_invariants(),
            Err(InvariantViolation::OrphanContent(FileId(7)))
        );
    }

    #[test]
    fn detects_dangling_selection() {
        let mut state = SessionState::<u8>::new().reduce(Action::add("a.py", "", Some(1)));
        state.selected = Some(FileId(0));
        state.index.clear();
        state.contents.clear();
        state.handles.clear();
        assert_eq!(
            state.check_invariants(),
            Err(InvariantViolation::DanglingSelection(FileId(0)))
        );
    }
}
