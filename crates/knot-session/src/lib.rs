//! `knot-session` - Session state for the knot playground.
//!
//! The session is a small state machine over an ordered list of files:
//!
//! - **Index**: the display (tab) order of [`FileRecord`]s
//! - **Contents**: the current text of every file
//! - **Handles**: the engine handle bound to each file, if it has one
//! - **Selection**: the file shown in the editor
//! - **Revision**: a counter bumped by every mutating transition
//!
//! Transitions are pure: [`SessionState::reduce`] consumes the previous state
//! and an [`Action`] and returns the next state. Side effects against the
//! analysis engine live in `knot-playground`, never here.
//!
//! # Example
//!
//! ```
//! use knot_session::{Action, SessionStore};
//!
//! let mut store: SessionStore<u32> = SessionStore::new();
//! store.dispatch(Action::add("main.py", "import os", Some(7)));
//! assert_eq!(store.state().selected_record().map(|file| file.name.as_str()), Some("main.py"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod invariants;
mod store;

pub use invariants::InvariantViolation;
pub use store::{Action, FileId, FileRecord, SessionState, SessionStore};

/// Name of the reserved settings file. It configures the engine and is
/// never opened as an analyzable document.
pub const SETTINGS_FILE_NAME: &str = "knot.json";

/// Returns true if `name` is the reserved settings file name.
pub fn is_settings_file(name: &str) -> bool {
    name == SETTINGS_FILE_NAME
}
