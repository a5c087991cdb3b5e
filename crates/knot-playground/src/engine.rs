//! Boundary to the external analysis engine.
//!
//! The engine is consumed, not implemented, here. Hosts plug in their
//! workspace implementation through [`Engine`]; the playground only sequences
//! calls against it.

use std::fmt;

use once_cell::unsync::OnceCell;
use thiserror::Error;

use crate::settings::Settings;

/// Failure reported by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Wraps an engine message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The engine message, unformatted.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of an engine call.
pub type EngineResult<T> = Result<T, EngineError>;

/// Incremental analysis engine tracking a set of open documents.
///
/// Diagnostics and dumps are opaque to the playground and passed through
/// unchanged.
pub trait Engine {
    /// Identifies a document previously opened with [`Engine::open_file`].
    type Handle: Clone + Eq + fmt::Debug;
    /// A single diagnostic produced by [`Engine::check_file`].
    type Diagnostic: Clone + fmt::Debug;

    /// Opens a document and returns its handle.
    fn open_file(&mut self, name: &str, content: &str) -> EngineResult<Self::Handle>;

    /// Replaces the text of an open document.
    fn update_file(&mut self, handle: &Self::Handle, content: &str) -> EngineResult<()>;

    /// Closes a document. The handle is invalid afterwards.
    fn close_file(&mut self, handle: Self::Handle) -> EngineResult<()>;

    /// Replaces the engine settings. On error the previous settings stay active.
    fn apply_settings(&mut self, settings: &Settings) -> EngineResult<()>;

    /// Type-checks an open document.
    fn check_file(&self, handle: &Self::Handle) -> EngineResult<Vec<Self::Diagnostic>>;

    /// Debug rendering of the parsed syntax tree.
    fn dump_ast(&self, handle: &Self::Handle) -> EngineResult<String>;

    /// Debug rendering of the token stream.
    fn dump_tokens(&self, handle: &Self::Handle) -> EngineResult<String>;
}

/// Holds the single engine instance of a session.
///
/// The engine is created at most once, through [`EngineCell::initialize`].
/// Every other access goes through [`EngineCell::get`] / [`EngineCell::get_mut`]
/// and fails cleanly before initialization.
pub struct EngineCell<E> {
    cell: OnceCell<E>,
}

impl<E> EngineCell<E> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Runs `init` unless the engine already exists. A failed `init` leaves
    /// the cell empty so a later call may retry.
    pub fn initialize<F>(&self, init: F) -> EngineResult<&E>
    where
        F: FnOnce() -> EngineResult<E>,
    {
        self.cell.get_or_try_init(init)
    }

    /// Whether the engine exists.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The engine, or an error before initialization.
    pub fn get(&self) -> EngineResult<&E> {
        self.cell.get().ok_or_else(not_initialized)
    }

    /// Mutable access to the engine, or an error before initialization.
    pub fn get_mut(&mut self) -> EngineResult<&mut E> {
        self.cell.get_mut().ok_or_else(not_initialized)
    }
}

impl<E> Default for EngineCell<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EngineCell<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCell")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

fn not_initialized() -> EngineError {
    EngineError::new("workspace is not initialized")
}
