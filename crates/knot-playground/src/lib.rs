//! `knot-playground` - Session controller for the knot playground.
//!
//! Keeps a [`knot_session::SessionStore`] in step with an external analysis
//! [`Engine`], derives diagnostics for the selected file, and autosaves the
//! session.
//!
//! - [`WorkspaceBridge`]: engine calls first, store transition second
//! - [`AnalysisPipeline`]: memoized diagnostics plus a secondary view
//! - [`PersistenceGateway`]: autosave and sharing, best effort
//! - [`Playground`]: ties the above to debounced [`Playground::tick`]s

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod playground;
pub mod settings;

pub use bridge::WorkspaceBridge;
pub use config::{ConfigError, PlaygroundConfig};
pub use deferred::{Deferred, Memo};
pub use engine::{Engine, EngineCell, EngineError, EngineResult};
pub use error::{format_error_message, ErrorReporter, ErrorSink, PlaygroundError};
pub use persistence::{
    FileSnapshotStore, InMemoryStore, PersistenceError, PersistenceGateway, ShareDirectory,
    ShareId, ShareStore, Snapshot, SnapshotStore,
};
pub use pipeline::{
    AnalysisInput, AnalysisPipeline, AnalysisResult, SecondaryContent, SecondaryResult,
    SecondaryTool,
};
pub use playground::{default_snapshot, Playground, TickOutcome};
pub use settings::{PythonVersion, Settings, SettingsError};
