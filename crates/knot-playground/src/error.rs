//! User-visible errors and the sink they are reported to.

use thiserror::Error;
use tracing::{info, warn};

/// Conventional prefix stripped from engine messages before display.
pub const ERROR_PREFIX: &str = "Error: ";

/// Label prepended to every settings failure.
pub const SETTINGS_ERROR_LABEL: &str = "Failed to update 'knot.json' options";

/// Errors shown to the user outside the analysis panels.
///
/// Analysis and secondary-tool failures are carried by the pipeline result
/// instead, next to the editor they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaygroundError {
    /// The settings file could not be parsed or was rejected by the engine.
    /// The engine keeps its previous settings.
    #[error("{0}")]
    Configuration(String),

    /// An open/update/close call against the engine failed.
    #[error("{0}")]
    Workspace(String),
}

impl PlaygroundError {
    /// A settings failure, labelled for display.
    pub fn configuration(message: impl AsRef<str>) -> Self {
        PlaygroundError::Configuration(format!(
            "{SETTINGS_ERROR_LABEL}: {}",
            format_error_message(message.as_ref())
        ))
    }

    /// A failed engine document call.
    pub fn workspace(message: impl AsRef<str>) -> Self {
        PlaygroundError::Workspace(format_error_message(message.as_ref()))
    }

    /// Whether this is a settings failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PlaygroundError::Configuration(_))
    }
}

/// Strips a leading [`ERROR_PREFIX`] for readability.
pub fn format_error_message(message: &str) -> String {
    message.strip_prefix(ERROR_PREFIX).unwrap_or(message).to_string()
}

/// Receives errors the bridge could not act on.
pub trait ErrorSink {
    /// Records `error`.
    fn report(&mut self, error: PlaygroundError);

    /// Called after settings were applied successfully.
    fn clear_configuration_error(&mut self);
}

/// Keeps the most recent error until it is dismissed.
#[derive(Debug, Default, Clone)]
pub struct ErrorReporter {
    current: Option<PlaygroundError>,
}

impl ErrorReporter {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// The error currently shown, if any.
    pub fn current(&self) -> Option<&PlaygroundError> {
        self.current.as_ref()
    }

    /// Hides the current error.
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

impl ErrorSink for ErrorReporter {
    fn report(&mut self, error: PlaygroundError) {
        warn!("{error}");
        self.current = Some(error);
    }

    fn clear_configuration_error(&mut self) {
        if self
            .current
            .as_ref()
            .is_some_and(PlaygroundError::is_configuration)
        {
            info!("settings error cleared");
            self.current = None;
        }
    }
}
