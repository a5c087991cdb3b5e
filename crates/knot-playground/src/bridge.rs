//! Sequencing of engine calls around session transitions.
//!
//! Every user-facing file operation runs its engine calls first and only then
//! dispatches the matching [`Action`]. Engine failures are reported to an
//! [`ErrorSink`] and never unwind past a transition that has been decided.

use knot_session::{is_settings_file, Action, FileId, SessionStore, SETTINGS_FILE_NAME};
use tracing::{debug, info, warn};

use crate::engine::{Engine, EngineCell, EngineResult};
use crate::error::{ErrorSink, PlaygroundError};
use crate::settings::Settings;

/// Owns the engine and keeps its open documents in step with the session.
#[derive(Debug)]
pub struct WorkspaceBridge<E> {
    engine: EngineCell<E>,
    settings: Settings,
    generation: u64,
}

impl<E: Engine> WorkspaceBridge<E> {
    /// Creates a bridge without an engine. Call [`WorkspaceBridge::initialize`] next.
    pub fn new() -> Self {
        Self {
            engine: EngineCell::new(),
            settings: Settings::default(),
            generation: 0,
        }
    }

    /// Creates the engine. Later calls keep the existing instance.
    pub fn initialize<F>(&mut self, init: F) -> EngineResult<()>
    where
        F: FnOnce() -> EngineResult<E>,
    {
        if self.engine.is_initialized() {
            debug!("workspace already initialized");
            return Ok(());
        }
        self.engine.initialize(init)?;
        self.generation += 1;
        info!("workspace initialized");
        Ok(())
    }

    /// The engine, or an error before initialization.
    pub fn engine(&self) -> EngineResult<&E> {
        self.engine.get()
    }

    /// Settings last accepted by the engine.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of successful engine mutations. Changes whenever the engine may
    /// answer a query differently.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Adds a file. The settings file is applied as settings and gets no
    /// handle; any other file is opened in the engine first. Nothing is added
    /// if the engine refuses the file.
    pub fn add_file(
        &mut self,
        store: &mut SessionStore<E::Handle>,
        errors: &mut impl ErrorSink,
        name: &str,
        content: &str,
    ) -> Option<FileId> {
        let handle = if is_settings_file(name) {
            if store.state().settings_file().is_some() {
                errors.report(duplicate_settings_file());
                return None;
            }
            self.apply_settings_text(errors, content);
            None
        } else {
            Some(self.open(errors, name, content)?)
        };
        let id = store.state().next_file_id();
        store.dispatch(Action::add(name, content, handle));
        info!("file added: {} ({:?})", name, id);
        Some(id)
    }

    /// Replaces the content of a file, pushing it to the engine or, for the
    /// settings file, re-applying settings.
    pub fn change_file(
        &mut self,
        store: &mut SessionStore<E::Handle>,
        errors: &mut impl ErrorSink,
        id: FileId,
        content: String,
    ) {
        let state = store.state();
        let Some(record) = state.record(id) else {
            warn!("change for unknown file {:?}", id);
            return;
        };
        if let Some(handle) = state.handle(id).cloned() {
            self.call(errors, |engine| engine.update_file(&handle, &content));
        } else if record.is_settings() {
            self.apply_settings_text(errors, &content);
        }
        store.dispatch(Action::change(id, content));
    }

    /// Renames a file in place.
    ///
    /// The old handle is closed before a new one is opened under `new_name`,
    /// so the engine never keeps the content under the old name.
    pub fn rename_file(
        &mut self,
        store: &mut SessionStore<E::Handle>,
        errors: &mut impl ErrorSink,
        id: FileId,
        new_name: &str,
    ) {
        let state = store.state();
        let Some(record) = state.record(id).cloned() else {
            warn!("rename for unknown file {:?}", id);
            return;
        };
        if is_settings_file(new_name)
            && state
                .settings_file()
                .is_some_and(|settings| settings.id != id)
        {
            errors.report(duplicate_settings_file());
            return;
        }
        let content = state.content(id).unwrap_or_default().to_string();

        if let Some(handle) = state.handle(id).cloned() {
            self.call(errors, |engine| engine.close_file(handle));
        } else if record.is_settings() {
            self.clear_settings(errors);
        }

        let handle = if is_settings_file(new_name) {
            self.apply_settings_text(errors, &content);
            None
        } else {
            self.open(errors, new_name, &content)
        };
        store.dispatch(Action::rename(id, new_name, handle));
        info!("file renamed: {} -> {}", record.name, new_name);
    }

    /// Removes a file, closing its handle or dropping its settings first.
    pub fn remove_file(
        &mut self,
        store: &mut SessionStore<E::Handle>,
        errors: &mut impl ErrorSink,
        id: FileId,
    ) {
        let state = store.state();
        let Some(record) = state.record(id).cloned() else {
            warn!("remove for unknown file {:?}", id);
            return;
        };
        if let Some(handle) = state.handle(id).cloned() {
            self.call(errors, |engine| engine.close_file(handle));
        } else if record.is_settings() {
            self.clear_settings(errors);
        }
        store.dispatch(Action::Remove { id });
        info!("file removed: {}", record.name);
    }

    /// Rebuilds a session from `(name, content)` pairs in display order and
    /// selects `current`, falling back to the first file.
    ///
    /// Settings are applied before any document is opened. A file the engine
    /// refuses is kept without a handle so its text is not lost.
    pub fn restore<'a, I>(
        &mut self,
        store: &mut SessionStore<E::Handle>,
        errors: &mut impl ErrorSink,
        files: I,
        current: &str,
    ) where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let files: Vec<(&str, &str)> = files.into_iter().collect();
        if let Some((_, text)) = files.iter().find(|(name, _)| is_settings_file(name)) {
            self.apply_settings_text(errors, text);
        }
        for (name, content) in files {
            let handle = if is_settings_file(name) {
                if store.state().settings_file().is_some() {
                    warn!("skipping duplicate '{}' while restoring", SETTINGS_FILE_NAME);
                    continue;
                }
                None
            } else {
                self.open(errors, name, content)
            };
            store.dispatch(Action::add(name, content, handle));
        }
        store.dispatch(Action::SelectFileByName {
            name: current.into(),
        });
        if store.state().selected().is_none() {
            if let Some(first) = store.state().files().first().map(|record| record.id) {
                store.dispatch(Action::SelectFile { id: first });
            }
        }
        info!("session restored with {} files", store.state().len());
    }

    /// Parses settings text and pushes it to the engine. Returns true if the
    /// engine accepted it. On failure nothing reaches the engine and the
    /// previous settings stay in effect.
    pub fn apply_settings_text(&mut self, errors: &mut impl ErrorSink, text: &str) -> bool {
        match Settings::parse(text) {
            Ok(settings) => self.apply_settings(errors, settings),
            Err(err) => {
                errors.report(PlaygroundError::configuration(err.to_string()));
                false
            }
        }
    }

    /// Resets the engine to default settings.
    pub fn clear_settings(&mut self, errors: &mut impl ErrorSink) -> bool {
        self.apply_settings(errors, Settings::default())
    }

    fn apply_settings(&mut self, errors: &mut impl ErrorSink, settings: Settings) -> bool {
        let result = self
            .engine
            .get_mut()
            .and_then(|engine| engine.apply_settings(&settings));
        match result {
            Ok(()) => {
                debug!(?settings, "settings applied");
                self.settings = settings;
                self.generation += 1;
                errors.clear_configuration_error();
                true
            }
            Err(err) => {
                errors.report(PlaygroundError::configuration(err.message()));
                false
            }
        }
    }

    fn open(&mut self, errors: &mut impl ErrorSink, name: &str, content: &str) -> Option<E::Handle> {
        self.call(errors, |engine| engine.open_file(name, content))
    }

    fn call<T, F>(&mut self, errors: &mut impl ErrorSink, op: F) -> Option<T>
    where
        F: FnOnce(&mut E) -> EngineResult<T>,
    {
        match self.engine.get_mut().and_then(op) {
            Ok(value) => {
                self.generation += 1;
                Some(value)
            }
            Err(err) => {
                errors.report(PlaygroundError::workspace(err.message()));
                None
            }
        }
    }
}

impl<E: Engine> Default for WorkspaceBridge<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_settings_file() -> PlaygroundError {
    PlaygroundError::configuration(format!("a '{SETTINGS_FILE_NAME}' file already exists"))
}
