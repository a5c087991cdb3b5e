//! The session controller hosts drive.
//!
//! User operations go through the bridge immediately. Analysis and autosave
//! read debounced views of the session and only run from [`Playground::tick`].

use std::time::Instant;

use indexmap::IndexMap;
use knot_session::{Action, FileId, SessionState, SessionStore, SETTINGS_FILE_NAME};
use tracing::{debug, info};

use crate::bridge::WorkspaceBridge;
use crate::config::PlaygroundConfig;
use crate::deferred::Deferred;
use crate::engine::{Engine, EngineResult};
use crate::error::{ErrorReporter, PlaygroundError};
use crate::persistence::{PersistenceGateway, ShareId, Snapshot};
use crate::pipeline::{AnalysisInput, AnalysisPipeline, AnalysisResult, SecondaryTool};
use crate::settings::{Settings, DEFAULT_SETTINGS_TEXT};

/// Name of the example file in a fresh session.
pub const DEFAULT_FILE_NAME: &str = "main.py";

const DEFAULT_PROGRAM: &str = r#"from typing import Literal

type Style = Literal["italic", "bold", "underline"]


def with_style(line: str, word, style: Style) -> str:
    if style == "italic":
        return line.replace(word, f"*{word}*")
    elif style == "bold":
        return line.replace(word, f"__{word}__")

    position = line.find(word)
    output = line + "\n"
    output += " " * position
    output += "-" * len(word)


print(with_style("knot is a fast type checker for Python.", "fast", "underlined"))
"#;

/// Session shown when nothing was saved before.
pub fn default_snapshot() -> Snapshot {
    let mut files = IndexMap::new();
    files.insert(DEFAULT_FILE_NAME.to_string(), DEFAULT_PROGRAM.to_string());
    files.insert(SETTINGS_FILE_NAME.to_string(), DEFAULT_SETTINGS_TEXT.to_string());
    Snapshot::new(files, DEFAULT_FILE_NAME)
}

/// What a call to [`Playground::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The engine was queried for a new analysis result.
    pub analyzed: bool,
    /// A snapshot was written to the autosave store.
    pub autosaved: bool,
}

type AutosaveKey = (u64, Option<FileId>);

/// Multi-file editing session bound to one engine instance.
pub struct Playground<E: Engine> {
    store: SessionStore<E::Handle>,
    bridge: WorkspaceBridge<E>,
    errors: ErrorReporter,
    pipeline: AnalysisPipeline<E::Diagnostic>,
    persistence: PersistenceGateway,
    analysis_input: Deferred<AnalysisInput>,
    autosave_input: Deferred<AutosaveKey>,
    last_autosaved: Option<AutosaveKey>,
    secondary_tool: Option<SecondaryTool>,
}

impl<E: Engine> Playground<E> {
    /// Creates the engine and restores the autosaved session, or the default
    /// session if there is none.
    pub fn start<F>(
        config: &PlaygroundConfig,
        mut persistence: PersistenceGateway,
        init: F,
        now: Instant,
    ) -> EngineResult<Self>
    where
        F: FnOnce() -> EngineResult<E>,
    {
        let snapshot = persistence.restore();
        Self::start_with_snapshot(config, persistence, snapshot, init, now)
    }

    /// Creates the engine and loads `snapshot`, falling back to the default
    /// session when it is `None`.
    pub fn start_with_snapshot<F>(
        config: &PlaygroundConfig,
        persistence: PersistenceGateway,
        snapshot: Option<Snapshot>,
        init: F,
        now: Instant,
    ) -> EngineResult<Self>
    where
        F: FnOnce() -> EngineResult<E>,
    {
        let mut bridge = WorkspaceBridge::new();
        bridge.initialize(init)?;

        let mut playground = Self {
            store: SessionStore::new(),
            bridge,
            errors: ErrorReporter::new(),
            pipeline: AnalysisPipeline::new(),
            persistence,
            analysis_input: Deferred::new(config.analysis.debounce),
            autosave_input: Deferred::new(config.autosave.debounce),
            last_autosaved: None,
            secondary_tool: config.analysis.secondary_tool,
        };

        let snapshot = snapshot.unwrap_or_else(|| {
            info!("no saved session, starting from the default example");
            default_snapshot()
        });
        playground.bridge.restore(
            &mut playground.store,
            &mut playground.errors,
            snapshot
                .files
                .iter()
                .map(|(name, content)| (name.as_str(), content.as_str())),
            &snapshot.current,
        );
        playground.schedule(now);
        Ok(playground)
    }

    /// Adds and selects a file. `None` if the engine or the settings rule refused it.
    pub fn add_file(&mut self, name: &str, content: &str, now: Instant) -> Option<FileId> {
        let id = self
            .bridge
            .add_file(&mut self.store, &mut self.errors, name, content);
        self.schedule(now);
        id
    }

    /// Replaces the content of a file.
    pub fn change_file(&mut self, id: FileId, content: impl Into<String>, now: Instant) {
        self.bridge
            .change_file(&mut self.store, &mut self.errors, id, content.into());
        self.schedule(now);
    }

    /// Renames a file in place.
    pub fn rename_file(&mut self, id: FileId, new_name: &str, now: Instant) {
        self.bridge
            .rename_file(&mut self.store, &mut self.errors, id, new_name);
        self.schedule(now);
    }

    /// Removes a file. The previous tab becomes selected.
    pub fn remove_file(&mut self, id: FileId, now: Instant) {
        self.bridge.remove_file(&mut self.store, &mut self.errors, id);
        self.schedule(now);
    }

    /// Selects a file.
    pub fn select_file(&mut self, id: FileId, now: Instant) {
        self.store.dispatch(Action::SelectFile { id });
        self.schedule(now);
    }

    /// Selects the first file named `name`, if any.
    pub fn select_file_by_name(&mut self, name: &str, now: Instant) {
        self.store.dispatch(Action::SelectFileByName { name: name.into() });
        self.schedule(now);
    }

    /// Switches the secondary view. Takes effect on the next tick without
    /// waiting for the debounce.
    pub fn set_secondary_tool(&mut self, tool: Option<SecondaryTool>) {
        debug!(?tool, "secondary tool selected");
        self.secondary_tool = tool;
    }

    /// The active secondary view.
    pub fn secondary_tool(&self) -> Option<SecondaryTool> {
        self.secondary_tool
    }

    /// Runs deferred work whose quiet period has elapsed at `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let analysis = self.analysis_input.poll(now).copied();
        let autosave = self.autosave_input.poll(now).copied();
        self.run_deferred(analysis, autosave)
    }

    /// Runs all deferred work immediately, ignoring the quiet periods.
    pub fn flush(&mut self) -> TickOutcome {
        let analysis = self.analysis_input.flush().copied();
        let autosave = self.autosave_input.flush().copied();
        self.run_deferred(analysis, autosave)
    }

    fn run_deferred(
        &mut self,
        analysis: Option<AnalysisInput>,
        autosave: Option<AutosaveKey>,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if let Some(input) = analysis {
            if let Ok(engine) = self.bridge.engine() {
                let runs = self.pipeline.runs();
                self.pipeline
                    .run(engine, self.store.state(), input, self.secondary_tool);
                outcome.analyzed = self.pipeline.runs() != runs;
            }
        }

        if let Some(key) = autosave {
            if self.last_autosaved != Some(key) {
                self.last_autosaved = Some(key);
                if let Some(snapshot) = Snapshot::capture(self.store.state()) {
                    outcome.autosaved = self.persistence.autosave(snapshot);
                }
            }
        }

        outcome
    }

    /// Publishes the current session. `None` if nothing is selected or the
    /// share store failed.
    pub fn share(&mut self) -> Option<ShareId> {
        let snapshot = Snapshot::capture(self.store.state())?;
        self.persistence.share(&snapshot)
    }

    /// Latest analysis result for the selected file.
    pub fn analysis(&self) -> Option<&AnalysisResult<E::Diagnostic>> {
        self.pipeline.current()
    }

    /// The analysis pipeline, for inspecting its counters.
    pub fn pipeline(&self) -> &AnalysisPipeline<E::Diagnostic> {
        &self.pipeline
    }

    /// The error banner, if any.
    pub fn error(&self) -> Option<&PlaygroundError> {
        self.errors.current()
    }

    /// Clears the error banner.
    pub fn dismiss_error(&mut self) {
        self.errors.dismiss();
    }

    /// The current session state.
    pub fn session(&self) -> &SessionState<E::Handle> {
        self.store.state()
    }

    /// Settings the engine currently runs with.
    pub fn settings(&self) -> &Settings {
        self.bridge.settings()
    }

    /// The engine, or an error before initialization.
    pub fn engine(&self) -> EngineResult<&E> {
        self.bridge.engine()
    }

    fn schedule(&mut self, now: Instant) {
        let state = self.store.state();
        self.analysis_input.set(
            AnalysisInput::capture(state, self.bridge.generation()),
            now,
        );
        self.autosave_input
            .set((state.revision(), state.selected()), now);
    }
}
